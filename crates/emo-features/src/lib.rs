//! Fixed-shape feature extraction.
//!
//! Each extractor turns a normalized clip (or the text hint) into a tensor of
//! a fixed shape. Audio and video extraction never fail outright: decode
//! problems produce a zero tensor tagged as [`Extraction::Degraded`].

pub mod audio;
pub mod error;
pub mod extraction;
pub mod text;
pub mod visual;

pub use audio::{normalize_waveform, AudioFeatureExtractor};
pub use error::{FeatureError, FeatureResult};
pub use extraction::{Extraction, FeatureSet};
pub use text::{TextFeature, TextFeatureExtractor, TextTokenizer};
pub use visual::{assemble_frames, frame_stride, VisualFeatureExtractor};
