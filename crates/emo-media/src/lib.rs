//! Media handling for emotion analysis.
//!
//! This crate wraps the FFmpeg and FFprobe CLIs:
//! - Duration probing
//! - Trim window planning
//! - Clip normalization (single video stream, stereo AAC, fast-start MP4)
//! - Raw PCM audio and RGB frame decoding
//! - Per-request scratch directories

pub mod command;
pub mod decode;
pub mod error;
pub mod probe;
pub mod transcode;
pub mod trim;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use decode::{ClipDecoder, DecodedAudio, FfmpegDecoder, RgbFrame};
pub use error::{MediaError, MediaResult};
pub use probe::{get_duration, probe_media, MediaInfo};
pub use transcode::{FfmpegTranscoder, MediaTranscoder, NormalizedClip, TranscodeSettings};
pub use trim::TrimPlanner;
pub use workspace::{sanitize_filename, RequestWorkspace};
