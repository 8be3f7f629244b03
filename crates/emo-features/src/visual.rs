//! Strided frame sampling into a fixed `[3, T, H, W]` tensor.

use std::path::Path;
use std::sync::Arc;

use emo_media::{ClipDecoder, RgbFrame};
use emo_models::features::{FRAME_CHANNELS, FRAME_SIZE, NUM_FRAMES};
use ndarray::{s, Array4};
use tracing::{debug, warn};

use crate::extraction::Extraction;

/// Samples `NUM_FRAMES` evenly strided frames from a clip.
#[derive(Clone)]
pub struct VisualFeatureExtractor {
    decoder: Arc<dyn ClipDecoder>,
}

impl VisualFeatureExtractor {
    pub fn new(decoder: Arc<dyn ClipDecoder>) -> Self {
        Self { decoder }
    }

    pub async fn extract(&self, clip: &Path) -> Extraction<Array4<f32>> {
        let total = match self.decoder.frame_count(clip).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Frame count unavailable, using blank frames");
                return Extraction::degraded(blank(), e.to_string());
            }
        };

        let stride = frame_stride(total);
        match self
            .decoder
            .sample_frames(clip, stride, NUM_FRAMES, FRAME_SIZE as u32)
            .await
        {
            Ok(frames) => {
                debug!(total, stride, sampled = frames.len(), "Frames sampled");
                assemble_frames(&frames)
            }
            Err(e) => {
                warn!(error = %e, "Frame decode failed, using blank frames");
                Extraction::degraded(blank(), e.to_string())
            }
        }
    }
}

/// `max(total / NUM_FRAMES, 1)`.
pub fn frame_stride(total_frames: u64) -> u64 {
    (total_frames / NUM_FRAMES as u64).max(1)
}

fn blank() -> Array4<f32> {
    Array4::zeros((FRAME_CHANNELS, NUM_FRAMES, FRAME_SIZE, FRAME_SIZE))
}

/// Stack sampled frames into the model tensor, scaling to `[0, 1]`.
///
/// Frames of the wrong size are skipped. Short sequences repeat the last
/// usable frame; with none at all the result is blank and degraded.
pub fn assemble_frames(frames: &[RgbFrame]) -> Extraction<Array4<f32>> {
    let usable: Vec<&RgbFrame> = frames
        .iter()
        .filter(|f| {
            f.width as usize == FRAME_SIZE
                && f.height as usize == FRAME_SIZE
                && f.data.len() == FRAME_SIZE * FRAME_SIZE * FRAME_CHANNELS
        })
        .take(NUM_FRAMES)
        .collect();

    let Some(last) = usable.last().copied() else {
        return Extraction::degraded(blank(), "no decodable video frames");
    };

    let mut tensor = blank();
    for t in 0..NUM_FRAMES {
        let frame = usable.get(t).copied().unwrap_or(last);
        let mut slot = tensor.slice_mut(s![.., t, .., ..]);
        for ((c, y, x), v) in slot.indexed_iter_mut() {
            *v = frame.value(c, y, x) as f32 / 255.0;
        }
    }

    Extraction::Ok(tensor)
}
