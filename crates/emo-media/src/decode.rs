//! Raw audio and frame decoding from normalized clips.
//!
//! Audio is piped out of FFmpeg as little-endian `f32` PCM and frames as
//! packed `rgb24`, so nothing touches disk beyond the clip itself.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_media;

/// Interleaved PCM samples in `[-1, 1]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Samples per channel.
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

/// Packed 8-bit RGB frame, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbFrame {
    /// Channel value at (`channel`, `y`, `x`).
    #[inline]
    pub fn value(&self, channel: usize, y: usize, x: usize) -> u8 {
        self.data[(y * self.width as usize + x) * 3 + channel]
    }
}

/// Decoder contract used by the feature extractors.
#[async_trait]
pub trait ClipDecoder: Send + Sync {
    /// Decode the first audio stream, resampled to `sample_rate`.
    async fn decode_audio(&self, clip: &Path, sample_rate: u32) -> MediaResult<DecodedAudio>;

    /// Number of video frames in the clip.
    async fn frame_count(&self, clip: &Path) -> MediaResult<u64>;

    /// Every `stride`-th frame starting at frame 0, at most `max_frames`,
    /// resized to `size`x`size`.
    async fn sample_frames(
        &self,
        clip: &Path,
        stride: u64,
        max_frames: usize,
        size: u32,
    ) -> MediaResult<Vec<RgbFrame>>;
}

/// FFmpeg CLI decoder.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    timeout: Duration,
    probe_timeout: Duration,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            probe_timeout: Duration::from_secs(30),
        }
    }
}

impl FfmpegDecoder {
    pub fn new(timeout: Duration, probe_timeout: Duration) -> Self {
        Self {
            timeout,
            probe_timeout,
        }
    }

    fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.timeout)
    }

    pub(crate) fn audio_command(clip: &Path, sample_rate: u32, channels: u16) -> FfmpegCommand {
        FfmpegCommand::to_pipe(clip)
            .map("0:a:0")
            .no_video()
            .audio_sample_rate(sample_rate)
            .output_args(["-ac".to_string(), channels.to_string()])
            .format("f32le")
    }

    pub(crate) fn frames_command(clip: &Path, stride: u64, max_frames: usize, size: u32) -> FfmpegCommand {
        let filter = format!(
            "select='not(mod(n\\,{}))',scale={}:{}:flags=bilinear",
            stride.max(1),
            size,
            size
        );
        FfmpegCommand::to_pipe(clip)
            .map("0:v:0")
            .no_audio()
            .video_filter(filter)
            .output_args(["-fps_mode", "passthrough", "-pix_fmt", "rgb24"])
            .max_frames(max_frames)
            .format("rawvideo")
    }
}

#[async_trait]
impl ClipDecoder for FfmpegDecoder {
    async fn decode_audio(&self, clip: &Path, sample_rate: u32) -> MediaResult<DecodedAudio> {
        let info = probe_media(clip, self.probe_timeout).await?;
        let channels = info.audio.ok_or(MediaError::NoAudioStream)?.channels.max(1);

        let bytes = self
            .runner()
            .run_capture(&Self::audio_command(clip, sample_rate, channels))
            .await?;

        let samples = pcm_f32le(&bytes);
        debug!(
            samples = samples.len(),
            channels, sample_rate, "Decoded audio"
        );

        Ok(DecodedAudio {
            samples,
            channels,
            sample_rate,
        })
    }

    async fn frame_count(&self, clip: &Path) -> MediaResult<u64> {
        let info = probe_media(clip, self.probe_timeout).await?;
        info.video
            .map(|v| v.frame_count)
            .ok_or(MediaError::NoVideoStream)
    }

    async fn sample_frames(
        &self,
        clip: &Path,
        stride: u64,
        max_frames: usize,
        size: u32,
    ) -> MediaResult<Vec<RgbFrame>> {
        let bytes = self
            .runner()
            .run_capture(&Self::frames_command(clip, stride, max_frames, size))
            .await?;

        let frames = split_frames(&bytes, size, size);
        debug!(frames = frames.len(), stride, "Sampled frames");
        Ok(frames)
    }
}

/// Reinterpret little-endian `f32` PCM. A trailing partial sample is dropped.
pub fn pcm_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Split a packed rgb24 stream into whole frames. A truncated tail is dropped.
pub fn split_frames(bytes: &[u8], width: u32, height: u32) -> Vec<RgbFrame> {
    let frame_len = width as usize * height as usize * 3;
    if frame_len == 0 {
        return Vec::new();
    }
    bytes
        .chunks_exact(frame_len)
        .map(|chunk| RgbFrame {
            width,
            height,
            data: chunk.to_vec(),
        })
        .collect()
}
