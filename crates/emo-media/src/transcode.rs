//! Clip normalization.
//!
//! The transcoder is an external collaborator: the pipeline only relies on
//! the [`MediaTranscoder`] contract, so an in-process implementation can be
//! swapped in without touching callers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use emo_models::TrimWindow;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::get_duration;

/// Re-encoded clip produced by a transcoder.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedClip {
    /// Location of the playable clip
    pub path: PathBuf,
    /// Clip duration in seconds
    pub duration: f64,
}

/// Probe and trim contract used by the pipeline.
#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    /// Probe the container duration in seconds.
    async fn probe_duration(&self, input: &Path) -> MediaResult<f64>;

    /// Re-encode `window` of `input` into `output`.
    ///
    /// Implementations keep exactly one video stream and at most one audio
    /// stream, and fail rather than leave an empty file behind.
    async fn trim(&self, input: &Path, window: TrimWindow, output: &Path) -> MediaResult<NormalizedClip>;

    /// Transcoder name for logging.
    fn name(&self) -> &'static str;
}

/// Encoder settings for normalized clips.
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub audio_channels: u8,
    /// Wall-clock limit for one re-encode
    pub timeout: Duration,
    /// Wall-clock limit for one probe
    pub probe_timeout: Duration,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "ultrafast".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            audio_channels: 2,
            timeout: Duration::from_secs(120),
            probe_timeout: Duration::from_secs(30),
        }
    }
}

/// FFmpeg CLI transcoder.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    settings: TranscodeSettings,
}

impl FfmpegTranscoder {
    pub fn new(settings: TranscodeSettings) -> Self {
        Self { settings }
    }

    /// Build the trim command.
    ///
    /// Maps the first video stream and the first audio stream if present,
    /// forces stereo audio and a fast-start layout, and strips encoder
    /// metadata so repeated runs produce identical files.
    pub fn build_command(&self, input: &Path, window: TrimWindow, output: &Path) -> FfmpegCommand {
        let s = &self.settings;
        FfmpegCommand::new(input, output)
            .seek(window.start)
            .duration(window.duration())
            .map("0:v:0")
            .map("0:a:0?")
            .video_codec(&s.video_codec)
            .preset(&s.preset)
            .audio_codec(&s.audio_codec)
            .audio_bitrate(&s.audio_bitrate)
            .audio_channels(s.audio_channels)
            .output_args([
                "-map_metadata",
                "-1",
                "-fflags",
                "+bitexact",
                "-flags:v",
                "+bitexact",
                "-flags:a",
                "+bitexact",
                "-threads",
                "1",
                "-movflags",
                "+faststart",
            ])
    }
}

#[async_trait]
impl MediaTranscoder for FfmpegTranscoder {
    async fn probe_duration(&self, input: &Path) -> MediaResult<f64> {
        get_duration(input, self.settings.probe_timeout).await
    }

    async fn trim(&self, input: &Path, window: TrimWindow, output: &Path) -> MediaResult<NormalizedClip> {
        info!(
            start = window.start,
            end = window.end,
            "Trimming clip ({:.2}s)",
            window.duration()
        );

        let cmd = self.build_command(input, window, output);
        FfmpegRunner::new()
            .with_timeout(self.settings.timeout)
            .run(&cmd)
            .await?;

        let size = match tokio::fs::metadata(output).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(MediaError::Io(e)),
        };
        if size == 0 {
            return Err(MediaError::EmptyOutput);
        }

        debug!(size, "Clip trimmed");

        Ok(NormalizedClip {
            path: output.to_path_buf(),
            duration: window.duration(),
        })
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_command_maps_single_streams() {
        let transcoder = FfmpegTranscoder::default();
        let window = TrimWindow { start: 2.0, end: 12.0 };
        let args = transcoder
            .build_command(Path::new("in.mov"), window, Path::new("out.mp4"))
            .build_args();

        let maps: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(i, _)| *i > 0 && args[i - 1] == "-map")
            .map(|(_, a)| a)
            .collect();
        assert_eq!(maps, vec!["0:v:0", "0:a:0?"]);

        assert!(args.windows(2).any(|w| w[0] == "-ac" && w[1] == "2"));
        assert!(args.windows(2).any(|w| w[0] == "-movflags" && w[1] == "+faststart"));
        assert!(args.windows(2).any(|w| w[0] == "-t" && w[1] == "10.000"));
        assert!(args.windows(2).any(|w| w[0] == "-ss" && w[1] == "2.000"));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_trim_synthetic_clip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mp4");

        let status = tokio::process::Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-f", "lavfi", "-i", "color=c=black:s=320x240:d=10:r=30"])
            .args(["-f", "lavfi", "-i", "anullsrc=r=44100:cl=mono", "-t", "10", "-shortest"])
            .arg(&source)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let transcoder = FfmpegTranscoder::default();
        let duration = transcoder.probe_duration(&source).await.unwrap();
        assert!((duration - 10.0).abs() < 0.2);

        let output = dir.path().join("trimmed.mp4");
        let clip = transcoder
            .trim(&source, TrimWindow { start: 0.0, end: 4.0 }, &output)
            .await
            .unwrap();
        assert_eq!(clip.path, output);
        assert!((clip.duration - 4.0).abs() < 1e-9);
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }
}
