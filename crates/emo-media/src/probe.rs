//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

use crate::error::{excerpt, MediaError, MediaResult, STDERR_EXCERPT_CHARS};

/// Media file information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds (0.0 when unknown)
    pub duration: f64,
    /// File size in bytes
    pub size: u64,
    /// First video stream, if any
    pub video: Option<VideoStreamInfo>,
    /// First audio stream, if any
    pub audio: Option<AudioStreamInfo>,
}

/// Video stream details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Frame count, from the container or estimated from duration
    pub frame_count: u64,
    /// Video codec
    pub codec: String,
}

/// Audio stream details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Audio codec
    pub codec: String,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    channels: Option<u16>,
    sample_rate: Option<String>,
}

/// Probe a media file.
pub async fn probe_media(path: impl AsRef<Path>, timeout: Duration) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let child = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("FFprobe timed out after {} seconds", timeout.as_secs());
            return Err(MediaError::Timeout(timeout.as_secs()));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr)
            .replace(path.to_string_lossy().as_ref(), "<input>");
        return Err(MediaError::ffprobe_failed(
            "FFprobe failed",
            Some(excerpt(stderr.trim(), STDERR_EXCERPT_CHARS)),
        ));
    }

    parse_probe_output(&output.stdout)
}

/// Get media duration in seconds.
///
/// Fails if the container reports no usable duration.
pub async fn get_duration(path: impl AsRef<Path>, timeout: Duration) -> MediaResult<f64> {
    let info = probe_media(path, timeout).await?;
    if info.duration.is_finite() && info.duration > 0.0 {
        Ok(info.duration)
    } else {
        Err(MediaError::ffprobe_failed("No duration reported", None))
    }
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let size = probe
        .format
        .as_ref()
        .and_then(|f| f.size.as_ref())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .map(|s| {
            let fps = s
                .avg_frame_rate
                .as_ref()
                .and_then(|r| parse_frame_rate(r))
                .or_else(|| s.r_frame_rate.as_ref().and_then(|r| parse_frame_rate(r)))
                .unwrap_or(30.0);

            let stream_duration = s
                .duration
                .as_ref()
                .and_then(|d| d.parse::<f64>().ok())
                .unwrap_or(duration);

            let frame_count = s
                .nb_frames
                .as_ref()
                .and_then(|n| n.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or_else(|| (stream_duration * fps).round().max(0.0) as u64);

            VideoStreamInfo {
                width: s.width.unwrap_or(0),
                height: s.height.unwrap_or(0),
                fps,
                frame_count,
                codec: s.codec_name.clone().unwrap_or_default(),
            }
        });

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "audio")
        .map(|s| AudioStreamInfo {
            channels: s.channels.unwrap_or(1).max(1),
            sample_rate: s
                .sample_rate
                .as_ref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(0),
            codec: s.codec_name.clone().unwrap_or_default(),
        });

    Ok(MediaInfo {
        duration,
        size,
        video,
        audio,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|fps: &f64| *fps > 0.0)
}
