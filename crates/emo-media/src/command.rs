//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{excerpt, MediaError, MediaResult, STDERR_EXCERPT_CHARS};

/// Output target that streams raw data to the runner instead of a file.
pub const PIPE_OUTPUT: &str = "pipe:1";

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path
    input: PathBuf,
    /// Output file path (or [`PIPE_OUTPUT`])
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
        }
    }

    /// Create a command that writes its output to stdout.
    pub fn to_pipe(input: impl AsRef<Path>) -> Self {
        Self::new(input, PIPE_OUTPUT)
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Set duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Select an input stream (e.g. `0:v:0`, `0:a:0?`).
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Set audio channel count.
    pub fn audio_channels(self, channels: u8) -> Self {
        self.output_arg("-ac").output_arg(channels.to_string())
    }

    /// Set audio sample rate.
    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.output_arg("-ar").output_arg(rate.to_string())
    }

    /// Drop the video stream.
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Drop the audio stream.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Cap the number of output video frames.
    pub fn max_frames(self, frames: usize) -> Self {
        self.output_arg("-frames:v").output_arg(frames.to_string())
    }

    /// Set output container/raw format.
    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_arg("-f").output_arg(format)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-nostdin".to_string());
        args.push("-v".to_string());
        args.push("error".to_string());

        args.extend(self.input_args.clone());

        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().to_string());

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Replace this command's file paths in process output with placeholders.
    fn redact(&self, text: &str) -> String {
        let mut redacted = text.replace(self.input.to_string_lossy().as_ref(), "<input>");
        if self.output != Path::new(PIPE_OUTPUT) {
            redacted = redacted.replace(self.output.to_string_lossy().as_ref(), "<output>");
        }
        redacted
    }
}

/// How a supervised child process ended.
enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
}

/// Runner for FFmpeg commands with a wall-clock limit.
///
/// The child is killed when the limit expires or when the returned future is
/// dropped, so abandoning a request stops its FFmpeg work.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Wall-clock limit for the process
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run an FFmpeg command that writes to a file.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.execute(cmd, false).await.map(|_| ())
    }

    /// Run an FFmpeg command and collect everything it writes to stdout.
    pub async fn run_capture(&self, cmd: &FfmpegCommand) -> MediaResult<Vec<u8>> {
        self.execute(cmd, true).await
    }

    async fn execute(&self, cmd: &FfmpegCommand, capture_stdout: bool) -> MediaResult<Vec<u8>> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(if capture_stdout {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take();
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        // Drain both pipes concurrently so a full pipe never stalls the child
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout {
                out.read_to_end(&mut buf).await?;
            }
            Ok::<_, std::io::Error>(buf)
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let mut err = stderr;
            let _ = err.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).to_string()
        });

        let outcome = self.wait_for_completion(&mut child).await;

        let stdout_bytes = stdout_task
            .await
            .map_err(|e| MediaError::internal(format!("FFmpeg stdout reader failed: {}", e)))?;
        let stderr_text = stderr_task.await.unwrap_or_default();

        match outcome {
            WaitOutcome::Exited(status) => {
                let status = status?;
                if status.success() {
                    Ok(stdout_bytes?)
                } else {
                    let stderr = cmd.redact(&stderr_text);
                    Err(MediaError::ffmpeg_failed(
                        "FFmpeg exited with non-zero status",
                        Some(excerpt(stderr.trim(), STDERR_EXCERPT_CHARS)),
                        status.code(),
                    ))
                }
            }
            WaitOutcome::TimedOut => Err(MediaError::Timeout(
                self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            )),
        }
    }

    /// Wait for the child process, killing it if the limit expires.
    async fn wait_for_completion(&self, child: &mut Child) -> WaitOutcome {
        let timeout = self.timeout;
        let deadline = async move {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => WaitOutcome::Exited(status),
            _ = deadline => WaitOutcome::TimedOut,
        };

        if let WaitOutcome::TimedOut = outcome {
            warn!(
                "FFmpeg timed out after {} seconds, killing process",
                timeout.map(|t| t.as_secs()).unwrap_or_default()
            );
            let _ = child.kill().await;
        }

        outcome
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("input.mp4", "output.mp4")
            .seek(10.0)
            .duration(30.0)
            .map("0:v:0")
            .map("0:a:0?")
            .video_codec("libx264");

        let args = cmd.build_args();
        assert_eq!(args[0], "-y");
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"10.000".to_string()));
        assert!(args.contains(&"30.000".to_string()));
        assert!(args.contains(&"0:a:0?".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");

        // Seek must precede the input for fast input seeking
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
    }

    #[test]
    fn test_pipe_command() {
        let cmd = FfmpegCommand::to_pipe("clip.mp4")
            .no_video()
            .audio_sample_rate(16000)
            .format("f32le");

        let args = cmd.build_args();
        assert_eq!(args.last().unwrap(), PIPE_OUTPUT);
        assert!(args.contains(&"f32le".to_string()));
        assert!(args.contains(&"16000".to_string()));
    }

    #[test]
    fn test_redact_paths() {
        let cmd = FfmpegCommand::new("/tmp/work/req_1/input.mp4", "/tmp/work/req_1/out.mp4");
        let text = "/tmp/work/req_1/input.mp4: Invalid data; cannot write /tmp/work/req_1/out.mp4";
        let redacted = cmd.redact(text);
        assert!(!redacted.contains("/tmp"));
        assert!(redacted.contains("<input>"));
        assert!(redacted.contains("<output>"));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_runner_reports_failure_for_missing_input() {
        let cmd = FfmpegCommand::new("/nonexistent/input.mp4", "/nonexistent/out.mp4");
        let err = FfmpegRunner::new()
            .with_timeout(Duration::from_secs(10))
            .run(&cmd)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FfmpegFailed { .. }));
        assert!(!err.diagnostic().contains("/nonexistent"));
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_runner_kills_process_on_timeout() {
        let dir = tempfile::tempdir().unwrap();
        // An endless synthetic source never finishes on its own
        let cmd = FfmpegCommand::new("anullsrc=r=16000:cl=mono", dir.path().join("out.wav"))
            .input_arg("-f")
            .input_arg("lavfi");

        let started = std::time::Instant::now();
        let err = FfmpegRunner::new()
            .with_timeout(Duration::from_secs(1))
            .run(&cmd)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Timeout(1)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
