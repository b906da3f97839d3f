//! Video sinks.
//!
//! A [`VideoSink`] accepts frames of a fixed size in order and produces a
//! playable file on [`finish`](VideoSink::finish). The ffmpeg sink encodes
//! into a temporary file next to the destination and renames it into place
//! only after the encoder exits cleanly, so a failed render never leaves a
//! partial video at the output path.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;
use signpose_common::error::{SignposeError, SignposeResult};
use signpose_common::process::{drain_stderr, join_stderr};
use tempfile::NamedTempFile;

/// Ordered frame consumer.
pub trait VideoSink {
    /// Append the next frame. Every frame must match the sink's size.
    fn append(&mut self, frame: &RgbImage) -> SignposeResult<()>;

    /// Flush and close the output. No frames may follow.
    fn finish(&mut self) -> SignposeResult<()>;

    /// Frames appended so far.
    fn frames_written(&self) -> u64;
}

/// Encoder settings for [`FfmpegSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub ffmpeg: String,
}

/// H.264 encoder fed with raw RGB frames over stdin.
pub struct FfmpegSink {
    output: PathBuf,
    temp: Option<NamedTempFile>,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr_task: Option<JoinHandle<String>>,
    width: u32,
    height: u32,
    frames: u64,
}

impl FfmpegSink {
    pub fn create(output: &Path, config: &SinkConfig) -> SignposeResult<Self> {
        if config.width == 0 || config.height == 0 || config.fps == 0 {
            return Err(SignposeError::invalid_argument(format!(
                "invalid output geometry {}x{} @ {} fps",
                config.width, config.height, config.fps
            )));
        }
        // yuv420p subsamples chroma 2x2
        if config.width % 2 != 0 || config.height % 2 != 0 {
            return Err(SignposeError::invalid_argument(format!(
                "output size {}x{} must have an even width and height",
                config.width, config.height
            )));
        }

        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| {
            SignposeError::write_failure(output, format!("cannot create output directory: {e}"))
        })?;

        let extension = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let temp = tempfile::Builder::new()
            .prefix(".signpose-")
            .suffix(&format!(".partial.{extension}"))
            .tempfile_in(&parent)
            .map_err(|e| SignposeError::write_failure(output, format!("cannot create temp file: {e}")))?;

        let args = encoder_args(config, temp.path());
        tracing::debug!(args = ?args, "Starting ffmpeg encoder");

        let mut child = Command::new(&config.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SignposeError::write_failure(output, format!("cannot start ffmpeg: {e}")))?;

        let stdin = child.stdin.take().map(BufWriter::new);
        let stderr_task = child.stderr.take().map(drain_stderr);

        tracing::info!(
            pid = child.id(),
            output = %output.display(),
            width = config.width,
            height = config.height,
            fps = config.fps,
            "ffmpeg encoder started"
        );

        Ok(Self {
            output: output.to_path_buf(),
            temp: Some(temp),
            child: Some(child),
            stdin,
            stderr_task,
            width: config.width,
            height: config.height,
            frames: 0,
        })
    }

    /// Stop the encoder and collect its stderr.
    fn reap(&mut self) -> SignposeResult<(std::process::ExitStatus, String)> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| SignposeError::write_failure(&self.output, "sink already finished"))?;
        let status = child.wait().map_err(|e| {
            SignposeError::write_failure(&self.output, format!("cannot wait on ffmpeg: {e}"))
        })?;
        Ok((status, join_stderr(self.stderr_task.take())))
    }
}

impl VideoSink for FfmpegSink {
    fn append(&mut self, frame: &RgbImage) -> SignposeResult<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(SignposeError::invalid_argument(format!(
                "frame is {}x{}, sink expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| SignposeError::write_failure(&self.output, "sink already finished"))?;
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            // A broken pipe means ffmpeg died; its stderr says why.
            self.stdin = None;
            let detail = match self.reap() {
                Ok((status, stderr)) => format!("ffmpeg exited ({status}): {}", stderr.trim()),
                Err(_) => e.to_string(),
            };
            return Err(SignposeError::write_failure(
                &self.output,
                format!("frame {} write failed: {detail}", self.frames),
            ));
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> SignposeResult<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().map_err(|e| {
                SignposeError::write_failure(&self.output, format!("flush to ffmpeg failed: {e}"))
            })?;
        }

        let (status, stderr) = self.reap()?;
        if !status.success() {
            return Err(SignposeError::write_failure(
                &self.output,
                format!("ffmpeg encode failed (status {status}): {}", stderr.trim()),
            ));
        }

        let temp = self
            .temp
            .take()
            .ok_or_else(|| SignposeError::write_failure(&self.output, "sink already finished"))?;
        temp.persist(&self.output).map_err(|e| {
            SignposeError::write_failure(&self.output, format!("cannot move video into place: {e}"))
        })?;

        tracing::info!(
            output = %self.output.display(),
            frames = self.frames,
            "Video finalized"
        );
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = join_stderr(self.stderr_task.take());
        // Dropping an unpersisted temp file removes it.
        self.temp = None;
    }
}

fn encoder_args(config: &SinkConfig, temp_path: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-v".to_string(),
        "error".to_string(),
        // Raw RGB input from stdin
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-s".to_string(),
        format!("{}x{}", config.width, config.height),
        "-r".to_string(),
        config.fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-crf".to_string(),
        "18".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        temp_path.to_string_lossy().into_owned(),
    ]
}
