//! Video sources.
//!
//! A [`VideoSource`] yields decoded RGB frames in order, one pass only.
//! The bundled implementation pipes raw frames out of an ffmpeg child
//! process and reads stream metadata with ffprobe.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;
use serde::Deserialize;
use signpose_common::error::{SignposeError, SignposeResult};
use signpose_common::process::{drain_stderr, join_stderr};

/// Stream metadata reported by a source. Rate and count may be unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frames per second, `None` when unknown or reported as zero.
    pub fps: Option<f64>,
    /// Total frame count, `None` when the container does not report it.
    pub frame_count: Option<u64>,
}

/// Sequential frame reader.
///
/// Implementations release their underlying handles on drop.
pub trait VideoSource {
    fn info(&self) -> &VideoInfo;

    /// Next frame, or `None` at end of stream.
    fn read_frame(&mut self) -> SignposeResult<Option<RgbImage>>;
}

/// Opens a [`VideoSource`] for a path.
pub trait SourceOpener {
    fn open(&self, path: &Path) -> SignposeResult<Box<dyn VideoSource>>;
}

/// Opens sources through ffprobe + ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    pub ffmpeg: String,
    pub ffprobe: String,
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl SourceOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> SignposeResult<Box<dyn VideoSource>> {
        Ok(Box::new(FfmpegSource::open(path, &self.ffmpeg, &self.ffprobe)?))
    }
}

/// Raw-frame reader backed by an ffmpeg child process.
pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_task: Option<JoinHandle<String>>,
    frame_bytes: usize,
    frames_read: u64,
}

impl FfmpegSource {
    pub fn open(path: &Path, ffmpeg: &str, ffprobe: &str) -> SignposeResult<Self> {
        if !path.is_file() {
            return Err(SignposeError::source_unreadable(path, "file does not exist"));
        }

        let info = probe_video(path, ffprobe)?;
        let frame_bytes = info.width as usize * info.height as usize * 3;

        let mut child = Command::new(ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-map", "0:v:0", "-vsync", "passthrough", "-f", "rawvideo", "-pix_fmt", "rgb24",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SignposeError::source_unreadable(path, format!("cannot start ffmpeg: {e}")))?;

        let stdout = child.stdout.take();
        let stderr_task = child.stderr.take().map(drain_stderr);

        tracing::debug!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            fps = ?info.fps,
            frame_count = ?info.frame_count,
            "Opened video source"
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
            child: Some(child),
            stdout,
            stderr_task,
            frame_bytes,
            frames_read: 0,
        })
    }

    /// Reap the decoder and report how it exited.
    fn finish(&mut self) -> SignposeResult<()> {
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| {
            SignposeError::source_unreadable(&self.path, format!("cannot wait on ffmpeg: {e}"))
        })?;
        let stderr = join_stderr(self.stderr_task.take());
        if !status.success() {
            return Err(SignposeError::source_unreadable(
                &self.path,
                format!(
                    "ffmpeg decode failed after {} frames ({status}): {}",
                    self.frames_read,
                    stderr.trim()
                ),
            ));
        }
        Ok(())
    }
}

impl VideoSource for FfmpegSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read_frame(&mut self) -> SignposeResult<Option<RgbImage>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; self.frame_bytes];
        let mut filled = 0;
        while filled < buffer.len() {
            let n = stdout.read(&mut buffer[filled..]).map_err(|e| {
                SignposeError::source_unreadable(&self.path, format!("frame read failed: {e}"))
            })?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }
        if filled < buffer.len() {
            self.finish()?;
            return Err(SignposeError::source_unreadable(
                &self.path,
                format!(
                    "truncated frame {} ({filled} of {} bytes)",
                    self.frames_read,
                    buffer.len()
                ),
            ));
        }

        self.frames_read += 1;
        RgbImage::from_raw(self.info.width, self.info.height, buffer)
            .map(Some)
            .ok_or_else(|| SignposeError::source_unreadable(&self.path, "frame buffer size mismatch"))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = join_stderr(self.stderr_task.take());
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

fn probe_video(path: &Path, ffprobe: &str) -> SignposeResult<VideoInfo> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,avg_frame_rate,r_frame_rate,nb_frames",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| SignposeError::source_unreadable(path, format!("cannot run ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(SignposeError::source_unreadable(
            path,
            format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    parse_probe_output(&output.stdout)
        .map_err(|reason| SignposeError::source_unreadable(path, reason))
}

fn parse_probe_output(raw: &[u8]) -> Result<VideoInfo, String> {
    let probe: ProbeOutput =
        serde_json::from_slice(raw).map_err(|e| format!("unparseable ffprobe output: {e}"))?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no dimensions".to_string()),
    };

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate));
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|n| *n > 0);

    Ok(VideoInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

/// Parse an ffprobe rational such as `30000/1001`. Zero rates are unknown.
fn parse_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("25"), Some(25.0));
        assert_eq!(parse_rate("N/A"), None);
    }

    #[test]
    fn test_parse_probe_output() {
        let raw = br#"{"streams":[{"width":1280,"height":720,"avg_frame_rate":"30/1","r_frame_rate":"30/1","nb_frames":"90"}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.fps, Some(30.0));
        assert_eq!(info.frame_count, Some(90));
    }

    #[test]
    fn test_parse_probe_output_unknown_rate_and_count() {
        let raw = br#"{"streams":[{"width":640,"height":480,"avg_frame_rate":"0/0","r_frame_rate":"0/0"}]}"#;
        let info = parse_probe_output(raw).unwrap();
        assert_eq!(info.fps, None);
        assert_eq!(info.frame_count, None);
    }

    #[test]
    fn test_parse_probe_output_without_video() {
        assert!(parse_probe_output(br#"{"streams":[]}"#).is_err());
        assert!(parse_probe_output(b"garbage").is_err());
    }

    #[test]
    fn test_open_missing_file_is_unreadable() {
        let err = FfmpegSource::open(Path::new("/nonexistent/clip.mp4"), "ffmpeg", "ffprobe")
            .err()
            .unwrap();
        assert!(matches!(err, SignposeError::SourceUnreadable { .. }));
    }
}
