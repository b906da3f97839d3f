//! Landmark detectors.
//!
//! A [`LandmarkDetector`] turns one RGB image into a raw [`Detection`]. The
//! bundled [`ProcessDetector`] drives an external sidecar over stdin/stdout
//! using a line-delimited JSON protocol:
//!
//! ```text
//! -> {"width":W,"height":H,"format":"rgb24"}\n  followed by W*H*3 bytes
//! <- {"pose":[[x,y,z,v],...]|null,"left_hand":...,"right_hand":...,"face":...}\n
//! ```
//!
//! A reply may carry `"error": "..."` instead of groups. Bad replies fail
//! the current frame with [`SignposeError::Detector`]; a sidecar that can no
//! longer be written to or read from fails with
//! [`SignposeError::DetectorUnavailable`].

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use signpose_common::config::DetectorConfig;
use signpose_common::error::{SignposeError, SignposeResult};
use signpose_common::process::{drain_stderr, join_stderr};
use signpose_landmark_model::{Detection, GroupKind, LandmarkPoint};

/// Per-image landmark detection.
///
/// Detectors are scoped resources: acquire once per run, call
/// [`close`](LandmarkDetector::close) when done.
pub trait LandmarkDetector {
    fn name(&self) -> &str;

    fn detect(&mut self, image: &RgbImage) -> SignposeResult<Detection>;

    /// Release the detector. Further `detect` calls fail.
    fn close(&mut self) -> SignposeResult<()> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct FrameHeader<'a> {
    width: u32,
    height: u32,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    #[serde(default)]
    pose: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    left_hand: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    right_hand: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    face: Option<Vec<Vec<f32>>>,
    #[serde(default)]
    error: Option<String>,
}

impl WireReply {
    fn group(&self, kind: GroupKind) -> Option<&Vec<Vec<f32>>> {
        match kind {
            GroupKind::Pose => self.pose.as_ref(),
            GroupKind::LeftHand => self.left_hand.as_ref(),
            GroupKind::RightHand => self.right_hand.as_ref(),
            GroupKind::Face => self.face.as_ref(),
        }
    }
}

/// Decode one reply line into a [`Detection`].
pub fn parse_reply(line: &str) -> SignposeResult<Detection> {
    let reply: WireReply = serde_json::from_str(line.trim())
        .map_err(|e| SignposeError::detector(format!("unparseable detector reply: {e}")))?;

    if let Some(message) = reply.error.as_deref() {
        return Err(SignposeError::detector(format!("detector reported: {message}")));
    }

    let mut detection = Detection::default();
    for kind in GroupKind::ALL {
        let Some(raw) = reply.group(kind) else {
            continue;
        };
        let points = raw
            .iter()
            .enumerate()
            .map(|(i, values)| match values.as_slice() {
                [x, y, z] => Ok(LandmarkPoint::new(*x, *y, *z)),
                [x, y, z, v] => Ok(LandmarkPoint::with_visibility(*x, *y, *z, *v)),
                other => Err(SignposeError::detector(format!(
                    "{kind} point {i} has {} values, expected 3 or 4",
                    other.len()
                ))),
            })
            .collect::<SignposeResult<Vec<_>>>()?;
        detection.set_group(kind, Some(points));
    }
    Ok(detection)
}

/// Detector backed by a long-lived sidecar process.
pub struct ProcessDetector {
    name: String,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_task: Option<JoinHandle<String>>,
    frames_sent: u64,
}

impl ProcessDetector {
    pub fn spawn(config: &DetectorConfig) -> SignposeResult<Self> {
        if !config.is_configured() {
            return Err(SignposeError::config(
                "no landmark detector configured (set extraction.detector.command)",
            ));
        }

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SignposeError::detector_unavailable(format!(
                    "cannot start '{}': {e}",
                    config.command
                ))
            })?;

        let stdin = child.stdin.take().map(BufWriter::new);
        let stdout = child.stdout.take().map(BufReader::new);
        let stderr_task = child.stderr.take().map(drain_stderr);

        tracing::info!(command = %config.command, pid = child.id(), "Started landmark detector");

        Ok(Self {
            name: config.command.clone(),
            child: Some(child),
            stdin,
            stdout,
            stderr_task,
            frames_sent: 0,
        })
    }

    fn send_frame(&mut self, image: &RgbImage) -> std::io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| std::io::Error::other("detector is closed"))?;
        let header = FrameHeader {
            width: image.width(),
            height: image.height(),
            format: "rgb24",
        };
        serde_json::to_writer(&mut *stdin, &header)?;
        stdin.write_all(b"\n")?;
        stdin.write_all(image.as_raw())?;
        stdin.flush()
    }

    fn read_reply(&mut self) -> SignposeResult<String> {
        let stdout = self
            .stdout
            .as_mut()
            .ok_or_else(|| SignposeError::detector_unavailable("detector is closed"))?;
        let mut line = String::new();
        let n = stdout
            .read_line(&mut line)
            .map_err(|e| {
                SignposeError::detector_unavailable(format!("reply read failed: {e}"))
            })?;
        if n == 0 {
            return Err(SignposeError::detector_unavailable(format!(
                "detector exited after {} frames",
                self.frames_sent
            )));
        }
        Ok(line)
    }
}

impl LandmarkDetector for ProcessDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&mut self, image: &RgbImage) -> SignposeResult<Detection> {
        self.send_frame(image)
            .map_err(|e| {
                SignposeError::detector_unavailable(format!("frame write failed: {e}"))
            })?;
        self.frames_sent += 1;
        let line = self.read_reply()?;
        parse_reply(&line)
    }

    fn close(&mut self) -> SignposeResult<()> {
        // Closing stdin is the sidecar's signal to exit.
        self.stdin = None;
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| {
                SignposeError::detector_unavailable(format!("cannot wait on detector: {e}"))
            })?;
        let stderr = join_stderr(self.stderr_task.take());
        tracing::debug!(frames = self.frames_sent, %status, "Landmark detector closed");
        if !status.success() {
            return Err(SignposeError::detector_unavailable(format!(
                "detector exited with {status}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

impl Drop for ProcessDetector {
    fn drop(&mut self) {
        self.stdin = None;
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = join_stderr(self.stderr_task.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_groups() {
        let line = r#"{"pose":[[0.5,0.25,-0.1,0.9]],"left_hand":null,"right_hand":[[0.1,0.2,0.0]]}"#;
        let detection = parse_reply(line).unwrap();

        let pose = detection.pose.unwrap();
        assert_eq!(pose[0], LandmarkPoint::with_visibility(0.5, 0.25, -0.1, 0.9));
        assert!(detection.left_hand.is_none());
        assert_eq!(
            detection.right_hand.unwrap()[0],
            LandmarkPoint::new(0.1, 0.2, 0.0)
        );
        assert!(detection.face.is_none());
    }

    #[test]
    fn test_parse_reply_empty_object_detects_nothing() {
        assert_eq!(parse_reply("{}\n").unwrap(), Detection::default());
    }

    #[test]
    fn test_parse_reply_error_field() {
        let err = parse_reply(r#"{"error":"model not loaded"}"#).unwrap_err();
        assert!(matches!(err, SignposeError::Detector { .. }));
        assert!(err.to_string().contains("model not loaded"));
    }

    #[test]
    fn test_parse_reply_rejects_bad_point_arity() {
        assert!(parse_reply(r#"{"face":[[0.1,0.2]]}"#).is_err());
        assert!(parse_reply("not json").is_err());
    }

    #[test]
    fn test_spawn_requires_command() {
        let err = ProcessDetector::spawn(&DetectorConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, SignposeError::Config { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_sidecar_roundtrip_with_shell_script() {
        // Reads the header line and a 1x1 frame (3 bytes), answers with one pose point.
        let script = r#"
            while IFS= read -r header; do
                head -c 3 >/dev/null
                echo '{"pose":[[0.5,0.5,0.0,1.0]]}'
            done
        "#;
        let config = DetectorConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        };
        let mut detector = ProcessDetector::spawn(&config).unwrap();
        let image = RgbImage::new(1, 1);

        for _ in 0..3 {
            let detection = detector.detect(&image).unwrap();
            assert_eq!(detection.pose.unwrap().len(), 1);
        }
        detector.close().unwrap();
        assert!(matches!(
            detector.detect(&image),
            Err(SignposeError::DetectorUnavailable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_sidecar_exit_is_unavailable_not_a_bad_frame() {
        // Answers one frame with an error, a second with nothing, then exits.
        let script = r#"
            IFS= read -r header; head -c 3 >/dev/null
            echo '{"error":"no model"}'
            IFS= read -r header; head -c 3 >/dev/null
            echo '{}'
        "#;
        let config = DetectorConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        };
        let mut detector = ProcessDetector::spawn(&config).unwrap();
        let image = RgbImage::new(1, 1);

        assert!(matches!(
            detector.detect(&image),
            Err(SignposeError::Detector { .. })
        ));
        assert_eq!(detector.detect(&image).unwrap(), Detection::default());
        let err = detector.detect(&image).unwrap_err();
        assert!(matches!(err, SignposeError::DetectorUnavailable { .. }));
        assert!(!err.is_item_recoverable());
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let config = DetectorConfig {
            command: "signpose-no-such-detector".to_string(),
            args: Vec::new(),
        };
        let err = ProcessDetector::spawn(&config).err().unwrap();
        assert!(matches!(err, SignposeError::DetectorUnavailable { .. }));
    }
}
