//! Series rendering: bundle in, video out.

use std::path::{Path, PathBuf};
use std::time::Instant;

use signpose_common::error::{SignposeError, SignposeResult};
use signpose_common::process::command_exists;
use signpose_landmark_model::{read_series, Series};

use crate::compositor::{FrameSynthesizer, SynthesisOptions};
use crate::sink::{FfmpegSink, SinkConfig, VideoSink};

/// Render parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub synthesis: SynthesisOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            width: 640,
            height: 480,
            synthesis: SynthesisOptions::default(),
        }
    }
}

/// Progress callback for rendering.
pub type ProgressCallback = Box<dyn Fn(RenderProgress) + Send>;

/// Render progress report.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames handed to the sink so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    pub stage: RenderStage,
}

/// Stages of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
}

/// Outcome of a render.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub output: PathBuf,
    pub frames: u64,
    pub elapsed_ms: u64,
}

/// Synthesize every frame of `series` in order and append it to `sink`.
///
/// Exactly one output frame is produced per series frame. An empty series
/// is a [`SignposeError::WriteFailure`] since no valid video has zero
/// frames. The sink is finished on success only; on error it is left for
/// the caller to drop.
pub fn render_series(
    series: &Series,
    sink: &mut dyn VideoSink,
    output: &Path,
    options: &RenderOptions,
    progress: Option<&ProgressCallback>,
) -> SignposeResult<RenderSummary> {
    if series.is_empty() {
        return Err(SignposeError::write_failure(output, "series has no frames to render"));
    }

    let started = Instant::now();
    let total_frames = series.len() as u64;
    let synthesizer =
        FrameSynthesizer::for_series(series, options.width, options.height, options.synthesis);

    let report = |stage: RenderStage, done: u64| {
        if let Some(cb) = progress {
            let elapsed = started.elapsed().as_secs_f64();
            let eta_secs = if done == 0 {
                0.0
            } else {
                elapsed / done as f64 * (total_frames - done) as f64
            };
            cb(RenderProgress {
                progress: done as f64 / total_frames as f64,
                frames_rendered: done,
                total_frames,
                eta_secs,
                stage,
            });
        }
    };

    report(RenderStage::Preparing, 0);
    for (index, frame) in series.frames().iter().enumerate() {
        let canvas = synthesizer.synthesize(frame);
        sink.append(&canvas)?;
        report(RenderStage::Rendering, index as u64 + 1);
    }

    report(RenderStage::Finalizing, total_frames);
    sink.finish()?;
    report(RenderStage::Complete, total_frames);

    let summary = RenderSummary {
        output: output.to_path_buf(),
        frames: sink.frames_written(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        output = %output.display(),
        frames = summary.frames,
        elapsed_ms = summary.elapsed_ms,
        "Render complete"
    );
    Ok(summary)
}

/// Read the bundle at `input` and encode it to `output` with ffmpeg.
pub fn render_bundle(
    input: &Path,
    output: &Path,
    options: &RenderOptions,
    ffmpeg: &str,
    progress: Option<&ProgressCallback>,
) -> SignposeResult<RenderSummary> {
    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        fps = options.fps,
        width = options.width,
        height = options.height,
        "Starting render"
    );

    let series = read_series(input)?;
    if series.is_empty() {
        return Err(SignposeError::write_failure(output, "series has no frames to render"));
    }
    if !command_exists(ffmpeg) {
        return Err(SignposeError::write_failure(
            output,
            format!("video encoder '{ffmpeg}' not found"),
        ));
    }

    let mut sink = FfmpegSink::create(
        output,
        &SinkConfig {
            width: options.width,
            height: options.height,
            fps: options.fps,
            ffmpeg: ffmpeg.to_string(),
        },
    )?;
    render_series(&series, &mut sink, output, options, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use signpose_landmark_model::FrameRecord;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemorySink {
        frames: Vec<RgbImage>,
        finished: bool,
    }

    impl VideoSink for MemorySink {
        fn append(&mut self, frame: &RgbImage) -> SignposeResult<()> {
            assert!(!self.finished);
            self.frames.push(frame.clone());
            Ok(())
        }

        fn finish(&mut self) -> SignposeResult<()> {
            self.finished = true;
            Ok(())
        }

        fn frames_written(&self) -> u64 {
            self.frames.len() as u64
        }
    }

    #[test]
    fn test_output_frame_count_equals_series_length() {
        let series = Series::assemble(vec![FrameRecord::zeroed(); 7]);
        let mut sink = MemorySink::default();
        let options = RenderOptions {
            width: 64,
            height: 48,
            ..Default::default()
        };

        let summary =
            render_series(&series, &mut sink, Path::new("out.mp4"), &options, None).unwrap();

        assert_eq!(summary.frames, 7);
        assert_eq!(sink.frames.len(), 7);
        assert!(sink.finished);
        assert!(sink.frames.iter().all(|f| f.dimensions() == (64, 48)));
    }

    #[test]
    fn test_empty_series_is_write_failure() {
        let series = Series::assemble(Vec::new());
        let mut sink = MemorySink::default();
        let err = render_series(
            &series,
            &mut sink,
            Path::new("out.mp4"),
            &RenderOptions::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SignposeError::WriteFailure { .. }));
        assert!(!sink.finished);
    }

    #[test]
    fn test_progress_reaches_complete() {
        let series = Series::assemble(vec![FrameRecord::zeroed(); 4]);
        let mut sink = MemorySink::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let callback: ProgressCallback = Box::new(move |p: RenderProgress| {
            sink_seen.lock().unwrap().push((p.stage, p.frames_rendered));
        });

        render_series(
            &series,
            &mut sink,
            Path::new("out.mp4"),
            &RenderOptions {
                width: 8,
                height: 8,
                ..Default::default()
            },
            Some(&callback),
        )
        .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&(RenderStage::Preparing, 0)));
        assert_eq!(seen.last(), Some(&(RenderStage::Complete, 4)));
        assert_eq!(
            seen.iter()
                .filter(|(stage, _)| *stage == RenderStage::Rendering)
                .count(),
            4
        );
    }

    #[test]
    fn test_render_bundle_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_bundle(
            &dir.path().join("missing.npz"),
            &dir.path().join("out.mp4"),
            &RenderOptions::default(),
            "ffmpeg",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SignposeError::MissingInputFile { .. }));
    }
}
