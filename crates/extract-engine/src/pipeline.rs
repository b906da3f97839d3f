//! Single-video extraction.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use signpose_common::error::{SignposeError, SignposeResult};
use signpose_landmark_model::{write_series, FrameRecord, GroupKind, Series};

use crate::detector::LandmarkDetector;
use crate::sampler::{effective_fps, sampling_step, FrameSampler};
use crate::source::{SourceOpener, VideoSource};

/// Extraction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Target sampling rate. Zero or negative keeps every frame.
    pub target_fps: f64,
    /// Source rate assumed when the source reports none.
    pub fallback_fps: f64,
    /// Stop after this many kept frames. `Some(0)` means no cap.
    pub max_frames: Option<usize>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            target_fps: 30.0,
            fallback_fps: 30.0,
            max_frames: None,
        }
    }
}

/// Outcome of one extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub output: PathBuf,
    pub source_fps: f64,
    pub step: usize,
    pub frames_read: u64,
    pub frames_kept: usize,
    /// Fraction of kept frames with each group detected, in bundle column order.
    pub detection_rates: [f64; 4],
    pub elapsed_ms: u64,
}

/// An assembled series plus the sampling facts that produced it.
#[derive(Debug, Clone)]
pub struct ExtractedSeries {
    pub series: Series,
    pub source_fps: f64,
    pub step: usize,
    pub frames_read: u64,
}

/// Sample `source`, run `detector` on every kept frame, and assemble a series.
///
/// A source that yields no frames at all is
/// [`SignposeError::SourceUnreadable`].
pub fn extract_series(
    source: &mut dyn VideoSource,
    detector: &mut dyn LandmarkDetector,
    options: &ExtractOptions,
    source_label: &Path,
) -> SignposeResult<ExtractedSeries> {
    let source_fps = effective_fps(source.info().fps, options.fallback_fps);
    let step = sampling_step(source_fps, options.target_fps);
    tracing::debug!(
        path = %source_label.display(),
        source_fps,
        target_fps = options.target_fps,
        step,
        "Sampling plan"
    );

    let mut sampler = FrameSampler::new(source, step, options.max_frames);
    let mut records = Vec::new();
    for frame in sampler.by_ref() {
        let frame = frame?;
        let detection = detector.detect(&frame.image).map_err(|e| match e {
            SignposeError::Detector { message } => SignposeError::detector(format!(
                "{} frame {}: {message}",
                source_label.display(),
                frame.index
            )),
            SignposeError::DetectorUnavailable { message } => {
                SignposeError::detector_unavailable(format!(
                    "{} frame {}: {message}",
                    source_label.display(),
                    frame.index
                ))
            }
            other => other,
        })?;
        records.push(FrameRecord::from_detection(&detection));
    }
    let frames_read = sampler.frames_read();

    if frames_read == 0 {
        return Err(SignposeError::source_unreadable(
            source_label,
            "source yielded no frames",
        ));
    }

    Ok(ExtractedSeries {
        series: Series::assemble(records),
        source_fps,
        step,
        frames_read,
    })
}

/// Extract one video into a bundle at `output`.
///
/// The source is opened through `opener` and released before returning on
/// every path. Nothing is written unless extraction succeeds.
pub fn extract_to_bundle(
    opener: &dyn SourceOpener,
    detector: &mut dyn LandmarkDetector,
    input: &Path,
    output: &Path,
    options: &ExtractOptions,
) -> SignposeResult<ExtractionSummary> {
    let started = Instant::now();

    let ExtractedSeries {
        series,
        source_fps,
        step,
        frames_read,
    } = {
        let mut source = opener.open(input)?;
        extract_series(source.as_mut(), detector, options, input)?
    };

    write_series(&series, output)?;

    let mut detection_rates = [0.0; 4];
    for kind in GroupKind::ALL {
        detection_rates[kind.index()] = series.detection_rate(kind).unwrap_or(0.0);
    }

    let summary = ExtractionSummary {
        output: output.to_path_buf(),
        source_fps,
        step,
        frames_read,
        frames_kept: series.len(),
        detection_rates,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    tracing::info!(
        path = %input.display(),
        output = %output.display(),
        frames = summary.frames_kept,
        frames_read,
        step,
        elapsed_ms = summary.elapsed_ms,
        "Extraction complete"
    );

    Ok(summary)
}
