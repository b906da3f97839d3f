//! Signpose Extract Engine
//!
//! Turns videos into landmark series:
//! - **Sources:** sequential RGB frame readers (ffmpeg-backed by default)
//! - **Sampling:** decimation from the source rate to a target rate
//! - **Detection:** per-frame landmark detection through a sidecar process
//! - **Pipeline:** sample, detect, assemble, persist
//! - **Batch:** manifest-driven runs with per-item failure isolation

pub mod batch;
pub mod detector;
pub mod pipeline;
pub mod sampler;
pub mod source;

pub use batch::{run_batch, BatchItem, BatchPaths, BatchReport, ItemStatus, BATCH_REPORT_FILE};
pub use detector::{LandmarkDetector, ProcessDetector};
pub use pipeline::{extract_series, extract_to_bundle, ExtractOptions, ExtractedSeries, ExtractionSummary};
pub use sampler::{sampling_step, FrameSampler, SampledFrame};
pub use source::{FfmpegOpener, FfmpegSource, SourceOpener, VideoInfo, VideoSource};
