//! Manifest-driven batch extraction.
//!
//! Items run one after another with a single shared detector. Per-item
//! failures are recorded and the run moves on; failures that affect every
//! item (output directory, bundle writes) abort the run.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use signpose_common::error::{SignposeError, SignposeResult};
use signpose_landmark_model::ManifestEntry;

use crate::detector::LandmarkDetector;
use crate::pipeline::{extract_to_bundle, ExtractOptions};
use crate::source::SourceOpener;

/// File name of the report written into the output directory.
pub const BATCH_REPORT_FILE: &str = "batch-report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Written,
    Skipped,
    Failed,
}

/// Outcome of one manifest entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub uid: String,
    pub status: ItemStatus,
    pub input: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    pub fn item(&self, uid: &str) -> Option<&BatchItem> {
        self.items.iter().find(|i| i.uid == uid)
    }
}

/// Where batch inputs come from and outputs go.
#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub videos_dir: PathBuf,
    pub out_dir: PathBuf,
}

/// Extract every manifest entry into `<out_dir>/<uid>.npz`.
///
/// The detector is borrowed for the whole run; closing it is the caller's
/// job. The report is also written to [`BATCH_REPORT_FILE`] in `out_dir`.
pub fn run_batch(
    opener: &dyn SourceOpener,
    detector: &mut dyn LandmarkDetector,
    entries: &[ManifestEntry],
    paths: &BatchPaths,
    options: &ExtractOptions,
) -> SignposeResult<BatchReport> {
    std::fs::create_dir_all(&paths.out_dir).map_err(|e| {
        SignposeError::write_failure(&paths.out_dir, format!("cannot create output directory: {e}"))
    })?;

    tracing::info!(
        items = entries.len(),
        videos_dir = %paths.videos_dir.display(),
        out_dir = %paths.out_dir.display(),
        detector = detector.name(),
        "Starting batch extraction"
    );

    let mut items = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let input = entry.video_path(&paths.videos_dir);
        let output = entry.output_path(&paths.out_dir);
        let _span = tracing::info_span!("item", uid = %entry.uid, position).entered();

        if !input.is_file() {
            let err = SignposeError::missing_input(&entry.uid, &input);
            tracing::warn!(error = %err, "Skipping item");
            items.push(BatchItem {
                uid: entry.uid.clone(),
                status: ItemStatus::Skipped,
                input,
                output: None,
                frames: None,
                reason: Some(err.to_string()),
            });
            continue;
        }

        match extract_to_bundle(opener, detector, &input, &output, options) {
            Ok(summary) => items.push(BatchItem {
                uid: entry.uid.clone(),
                status: ItemStatus::Written,
                input,
                output: Some(summary.output),
                frames: Some(summary.frames_kept),
                reason: None,
            }),
            Err(err) if err.is_item_recoverable() => {
                tracing::warn!(error = %err, "Item failed, continuing");
                items.push(BatchItem {
                    uid: entry.uid.clone(),
                    status: ItemStatus::Failed,
                    input,
                    output: None,
                    frames: None,
                    reason: Some(err.to_string()),
                });
            }
            Err(err) => {
                tracing::error!(error = %err, "Batch aborted");
                return Err(err);
            }
        }
    }

    let report = BatchReport {
        generated_at: Utc::now(),
        items,
    };
    write_report(&report, &paths.out_dir)?;

    tracing::info!(
        written = report.count(ItemStatus::Written),
        skipped = report.count(ItemStatus::Skipped),
        failed = report.count(ItemStatus::Failed),
        "Batch extraction finished"
    );
    Ok(report)
}

fn write_report(report: &BatchReport, out_dir: &Path) -> SignposeResult<()> {
    let path = out_dir.join(BATCH_REPORT_FILE);
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)
        .map_err(|e| SignposeError::write_failure(&path, format!("cannot write batch report: {e}")))
}
