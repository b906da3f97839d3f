//! Batch manifests.
//!
//! A manifest is a CSV file with a header row containing a `uid` column.
//! Other columns (labels, glosses, splits) are ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use signpose_common::error::{SignposeError, SignposeResult};

/// One video to process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub uid: String,
}

impl ManifestEntry {
    /// Video file name for this entry (`.mp4` is appended unless present).
    pub fn video_file_name(&self) -> String {
        if self.uid.to_ascii_lowercase().ends_with(".mp4") {
            self.uid.clone()
        } else {
            format!("{}.mp4", self.uid)
        }
    }

    pub fn video_path(&self, videos_dir: &Path) -> PathBuf {
        videos_dir.join(self.video_file_name())
    }

    /// Bundle path for this entry, always `<uid>.npz`.
    pub fn output_path(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(format!("{}.npz", self.uid))
    }
}

/// Parse manifest rows from CSV text.
pub fn parse_manifest(content: &str) -> Result<Vec<ManifestEntry>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());
    reader
        .deserialize::<ManifestEntry>()
        .filter(|row| !matches!(row, Ok(entry) if entry.uid.is_empty()))
        .collect()
}

/// Load a manifest file.
pub fn load_manifest(path: &Path) -> SignposeResult<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SignposeError::missing_input("manifest", path)
        } else {
            SignposeError::Io(e)
        }
    })?;
    parse_manifest(&content).map_err(|e| {
        SignposeError::invalid_argument(format!("invalid manifest {}: {e}", path.display()))
    })
}
