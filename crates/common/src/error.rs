//! Error types shared across Signpose crates.

use std::path::PathBuf;

/// Top-level error type for Signpose operations.
#[derive(Debug, thiserror::Error)]
pub enum SignposeError {
    #[error("Source unreadable: {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Missing input file for item '{item}': {path}")]
    MissingInputFile { item: String, path: PathBuf },

    #[error("Schema mismatch in {path} (array '{name}'): {message}")]
    SchemaMismatch {
        path: PathBuf,
        name: String,
        message: String,
    },

    #[error("Write failure at {path}: {message}")]
    WriteFailure { path: PathBuf, message: String },

    /// The detector answered, but not with a usable result for this frame.
    #[error("Detector error: {message}")]
    Detector { message: String },

    /// The detector process cannot be reached any more.
    #[error("Detector unavailable: {message}")]
    DetectorUnavailable { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SignposeError.
pub type SignposeResult<T> = Result<T, SignposeError>;

impl SignposeError {
    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_input(item: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingInputFile {
            item: item.into(),
            path: path.into(),
        }
    }

    pub fn schema_mismatch(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn write_failure(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn detector(msg: impl Into<String>) -> Self {
        Self::Detector {
            message: msg.into(),
        }
    }

    pub fn detector_unavailable(msg: impl Into<String>) -> Self {
        Self::DetectorUnavailable {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }

    /// Whether a batch run may skip the failing item and continue.
    ///
    /// Output, configuration and detector process failures abort the run.
    pub fn is_item_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnreadable { .. }
                | Self::MissingInputFile { .. }
                | Self::SchemaMismatch { .. }
                | Self::Detector { .. }
        )
    }
}
