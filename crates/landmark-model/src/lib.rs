//! Signpose Landmark Model
//!
//! Defines the data contracts shared by extraction and rendering:
//! - **Landmarks:** normalized keypoints and raw detector output
//! - **Frame records:** fixed-cardinality pose / hand / face groups per time step
//! - **Series:** the time-ordered sequence of frame records for one video
//! - **Bundle:** the compressed `.npz`-compatible persisted form of a series
//! - **Manifest:** batch lists of videos to extract
//!
//! Coordinates are normalized to `[0.0, 1.0]` image space; values are
//! single precision everywhere.

pub mod bundle;
pub mod frame;
pub mod landmark;
pub mod manifest;
pub mod npy;
pub mod series;

pub use bundle::{read_series, write_series};
pub use frame::FrameRecord;
pub use landmark::*;
pub use manifest::{load_manifest, ManifestEntry};
pub use series::Series;
