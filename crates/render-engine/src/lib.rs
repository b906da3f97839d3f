//! Signpose Render Engine
//!
//! Turns a persisted landmark series back into a visualization video.
//!
//! # Pipeline Architecture
//!
//! ```text
//! clip.npz ── read ── Series
//!                       │
//!                       ├── FrameSynthesizer (black canvas, markers, skeleton)
//!                       │
//!                       ▼
//!                  VideoSink (raw RGB → ffmpeg → H.264)
//!                       │
//!                       ▼
//!                   clip.mp4
//! ```

pub mod compositor;
pub mod export;
pub mod sink;
pub mod skeleton;

pub use compositor::{group_style, project, synthesize, FrameSynthesizer, GroupStyle, SynthesisOptions};
pub use export::*;
pub use sink::{FfmpegSink, SinkConfig, VideoSink};
