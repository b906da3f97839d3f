//! Frame decimation.
//!
//! Sampling keeps every `step`-th source frame, where
//! `step = max(1, round(source_fps / target_fps))`. This is plain
//! decimation: rounding drift is not corrected over long videos and frames
//! are never duplicated when the target exceeds the source rate.

use image::RgbImage;
use signpose_common::error::SignposeResult;

use crate::source::VideoSource;

/// Decimation factor for reaching `target_fps` from `source_fps`.
///
/// Halfway ratios round to even (25 fps sampled at 10 fps keeps every
/// second frame). A non-positive target keeps every frame.
pub fn sampling_step(source_fps: f64, target_fps: f64) -> usize {
    if target_fps <= 0.0 || !target_fps.is_finite() || !source_fps.is_finite() {
        return 1;
    }
    let ratio = (source_fps / target_fps).round_ties_even();
    if ratio < 1.0 {
        1
    } else {
        ratio as usize
    }
}

/// The source rate to plan with: the reported one, or `fallback` when the
/// source reports none.
pub fn effective_fps(reported: Option<f64>, fallback: f64) -> f64 {
    reported.filter(|fps| *fps > 0.0).unwrap_or(fallback)
}

/// A frame cap of zero means no cap.
pub fn frame_cap(max_frames: Option<usize>) -> Option<usize> {
    max_frames.filter(|cap| *cap > 0)
}

/// Number of frames kept from `source_frames` frames at `step`.
pub fn expected_kept(source_frames: u64, step: usize, max_frames: Option<usize>) -> u64 {
    let step = step.max(1) as u64;
    let kept = source_frames.div_ceil(step);
    match frame_cap(max_frames) {
        Some(cap) => kept.min(cap as u64),
        None => kept,
    }
}

/// A frame chosen for detection.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Index of the frame in the source stream.
    pub index: u64,
    pub image: RgbImage,
}

/// Lazy, single-pass iterator over the frames kept from a source.
pub struct FrameSampler<'a, S: VideoSource + ?Sized> {
    source: &'a mut S,
    step: usize,
    max_frames: Option<usize>,
    next_index: u64,
    kept: usize,
    done: bool,
}

impl<'a, S: VideoSource + ?Sized> FrameSampler<'a, S> {
    /// `max_frames` of `Some(0)` is treated like `None`.
    pub fn new(source: &'a mut S, step: usize, max_frames: Option<usize>) -> Self {
        Self {
            source,
            step: step.max(1),
            max_frames: frame_cap(max_frames),
            next_index: 0,
            kept: 0,
            done: false,
        }
    }

    /// Source frames consumed so far, kept or not.
    pub fn frames_read(&self) -> u64 {
        self.next_index
    }

    pub fn frames_kept(&self) -> usize {
        self.kept
    }

    pub fn step(&self) -> usize {
        self.step
    }
}

impl<S: VideoSource + ?Sized> Iterator for FrameSampler<'_, S> {
    type Item = SignposeResult<SampledFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.max_frames.is_some_and(|cap| self.kept >= cap) {
            self.done = true;
            return None;
        }

        loop {
            let image = match self.source.read_frame() {
                Ok(Some(image)) => image,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            let index = self.next_index;
            self.next_index += 1;
            if index % self.step as u64 == 0 {
                self.kept += 1;
                return Some(Ok(SampledFrame { index, image }));
            }
        }
    }
}
