//! Frame synthesizer: draws one frame record onto a blank canvas.
//!
//! Normalized `(x, y)` coordinates project to pixels as
//! `(round(x * width), round(y * height))`. Depth is ignored. Pose points are
//! drawn only when their visibility is positive; hand and face points always
//! draw. Zero-filled groups therefore show up as a cluster at the canvas
//! origin unless undetected groups are suppressed.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use signpose_landmark_model::{FrameRecord, GroupKind, GroupSet, Series};

use crate::skeleton::{HAND_CONNECTIONS, POSE_CONNECTIONS};

pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Marker appearance for one landmark group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStyle {
    pub color: Rgb<u8>,
    pub radius: i32,
}

/// Fixed per-group markers: pose green, left hand red, right hand blue, face cyan.
pub const fn group_style(kind: GroupKind) -> GroupStyle {
    match kind {
        GroupKind::Pose => GroupStyle {
            color: Rgb([0, 255, 0]),
            radius: 3,
        },
        GroupKind::LeftHand => GroupStyle {
            color: Rgb([255, 0, 0]),
            radius: 3,
        },
        GroupKind::RightHand => GroupStyle {
            color: Rgb([0, 0, 255]),
            radius: 3,
        },
        GroupKind::Face => GroupStyle {
            color: Rgb([0, 255, 255]),
            radius: 1,
        },
    }
}

/// Project a normalized coordinate pair onto a `width` x `height` canvas.
pub fn project(x: f32, y: f32, width: u32, height: u32) -> (i32, i32) {
    let px = (x as f64 * width as f64).round();
    let py = (y as f64 * height as f64).round();
    (
        px.clamp(i32::MIN as f64, i32::MAX as f64) as i32,
        py.clamp(i32::MIN as f64, i32::MAX as f64) as i32,
    )
}

/// Optional drawing behaviour beyond plain markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Draw pose and hand skeleton lines under the markers.
    pub draw_connections: bool,
    /// Skip groups that a frame's detection flags mark as not detected.
    /// Has no effect on series without detection flags.
    pub skip_undetected: bool,
}

/// Draws frame records of one series at a fixed canvas size.
#[derive(Debug, Clone)]
pub struct FrameSynthesizer {
    width: u32,
    height: u32,
    groups: GroupSet,
    detection_known: bool,
    options: SynthesisOptions,
}

impl FrameSynthesizer {
    /// Synthesizer that draws every group.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            groups: GroupSet::ALL,
            detection_known: false,
            options: SynthesisOptions::default(),
        }
    }

    /// Synthesizer for the groups present in `series`.
    pub fn for_series(series: &Series, width: u32, height: u32, options: SynthesisOptions) -> Self {
        Self {
            width,
            height,
            groups: series.groups(),
            detection_known: series.detection_known(),
            options,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Render one frame on a fresh black canvas.
    pub fn synthesize(&self, frame: &FrameRecord) -> RgbImage {
        let mut canvas = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        for kind in GroupKind::ALL {
            if !self.groups.contains(kind) {
                continue;
            }
            if self.options.skip_undetected
                && self.detection_known
                && !frame.detected.contains(kind)
            {
                continue;
            }
            self.draw_group(&mut canvas, frame, kind);
        }
        canvas
    }

    fn draw_group(&self, canvas: &mut RgbImage, frame: &FrameRecord, kind: GroupKind) {
        let style = group_style(kind);
        let drawable = |i: usize| kind != GroupKind::Pose || frame.pose[i][3] > 0.0;

        if self.options.draw_connections {
            let connections: &[(usize, usize)] = match kind {
                GroupKind::Pose => &POSE_CONNECTIONS,
                GroupKind::LeftHand | GroupKind::RightHand => &HAND_CONNECTIONS,
                GroupKind::Face => &[],
            };
            for &(a, b) in connections {
                if !drawable(a) || !drawable(b) {
                    continue;
                }
                let start = frame.point(kind, a);
                let end = frame.point(kind, b);
                let (x0, y0) = project(start.x, start.y, self.width, self.height);
                let (x1, y1) = project(end.x, end.y, self.width, self.height);
                draw_line_segment_mut(
                    canvas,
                    (x0 as f32, y0 as f32),
                    (x1 as f32, y1 as f32),
                    style.color,
                );
            }
        }

        for (i, point) in frame.points(kind).enumerate() {
            if !drawable(i) {
                continue;
            }
            let center = project(point.x, point.y, self.width, self.height);
            draw_filled_circle_mut(canvas, center, style.radius, style.color);
        }
    }
}

/// Render one frame with every group drawn and no extras.
pub fn synthesize(frame: &FrameRecord, width: u32, height: u32) -> RgbImage {
    FrameSynthesizer::new(width, height).synthesize(frame)
}
