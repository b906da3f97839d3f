//! Time-ordered landmark series.

use crate::frame::FrameRecord;
use crate::landmark::{GroupKind, GroupSet};

/// An ordered sequence of frame records, one per sampled time step.
///
/// `groups` records which logical arrays exist for the whole series. A
/// group missing from `groups` means "no data for this group at all",
/// which is different from per-frame zero-fill. Frames still carry
/// zero-valued storage for missing groups so every record keeps its fixed
/// shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    frames: Vec<FrameRecord>,
    groups: GroupSet,
    /// Whether `FrameRecord::detected` is known (false for legacy bundles).
    detection_known: bool,
}

impl Series {
    /// Stack records into a series with every group present.
    ///
    /// An empty input yields a zero-length series that still declares all
    /// four groups.
    pub fn assemble(records: impl IntoIterator<Item = FrameRecord>) -> Self {
        Self {
            frames: records.into_iter().collect(),
            groups: GroupSet::ALL,
            detection_known: true,
        }
    }

    /// Build a series from loaded parts.
    pub fn from_parts(frames: Vec<FrameRecord>, groups: GroupSet, detection_known: bool) -> Self {
        Self {
            frames,
            groups,
            detection_known,
        }
    }

    /// Number of time steps (T).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&FrameRecord> {
        self.frames.get(index)
    }

    /// Groups that exist at the series level.
    pub fn groups(&self) -> GroupSet {
        self.groups
    }

    pub fn has_group(&self, kind: GroupKind) -> bool {
        self.groups.contains(kind)
    }

    /// Whether per-frame detection flags are meaningful.
    pub fn detection_known(&self) -> bool {
        self.detection_known
    }

    /// Fraction of frames in which `kind` was detected.
    ///
    /// `None` when the group is absent, detection is unknown, or the series
    /// is empty.
    pub fn detection_rate(&self, kind: GroupKind) -> Option<f64> {
        if !self.detection_known || !self.has_group(kind) || self.frames.is_empty() {
            return None;
        }
        let hits = self
            .frames
            .iter()
            .filter(|f| f.detected.contains(kind))
            .count();
        Some(hits as f64 / self.frames.len() as f64)
    }

    /// Row-major `(T, points, channels)` values of one group.
    pub fn group_values(&self, kind: GroupKind) -> Vec<f32> {
        let mut values = Vec::with_capacity(self.frames.len() * kind.values_per_frame());
        for frame in &self.frames {
            frame.extend_values(kind, &mut values);
        }
        values
    }

    /// Row-major `(T, 4)` presence mask, one byte per group.
    pub fn presence_mask(&self) -> Vec<u8> {
        self.frames
            .iter()
            .flat_map(|frame| GroupKind::ALL.map(|kind| u8::from(frame.detected.contains(kind))))
            .collect()
    }

    pub fn into_frames(self) -> Vec<FrameRecord> {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Detection, LandmarkPoint};

    fn hand_only_frame(x: f32) -> FrameRecord {
        FrameRecord::from_detection(&Detection {
            right_hand: Some(vec![LandmarkPoint::new(x, 0.5, 0.0); 21]),
            ..Default::default()
        })
    }

    #[test]
    fn test_assemble_empty_keeps_all_groups() {
        let series = Series::assemble(Vec::new());
        assert!(series.is_empty());
        assert_eq!(series.groups(), GroupSet::ALL);
        assert!(series.group_values(GroupKind::Face).is_empty());
    }

    #[test]
    fn test_group_values_stack_frames_in_order() {
        let series = Series::assemble(vec![hand_only_frame(0.1), hand_only_frame(0.2)]);
        let values = series.group_values(GroupKind::RightHand);
        assert_eq!(values.len(), 2 * 21 * 3);
        assert_eq!(values[0], 0.1);
        assert_eq!(values[21 * 3], 0.2);
    }

    #[test]
    fn test_presence_mask_layout() {
        let series = Series::assemble(vec![hand_only_frame(0.1), FrameRecord::zeroed()]);
        assert_eq!(series.presence_mask(), vec![0, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_detection_rate() {
        let series = Series::assemble(vec![
            hand_only_frame(0.1),
            FrameRecord::zeroed(),
            hand_only_frame(0.3),
            FrameRecord::zeroed(),
        ]);
        assert_eq!(series.detection_rate(GroupKind::RightHand), Some(0.5));
        assert_eq!(series.detection_rate(GroupKind::Face), Some(0.0));

        let legacy = Series::from_parts(series.clone().into_frames(), GroupSet::ALL, false);
        assert_eq!(legacy.detection_rate(GroupKind::RightHand), None);
    }
}
