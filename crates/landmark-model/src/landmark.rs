//! Landmark points, landmark groups, and raw detector output.
//!
//! All coordinates are normalized to image space: `(0.0, 0.0)` is the
//! top-left corner and `(1.0, 1.0)` the bottom-right. `z` is depth relative
//! to the detector's reference point and has no fixed range.

use serde::{Deserialize, Serialize};

/// A single detected keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Confidence that the point is visible, in `[0.0, 1.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: Some(visibility),
        }
    }
}

/// The four fixed-cardinality landmark groups of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Pose,
    LeftHand,
    RightHand,
    Face,
}

impl GroupKind {
    /// All groups in bundle column order.
    pub const ALL: [GroupKind; 4] = [
        GroupKind::Pose,
        GroupKind::LeftHand,
        GroupKind::RightHand,
        GroupKind::Face,
    ];

    /// Number of points in the group.
    pub const fn cardinality(self) -> usize {
        match self {
            GroupKind::Pose => POSE_POINTS,
            GroupKind::LeftHand | GroupKind::RightHand => HAND_POINTS,
            GroupKind::Face => FACE_POINTS,
        }
    }

    /// Floats stored per point (`x, y, z` plus `visibility` for pose).
    pub const fn channels(self) -> usize {
        match self {
            GroupKind::Pose => 4,
            _ => 3,
        }
    }

    /// Floats stored per frame for this group.
    pub const fn values_per_frame(self) -> usize {
        self.cardinality() * self.channels()
    }

    /// Logical array name in a persisted bundle.
    pub const fn array_name(self) -> &'static str {
        match self {
            GroupKind::Pose => "pose",
            GroupKind::LeftHand => "lhand",
            GroupKind::RightHand => "rhand",
            GroupKind::Face => "face",
        }
    }

    /// Column of this group in the presence mask.
    pub const fn index(self) -> usize {
        match self {
            GroupKind::Pose => 0,
            GroupKind::LeftHand => 1,
            GroupKind::RightHand => 2,
            GroupKind::Face => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.array_name())
    }
}

pub const POSE_POINTS: usize = 33;
pub const HAND_POINTS: usize = 21;
pub const FACE_POINTS: usize = 468;

/// A small set of [`GroupKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GroupSet(u8);

impl GroupSet {
    pub const EMPTY: GroupSet = GroupSet(0);
    pub const ALL: GroupSet = GroupSet(0b1111);

    pub fn contains(self, kind: GroupKind) -> bool {
        self.0 & (1 << kind.index()) != 0
    }

    pub fn insert(&mut self, kind: GroupKind) {
        self.0 |= 1 << kind.index();
    }

    pub fn remove(&mut self, kind: GroupKind) {
        self.0 &= !(1 << kind.index());
    }

    pub fn with(mut self, kind: GroupKind) -> Self {
        self.insert(kind);
        self
    }

    pub fn without(mut self, kind: GroupKind) -> Self {
        self.remove(kind);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = GroupKind> {
        GroupKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<GroupKind> for GroupSet {
    fn from_iter<I: IntoIterator<Item = GroupKind>>(iter: I) -> Self {
        let mut set = GroupSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// Raw output of one detector call on one image.
///
/// Each group is either absent (no detection) or the sequence of points the
/// detector produced, whatever its length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub pose: Option<Vec<LandmarkPoint>>,
    #[serde(default)]
    pub left_hand: Option<Vec<LandmarkPoint>>,
    #[serde(default)]
    pub right_hand: Option<Vec<LandmarkPoint>>,
    #[serde(default)]
    pub face: Option<Vec<LandmarkPoint>>,
}

impl Detection {
    pub fn group(&self, kind: GroupKind) -> Option<&[LandmarkPoint]> {
        match kind {
            GroupKind::Pose => self.pose.as_deref(),
            GroupKind::LeftHand => self.left_hand.as_deref(),
            GroupKind::RightHand => self.right_hand.as_deref(),
            GroupKind::Face => self.face.as_deref(),
        }
    }

    pub fn set_group(&mut self, kind: GroupKind, points: Option<Vec<LandmarkPoint>>) {
        match kind {
            GroupKind::Pose => self.pose = points,
            GroupKind::LeftHand => self.left_hand = points,
            GroupKind::RightHand => self.right_hand = points,
            GroupKind::Face => self.face = points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_schema() {
        assert_eq!(GroupKind::Pose.values_per_frame(), 33 * 4);
        assert_eq!(GroupKind::LeftHand.values_per_frame(), 21 * 3);
        assert_eq!(GroupKind::Face.values_per_frame(), 468 * 3);
        assert_eq!(GroupKind::RightHand.array_name(), "rhand");
    }

    #[test]
    fn test_group_index_roundtrip() {
        for kind in GroupKind::ALL {
            assert_eq!(GroupKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(GroupKind::from_index(4), None);
    }

    #[test]
    fn test_group_set_operations() {
        let set = GroupSet::EMPTY
            .with(GroupKind::Pose)
            .with(GroupKind::Face);
        assert!(set.contains(GroupKind::Pose));
        assert!(!set.contains(GroupKind::LeftHand));
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![GroupKind::Pose, GroupKind::Face]
        );
        assert_eq!(GroupSet::ALL.without(GroupKind::Face).len(), 3);
    }

    #[test]
    fn test_detection_deserializes_missing_groups_as_absent() {
        let detection: Detection =
            serde_json::from_str(r#"{"pose":[{"x":0.5,"y":0.4,"z":-0.1,"visibility":0.9}]}"#)
                .unwrap();
        assert_eq!(detection.pose.as_ref().map(Vec::len), Some(1));
        assert!(detection.face.is_none());
        assert!(detection.group(GroupKind::LeftHand).is_none());
    }
}
