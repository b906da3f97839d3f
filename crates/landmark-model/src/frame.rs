//! Fixed-shape per-frame landmark records.
//!
//! Every record holds all four groups at their fixed cardinality. A group
//! the detector did not report is stored as all-zero points, so "no
//! detection" and "a real point at the origin" look the same in the
//! numeric arrays. [`FrameRecord::detected`] keeps the distinction for
//! callers that need it.

use crate::landmark::{
    Detection, GroupKind, GroupSet, LandmarkPoint, FACE_POINTS, HAND_POINTS, POSE_POINTS,
};

/// One sampled time step.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// `x, y, z, visibility` per pose point.
    pub pose: [[f32; 4]; POSE_POINTS],
    pub left_hand: [[f32; 3]; HAND_POINTS],
    pub right_hand: [[f32; 3]; HAND_POINTS],
    pub face: [[f32; 3]; FACE_POINTS],
    /// Groups whose values came from a real detection in this frame.
    pub detected: GroupSet,
}

impl Default for FrameRecord {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl FrameRecord {
    /// A record with every group zero-filled and nothing detected.
    pub fn zeroed() -> Self {
        Self {
            pose: [[0.0; 4]; POSE_POINTS],
            left_hand: [[0.0; 3]; HAND_POINTS],
            right_hand: [[0.0; 3]; HAND_POINTS],
            face: [[0.0; 3]; FACE_POINTS],
            detected: GroupSet::EMPTY,
        }
    }

    /// Build a fixed-shape record from one detector result.
    ///
    /// A group that is absent or has fewer points than its cardinality is
    /// zero-filled. Surplus points (e.g. refined iris points after the 468
    /// face mesh points) are dropped.
    pub fn from_detection(detection: &Detection) -> Self {
        let mut record = Self::zeroed();
        for kind in GroupKind::ALL {
            let Some(points) = detection.group(kind) else {
                continue;
            };
            if points.len() < kind.cardinality() {
                tracing::trace!(
                    group = %kind,
                    got = points.len(),
                    expected = kind.cardinality(),
                    "Short landmark group, zero-filling"
                );
                continue;
            }
            for (i, point) in points.iter().take(kind.cardinality()).enumerate() {
                record.set_point(kind, i, point);
            }
            record.detected.insert(kind);
        }
        record
    }

    /// Point `index` of a group. Panics if `index` is out of range.
    pub fn point(&self, kind: GroupKind, index: usize) -> LandmarkPoint {
        match kind {
            GroupKind::Pose => {
                let [x, y, z, v] = self.pose[index];
                LandmarkPoint::with_visibility(x, y, z, v)
            }
            GroupKind::LeftHand => {
                let [x, y, z] = self.left_hand[index];
                LandmarkPoint::new(x, y, z)
            }
            GroupKind::RightHand => {
                let [x, y, z] = self.right_hand[index];
                LandmarkPoint::new(x, y, z)
            }
            GroupKind::Face => {
                let [x, y, z] = self.face[index];
                LandmarkPoint::new(x, y, z)
            }
        }
    }

    /// All points of a group in index order.
    pub fn points(&self, kind: GroupKind) -> impl Iterator<Item = LandmarkPoint> + '_ {
        (0..kind.cardinality()).map(move |i| self.point(kind, i))
    }

    fn set_point(&mut self, kind: GroupKind, index: usize, point: &LandmarkPoint) {
        let LandmarkPoint { x, y, z, .. } = *point;
        match kind {
            // Pose visibility is always reported by the holistic detector;
            // when a detector omits it the point is treated as visible.
            GroupKind::Pose => self.pose[index] = [x, y, z, point.visibility.unwrap_or(1.0)],
            GroupKind::LeftHand => self.left_hand[index] = [x, y, z],
            GroupKind::RightHand => self.right_hand[index] = [x, y, z],
            GroupKind::Face => self.face[index] = [x, y, z],
        }
    }

    /// Append the group's values in row-major `(points, channels)` order.
    pub fn extend_values(&self, kind: GroupKind, out: &mut Vec<f32>) {
        match kind {
            GroupKind::Pose => out.extend(self.pose.iter().flatten()),
            GroupKind::LeftHand => out.extend(self.left_hand.iter().flatten()),
            GroupKind::RightHand => out.extend(self.right_hand.iter().flatten()),
            GroupKind::Face => out.extend(self.face.iter().flatten()),
        }
    }

    /// Overwrite a group from row-major values.
    ///
    /// `values` must hold exactly [`GroupKind::values_per_frame`] floats.
    pub fn load_values(&mut self, kind: GroupKind, values: &[f32]) {
        assert_eq!(
            values.len(),
            kind.values_per_frame(),
            "wrong value count for group {kind}"
        );
        match kind {
            GroupKind::Pose => copy_rows(&mut self.pose, values),
            GroupKind::LeftHand => copy_rows(&mut self.left_hand, values),
            GroupKind::RightHand => copy_rows(&mut self.right_hand, values),
            GroupKind::Face => copy_rows(&mut self.face, values),
        }
    }

    /// Whether every value of the group is zero.
    pub fn is_zero(&self, kind: GroupKind) -> bool {
        let mut values = Vec::with_capacity(kind.values_per_frame());
        self.extend_values(kind, &mut values);
        values.iter().all(|v| *v == 0.0)
    }
}

fn copy_rows<const C: usize>(rows: &mut [[f32; C]], values: &[f32]) {
    for (row, chunk) in rows.iter_mut().zip(values.chunks_exact(C)) {
        row.copy_from_slice(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn points(n: usize, with_visibility: bool) -> Vec<LandmarkPoint> {
        (0..n)
            .map(|i| {
                let t = i as f32 / n.max(1) as f32;
                if with_visibility {
                    LandmarkPoint::with_visibility(t, 1.0 - t, -t, 0.75)
                } else {
                    LandmarkPoint::new(t, 1.0 - t, -t)
                }
            })
            .collect()
    }

    #[test]
    fn test_empty_detection_is_all_zero() {
        let record = FrameRecord::from_detection(&Detection::default());
        for kind in GroupKind::ALL {
            assert!(record.is_zero(kind), "{kind} should be zero-filled");
        }
        assert!(record.detected.is_empty());
    }

    #[test]
    fn test_full_detection_copies_points() {
        let detection = Detection {
            pose: Some(points(33, true)),
            left_hand: Some(points(21, false)),
            right_hand: None,
            face: Some(points(468, false)),
        };
        let record = FrameRecord::from_detection(&detection);

        assert_eq!(record.pose[1], [1.0 / 33.0, 1.0 - 1.0 / 33.0, -1.0 / 33.0, 0.75]);
        assert_eq!(record.left_hand[20][0], 20.0 / 21.0);
        assert!(record.is_zero(GroupKind::RightHand));
        assert!(record.detected.contains(GroupKind::Face));
        assert!(!record.detected.contains(GroupKind::RightHand));
    }

    #[test]
    fn test_surplus_face_points_are_truncated() {
        let detection = Detection {
            face: Some(points(478, false)),
            ..Default::default()
        };
        let record = FrameRecord::from_detection(&detection);
        assert!(record.detected.contains(GroupKind::Face));
        assert_eq!(record.face[467][0], 467.0 / 478.0);
    }

    #[test]
    fn test_short_group_is_zero_filled() {
        let detection = Detection {
            left_hand: Some(points(20, false)),
            ..Default::default()
        };
        let record = FrameRecord::from_detection(&detection);
        assert!(record.is_zero(GroupKind::LeftHand));
        assert!(!record.detected.contains(GroupKind::LeftHand));
    }

    #[test]
    fn test_pose_without_visibility_defaults_to_visible() {
        let detection = Detection {
            pose: Some(points(33, false)),
            ..Default::default()
        };
        let record = FrameRecord::from_detection(&detection);
        assert!(record.pose.iter().all(|p| p[3] == 1.0));
    }

    #[test]
    fn test_values_roundtrip_through_flat_layout() {
        let detection = Detection {
            pose: Some(points(33, true)),
            face: Some(points(468, false)),
            ..Default::default()
        };
        let record = FrameRecord::from_detection(&detection);

        let mut copy = FrameRecord::zeroed();
        copy.detected = record.detected;
        for kind in GroupKind::ALL {
            let mut values = Vec::new();
            record.extend_values(kind, &mut values);
            assert_eq!(values.len(), kind.values_per_frame());
            copy.load_values(kind, &values);
        }
        assert_eq!(copy, record);
    }

    proptest! {
        #[test]
        fn prop_cardinality_is_fixed(
            pose_n in proptest::option::of(0usize..80),
            hand_n in proptest::option::of(0usize..40),
            face_n in proptest::option::of(0usize..600),
        ) {
            let detection = Detection {
                pose: pose_n.map(|n| points(n, true)),
                left_hand: hand_n.map(|n| points(n, false)),
                right_hand: hand_n.map(|n| points(n, false)),
                face: face_n.map(|n| points(n, false)),
            };
            let record = FrameRecord::from_detection(&detection);

            for kind in GroupKind::ALL {
                prop_assert_eq!(record.points(kind).count(), kind.cardinality());
                let mut values = Vec::new();
                record.extend_values(kind, &mut values);
                prop_assert_eq!(values.len(), kind.values_per_frame());
            }
            prop_assert_eq!(
                record.detected.contains(GroupKind::Face),
                face_n.is_some_and(|n| n >= 468)
            );
        }
    }
}
