//! Skeleton connection tables for the 33-point pose and 21-point hand layouts.

/// Pose connections (start, end).
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    // Face
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    // Upper body
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    // Torso
    (11, 23),
    (12, 24),
    (23, 24),
    // Lower body
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

/// Hand connections (start, end), wrist is point 0.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    // Thumb
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    // Index
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    // Middle
    (5, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    // Ring
    (9, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    // Pinky
    (13, 17),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
];

#[cfg(test)]
mod tests {
    use super::*;
    use signpose_landmark_model::{HAND_POINTS, POSE_POINTS};

    #[test]
    fn test_connections_stay_in_range() {
        assert!(POSE_CONNECTIONS
            .iter()
            .all(|(a, b)| *a < POSE_POINTS && *b < POSE_POINTS));
        assert!(HAND_CONNECTIONS
            .iter()
            .all(|(a, b)| *a < HAND_POINTS && *b < HAND_POINTS));
    }
}
