use proptest::prelude::*;
use signpose_landmark_model::{
    read_series, write_series, Detection, FrameRecord, GroupKind, LandmarkPoint, Series,
};

fn group(n: usize, values: &[f32], with_visibility: bool) -> Vec<LandmarkPoint> {
    (0..n)
        .map(|i| {
            let v = values[i % values.len()];
            if with_visibility {
                LandmarkPoint::with_visibility(v, 1.0 - v, v * 0.5, (v * 7.0).fract().abs())
            } else {
                LandmarkPoint::new(v, 1.0 - v, v * 0.5)
            }
        })
        .collect()
}

fn arb_values() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(
        prop_oneof![-1.0f32..2.0f32, Just(0.0f32), Just(f32::MIN_POSITIVE)],
        1..16,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn bundle_roundtrip_is_bit_exact(
        frames in proptest::collection::vec((arb_values(), any::<[bool; 4]>()), 1..6)
    ) {
        let records: Vec<FrameRecord> = frames
            .iter()
            .map(|(values, present)| {
                FrameRecord::from_detection(&Detection {
                    pose: present[0].then(|| group(33, values, true)),
                    left_hand: present[1].then(|| group(21, values, false)),
                    right_hand: present[2].then(|| group(21, values, false)),
                    face: present[3].then(|| group(468, values, false)),
                })
            })
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.npz");
        write_series(&Series::assemble(records.clone()), &path).unwrap();
        let loaded = read_series(&path).unwrap();

        prop_assert_eq!(loaded.len(), records.len());
        for (a, b) in loaded.frames().iter().zip(&records) {
            prop_assert_eq!(a.detected, b.detected);
            for kind in GroupKind::ALL {
                let mut left = Vec::new();
                let mut right = Vec::new();
                a.extend_values(kind, &mut left);
                b.extend_values(kind, &mut right);
                let bits = |v: &[f32]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
                prop_assert_eq!(bits(&left), bits(&right));
            }
        }
    }
}
