use crate::pose::{Keypoint, KeypointIndex, Pose};

/// 胴体長がこれ未満の参照姿勢は正規化しない (ピクセル)
pub const MIN_TORSO_LENGTH: f32 = 1.0;

/// 左右の腰の中点
pub fn hip_center(pose: &Pose) -> (f32, f32) {
    pose.midpoint(KeypointIndex::LeftHip, KeypointIndex::RightHip)
}

/// 左右の肩の中点
pub fn shoulder_center(pose: &Pose) -> (f32, f32) {
    pose.midpoint(KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder)
}

/// 腰中心から肩中心までの距離
pub fn torso_length(pose: &Pose) -> f32 {
    let (hx, hy) = hip_center(pose);
    let (sx, sy) = shoulder_center(pose);
    (sx - hx).hypot(sy - hy)
}

/// 参照姿勢をユーザーの体格に合わせる
///
/// 胴体長の比でスケールし、腰中心をユーザーの腰中心に揃える。
/// x, y 以外 (z, score, name) はそのまま。
/// 参照側の胴体長が [`MIN_TORSO_LENGTH`] 未満なら参照姿勢をそのまま返す。
pub fn normalize(reference: &Pose, user: &Pose) -> Pose {
    let reference_torso = torso_length(reference);
    if reference_torso < MIN_TORSO_LENGTH {
        return reference.clone();
    }

    let scale = torso_length(user) / reference_torso;
    let (rx, ry) = hip_center(reference);
    let (ux, uy) = hip_center(user);

    let mut keypoints = reference.keypoints;
    for kp in keypoints.iter_mut() {
        *kp = Keypoint {
            x: (kp.x - rx) * scale + ux,
            y: (kp.y - ry) * scale + uy,
            ..*kp
        };
    }
    Pose::new(keypoints)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    /// 簡易的な立ち姿勢。肩と腰は左右対称、胴体長 = 100 * s
    pub(crate) fn standing_pose(cx: f32, hip_y: f32, s: f32) -> Pose {
        use KeypointIndex::*;
        Pose::from_fn(|idx| {
            let (dx, dy) = match idx {
                Nose => (0.0, -140.0),
                LeftShoulder => (30.0, -100.0),
                RightShoulder => (-30.0, -100.0),
                LeftElbow => (45.0, -60.0),
                RightElbow => (-45.0, -60.0),
                LeftWrist => (60.0, -20.0),
                RightWrist => (-60.0, -20.0),
                LeftHip => (20.0, 0.0),
                RightHip => (-20.0, 0.0),
                LeftKnee => (22.0, 60.0),
                RightKnee => (-22.0, 60.0),
                LeftAnkle => (24.0, 120.0),
                RightAnkle => (-24.0, 120.0),
                _ => (0.0, -120.0),
            };
            Keypoint::new(cx + dx * s, hip_y + dy * s, 0.9).named(idx)
        })
    }

    #[test]
    fn test_torso_length() {
        let pose = standing_pose(320.0, 300.0, 1.0);
        assert!(approx_eq_f32(torso_length(&pose), 100.0, 1e-4));
        assert_eq!(hip_center(&pose), (320.0, 300.0));
    }

    #[test]
    fn test_normalize_onto_itself_is_identity() {
        let pose = standing_pose(320.0, 300.0, 1.3);
        let result = normalize(&pose, &pose);
        for (a, b) in result.keypoints.iter().zip(pose.keypoints.iter()) {
            assert!(approx_eq_f32(a.x, b.x, 1e-3));
            assert!(approx_eq_f32(a.y, b.y, 1e-3));
            assert_eq!(a.score, b.score);
            assert_eq!(a.name, b.name);
        }
    }

    #[test]
    fn test_degenerate_reference_is_returned_unchanged() {
        // 肩と腰が同じ位置 → 胴体長 0
        let reference = Pose::new([Keypoint::new(50.0, 50.0, 0.9); KeypointIndex::COUNT]);
        let user = standing_pose(320.0, 300.0, 1.0);
        assert_eq!(normalize(&reference, &user), reference);
    }

    #[test]
    fn test_scales_and_translates() {
        let reference = standing_pose(100.0, 200.0, 2.0);
        let user = standing_pose(400.0, 350.0, 1.0);
        let result = normalize(&reference, &user);

        assert!(approx_eq_f32(torso_length(&result), torso_length(&user), 1e-3));
        let (hx, hy) = hip_center(&result);
        assert!(approx_eq_f32(hx, 400.0, 1e-3));
        assert!(approx_eq_f32(hy, 350.0, 1e-3));
        // 相対位置も縮小される
        let wrist = result.get(KeypointIndex::LeftWrist);
        assert!(approx_eq_f32(wrist.x, 460.0, 1e-3));
        assert!(approx_eq_f32(wrist.y, 330.0, 1e-3));
    }

    #[test]
    fn test_non_positional_fields_kept() {
        let mut reference = standing_pose(100.0, 200.0, 1.0);
        *reference.get_mut(KeypointIndex::Nose) =
            Keypoint::new(100.0, 60.0, 0.42).with_z(-0.3).named(KeypointIndex::Nose);
        let user = standing_pose(300.0, 300.0, 1.5);
        let nose = *normalize(&reference, &user).get(KeypointIndex::Nose);
        assert_eq!(nose.score, 0.42);
        assert_eq!(nose.z, Some(-0.3));
        assert_eq!(nose.name, Some("nose"));
    }
}
