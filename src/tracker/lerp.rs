use quanta::Instant;
use std::time::Duration;

use super::buffer::DetectionBuffer;
use crate::pose::Pose;

/// これ未満の信頼度の関節は補間しない
pub const MIN_LERP_CONFIDENCE: f32 = 0.3;

/// 最後の検出からの経過時間を検出間隔で割った補間進捗 (0.0..=1.0)
pub fn interpolation_t(last_update: Instant, now: Instant, interval: Duration) -> f32 {
    if interval.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(last_update);
    (elapsed.as_secs_f32() / interval.as_secs_f32()).min(1.0)
}

/// previous → current を t (0.0..=1.0) で関節ごとに線形補間。
/// どちらかの信頼度が低い関節は current をそのまま使う。
pub fn lerp_pose(previous: &Pose, current: &Pose, t: f32) -> Pose {
    let t = t.clamp(0.0, 1.0);
    let mut result = current.clone();
    for (kp, prev) in result.keypoints.iter_mut().zip(previous.keypoints.iter()) {
        if kp.score < MIN_LERP_CONFIDENCE || prev.score < MIN_LERP_CONFIDENCE {
            continue;
        }
        kp.x = prev.x + (kp.x - prev.x) * t;
        kp.y = prev.y + (kp.y - prev.y) * t;
    }
    result
}

/// 描画フレームごとに呼ばれる。検出より高いレートで滑らかに見せるための補間。
/// 検出がまだなければ None、previous がなければ current をそのまま返す。
pub fn interpolate(buffer: &DetectionBuffer, now: Instant, interval: Duration) -> Option<Pose> {
    let current = buffer.current()?;
    match (buffer.previous(), buffer.last_update()) {
        (Some(previous), Some(at)) => {
            Some(lerp_pose(previous, current, interpolation_t(at, now, interval)))
        }
        _ => Some(current.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointIndex};
    use quanta::Clock;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    fn pose_at(x: f32, y: f32, score: f32) -> Pose {
        Pose::new([Keypoint::new(x, y, score); KeypointIndex::COUNT])
    }

    #[test]
    fn test_interpolate_before_update() {
        let (clock, _mock) = Clock::mock();
        let buffer = DetectionBuffer::new();
        assert!(interpolate(&buffer, clock.now(), Duration::from_millis(66)).is_none());
    }

    #[test]
    fn test_interpolate_midpoint() {
        let previous = pose_at(0.0, 0.0, 1.0);
        let current = pose_at(10.0, 0.0, 1.0);
        let result = lerp_pose(&previous, &current, 0.5);
        for kp in result.keypoints.iter() {
            assert!(approx_eq_f32(kp.x, 5.0, 1e-6));
            assert!(approx_eq_f32(kp.y, 0.0, 1e-6));
        }
    }

    #[test]
    fn test_interpolate_at_zero_and_one() {
        let previous = pose_at(1.0, 2.0, 1.0);
        let current = pose_at(4.0, 5.0, 1.0);
        let at_zero = lerp_pose(&previous, &current, 0.0);
        let at_one = lerp_pose(&previous, &current, 1.0);
        assert!(approx_eq_f32(at_zero.keypoints[0].x, 1.0, 1e-6));
        assert!(approx_eq_f32(at_zero.keypoints[0].y, 2.0, 1e-6));
        assert!(approx_eq_f32(at_one.keypoints[0].x, 4.0, 1e-6));
        assert!(approx_eq_f32(at_one.keypoints[0].y, 5.0, 1e-6));
    }

    #[test]
    fn test_clamp_t() {
        let previous = pose_at(0.0, 0.0, 1.0);
        let current = pose_at(10.0, 10.0, 1.0);
        assert_eq!(
            lerp_pose(&previous, &current, -1.0),
            lerp_pose(&previous, &current, 0.0)
        );
        assert_eq!(
            lerp_pose(&previous, &current, 2.0),
            lerp_pose(&previous, &current, 1.0)
        );
    }

    #[test]
    fn test_low_confidence_uses_current() {
        let mut previous = pose_at(0.0, 0.0, 1.0);
        let mut current = pose_at(10.0, 0.0, 1.0);
        previous.get_mut(KeypointIndex::LeftKnee).score = 0.2;
        current.get_mut(KeypointIndex::RightKnee).score = 0.1;

        let result = lerp_pose(&previous, &current, 0.5);
        assert_eq!(result.get(KeypointIndex::LeftKnee).x, 10.0);
        assert_eq!(result.get(KeypointIndex::RightKnee).x, 10.0);
        assert!(approx_eq_f32(result.get(KeypointIndex::Nose).x, 5.0, 1e-6));
    }

    #[test]
    fn test_t_from_elapsed_time() {
        let (clock, mock) = Clock::mock();
        let start = clock.now();
        let interval = Duration::from_millis(66);

        mock.increment(Duration::from_millis(33));
        assert!(approx_eq_f32(interpolation_t(start, clock.now(), interval), 0.5, 1e-4));

        // 検出間隔を過ぎても外挿しない
        mock.increment(Duration::from_millis(500));
        assert_eq!(interpolation_t(start, clock.now(), interval), 1.0);
    }

    #[test]
    fn test_interpolate_from_buffer() {
        let (clock, mock) = Clock::mock();
        let interval = Duration::from_millis(66);
        let mut buffer = DetectionBuffer::new();

        buffer.push(pose_at(0.0, 0.0, 1.0), clock.now());
        // previous がなければ current そのまま
        let only = interpolate(&buffer, clock.now(), interval).unwrap();
        assert_eq!(only.keypoints[0].x, 0.0);

        buffer.push(pose_at(10.0, 0.0, 1.0), clock.now());
        mock.increment(Duration::from_millis(33));
        let mid = interpolate(&buffer, clock.now(), interval).unwrap();
        assert!(approx_eq_f32(mid.keypoints[0].x, 5.0, 1e-3));

        mock.increment(Duration::from_millis(100));
        let end = interpolate(&buffer, clock.now(), interval).unwrap();
        assert_eq!(end.keypoints[0].x, 10.0);
    }
}
