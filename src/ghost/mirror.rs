use crate::pose::{Keypoint, KeypointIndex, Pose};

/// Left/right swap table: output joint `i` takes input joint `MIRROR_MAP[i]`.
/// Applying it twice is the identity.
pub const MIRROR_MAP: [KeypointIndex; KeypointIndex::COUNT] = {
    use KeypointIndex::*;
    [
        Nose,
        RightEyeInner,
        RightEye,
        RightEyeOuter,
        LeftEyeInner,
        LeftEye,
        LeftEyeOuter,
        RightEar,
        LeftEar,
        MouthRight,
        MouthLeft,
        RightShoulder,
        LeftShoulder,
        RightElbow,
        LeftElbow,
        RightWrist,
        LeftWrist,
        RightPinky,
        LeftPinky,
        RightIndex,
        LeftIndex,
        RightThumb,
        LeftThumb,
        RightHip,
        LeftHip,
        RightKnee,
        LeftKnee,
        RightAnkle,
        LeftAnkle,
        RightHeel,
        LeftHeel,
        RightFootIndex,
        LeftFootIndex,
    ]
};

/// Reflects a pose horizontally within a frame of `frame_width` pixels and
/// swaps left/right joints so it can be compared against a mirrored webcam
/// view. Names follow the destination joint.
pub fn mirror(pose: &Pose, frame_width: f32) -> Pose {
    Pose::from_fn(|idx| {
        let src = pose.get(MIRROR_MAP[idx as usize]);
        Keypoint {
            x: frame_width - src.x,
            name: src.name.map(|_| idx.name()),
            ..*src
        }
    })
}
