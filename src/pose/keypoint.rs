/// BlazePose の 33 キーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl KeypointIndex {
    pub const COUNT: usize = 33;

    /// インデックス順の全キーポイント
    pub const ALL: [KeypointIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEyeInner => "left_eye_inner",
            Self::LeftEye => "left_eye",
            Self::LeftEyeOuter => "left_eye_outer",
            Self::RightEyeInner => "right_eye_inner",
            Self::RightEye => "right_eye",
            Self::RightEyeOuter => "right_eye_outer",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::MouthLeft => "mouth_left",
            Self::MouthRight => "mouth_right",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftPinky => "left_pinky",
            Self::RightPinky => "right_pinky",
            Self::LeftIndex => "left_index",
            Self::RightIndex => "right_index",
            Self::LeftThumb => "left_thumb",
            Self::RightThumb => "right_thumb",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::LeftHeel => "left_heel",
            Self::RightHeel => "right_heel",
            Self::LeftFootIndex => "left_foot_index",
            Self::RightFootIndex => "right_foot_index",
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// X座標 (ソースフレームのピクセル)
    pub x: f32,
    /// Y座標 (ソースフレームのピクセル)
    pub y: f32,
    /// 深度 (モデルが出力した場合のみ)
    pub z: Option<f32>,
    /// 可視性スコア (0.0〜1.0)
    pub score: f32,
    pub name: Option<&'static str>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self {
            x,
            y,
            z: None,
            score,
            name: None,
        }
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = Some(z);
        self
    }

    pub fn named(mut self, index: KeypointIndex) -> Self {
        self.name = Some(index.name());
        self
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.score >= threshold
    }

    /// XY平面上のユークリッド距離
    pub fn distance(&self, other: &Keypoint) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// 33キーポイントからなる姿勢
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
}

impl Pose {
    pub fn new(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        Self { keypoints }
    }

    /// インデックスごとにキーポイントを生成
    pub fn from_fn(mut f: impl FnMut(KeypointIndex) -> Keypoint) -> Self {
        Self {
            keypoints: std::array::from_fn(|i| f(KeypointIndex::ALL[i])),
        }
    }

    /// インデックスでキーポイントを取得
    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    pub fn get_mut(&mut self, index: KeypointIndex) -> &mut Keypoint {
        &mut self.keypoints[index as usize]
    }

    /// 2点の中点 (x, y)
    pub fn midpoint(&self, a: KeypointIndex, b: KeypointIndex) -> (f32, f32) {
        let a = self.get(a);
        let b = self.get(b);
        ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }

    /// 全キーポイントの平均信頼度
    pub fn average_confidence(&self) -> f32 {
        let sum: f32 = self.keypoints.iter().map(|k| k.score).sum();
        sum / KeypointIndex::COUNT as f32
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            keypoints: [Keypoint::default(); KeypointIndex::COUNT],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_index_count() {
        assert_eq!(KeypointIndex::COUNT, 33);
        assert_eq!(KeypointIndex::ALL.len(), KeypointIndex::COUNT);
    }

    #[test]
    fn test_all_matches_discriminants() {
        for (i, idx) in KeypointIndex::ALL.iter().enumerate() {
            assert_eq!(*idx as usize, i, "{:?} is out of order", idx);
        }
    }

    #[test]
    fn test_keypoint_index_from_index() {
        assert_eq!(KeypointIndex::from_index(0), Some(KeypointIndex::Nose));
        assert_eq!(KeypointIndex::from_index(23), Some(KeypointIndex::LeftHip));
        assert_eq!(
            KeypointIndex::from_index(32),
            Some(KeypointIndex::RightFootIndex)
        );
        assert_eq!(KeypointIndex::from_index(33), None);
    }

    #[test]
    fn test_keypoint_is_valid() {
        let kp = Keypoint::new(10.0, 20.0, 0.7);
        assert!(kp.is_valid(0.5));
        assert!(kp.is_valid(0.7));
        assert!(!kp.is_valid(0.8));
    }

    #[test]
    fn test_keypoint_distance() {
        let a = Keypoint::new(0.0, 0.0, 1.0);
        let b = Keypoint::new(3.0, 4.0, 1.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert!((b.distance(&a) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_pose_from_fn_names() {
        let pose = Pose::from_fn(|idx| Keypoint::new(idx as usize as f32, 0.0, 1.0).named(idx));
        assert_eq!(pose.get(KeypointIndex::LeftHip).x, 23.0);
        assert_eq!(pose.get(KeypointIndex::LeftHip).name, Some("left_hip"));
        assert_eq!(pose.get(KeypointIndex::Nose).name, Some("nose"));
    }

    #[test]
    fn test_pose_midpoint() {
        let mut pose = Pose::default();
        *pose.get_mut(KeypointIndex::LeftHip) = Keypoint::new(100.0, 300.0, 1.0);
        *pose.get_mut(KeypointIndex::RightHip) = Keypoint::new(200.0, 310.0, 1.0);
        let (x, y) = pose.midpoint(KeypointIndex::LeftHip, KeypointIndex::RightHip);
        assert_eq!(x, 150.0);
        assert_eq!(y, 305.0);
    }

    #[test]
    fn test_pose_average_confidence() {
        let pose = Pose::new([Keypoint::new(0.0, 0.0, 0.5); KeypointIndex::COUNT]);
        assert!((pose.average_confidence() - 0.5).abs() < 0.001);
    }
}
