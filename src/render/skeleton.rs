use crate::ghost::settings::parse_hex;
use crate::pose::{Keypoint, KeypointIndex, Pose};

/// 描画する骨格の接続 (顔は省略)
pub const BODY_CONNECTIONS: [(KeypointIndex, KeypointIndex); 12] = [
    // 胴体
    (KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder),
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftHip),
    (KeypointIndex::RightShoulder, KeypointIndex::RightHip),
    (KeypointIndex::LeftHip, KeypointIndex::RightHip),
    // 左腕
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow),
    (KeypointIndex::LeftElbow, KeypointIndex::LeftWrist),
    // 右腕
    (KeypointIndex::RightShoulder, KeypointIndex::RightElbow),
    (KeypointIndex::RightElbow, KeypointIndex::RightWrist),
    // 左脚
    (KeypointIndex::LeftHip, KeypointIndex::LeftKnee),
    (KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle),
    // 右脚
    (KeypointIndex::RightHip, KeypointIndex::RightKnee),
    (KeypointIndex::RightKnee, KeypointIndex::RightAnkle),
];

/// 関節マーカーを描くキーポイント
pub const BODY_KEYPOINTS: [KeypointIndex; 12] = [
    KeypointIndex::LeftShoulder,
    KeypointIndex::RightShoulder,
    KeypointIndex::LeftElbow,
    KeypointIndex::RightElbow,
    KeypointIndex::LeftWrist,
    KeypointIndex::RightWrist,
    KeypointIndex::LeftHip,
    KeypointIndex::RightHip,
    KeypointIndex::LeftKnee,
    KeypointIndex::RightKnee,
    KeypointIndex::LeftAnkle,
    KeypointIndex::RightAnkle,
];

/// 胴体の線の色 (0x00RRGGBB)
pub const TORSO_COLOR: u32 = 0xFFFFFF;
/// 左半身 (シアン)
pub const LEFT_COLOR: u32 = 0x06B6D4;
/// 右半身 (マゼンタ)
pub const RIGHT_COLOR: u32 = 0xEC4899;
/// ユーザー骨格の基本色
pub const USER_COLOR: u32 = 0x3B82F6;
/// 関節マーカーの中心色
pub const JOINT_FILL_COLOR: u32 = 0xFFFFFF;

/// これ未満の信頼度の関節は描かない
pub const MIN_DRAW_CONFIDENCE: f32 = 0.3;

/// 骨格の描画スタイル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonStyle {
    /// 基本色。`color_coded` でなければ全ての線がこの色
    pub color: u32,
    pub line_width: i32,
    pub point_radius: i32,
    pub min_confidence: f32,
    /// 胴体・左・右で線の色を分ける
    pub color_coded: bool,
}

impl SkeletonStyle {
    /// ユーザー骨格
    pub fn user() -> Self {
        Self {
            color: USER_COLOR,
            line_width: 3,
            point_radius: 5,
            min_confidence: MIN_DRAW_CONFIDENCE,
            color_coded: true,
        }
    }

    /// ゴースト骨格 (単色、やや太い)
    pub fn ghost(color: u32) -> Self {
        Self {
            color,
            line_width: 4,
            point_radius: 6,
            min_confidence: MIN_DRAW_CONFIDENCE,
            color_coded: false,
        }
    }

    pub fn segment_color(&self, a: KeypointIndex, b: KeypointIndex) -> u32 {
        if self.color_coded {
            segment_color(a, b).unwrap_or(self.color)
        } else {
            self.color
        }
    }
}

/// 接続ごとの色。BODY_CONNECTIONS 以外は None
pub fn segment_color(a: KeypointIndex, b: KeypointIndex) -> Option<u32> {
    use KeypointIndex::*;
    let (a, b) = if (a as usize) < (b as usize) { (a, b) } else { (b, a) };
    match (a, b) {
        (LeftShoulder, RightShoulder)
        | (LeftShoulder, LeftHip)
        | (RightShoulder, RightHip)
        | (LeftHip, RightHip) => Some(TORSO_COLOR),
        (LeftShoulder, LeftElbow)
        | (LeftElbow, LeftWrist)
        | (LeftHip, LeftKnee)
        | (LeftKnee, LeftAnkle) => Some(LEFT_COLOR),
        (RightShoulder, RightElbow)
        | (RightElbow, RightWrist)
        | (RightHip, RightKnee)
        | (RightKnee, RightAnkle) => Some(RIGHT_COLOR),
        _ => None,
    }
}

/// 描画対象の線分 (両端の信頼度が足りるもの) と色
pub fn visible_segments(pose: &Pose, style: &SkeletonStyle) -> Vec<(Keypoint, Keypoint, u32)> {
    BODY_CONNECTIONS
        .iter()
        .filter_map(|&(a, b)| {
            let (start, end) = (*pose.get(a), *pose.get(b));
            (start.is_valid(style.min_confidence) && end.is_valid(style.min_confidence))
                .then(|| (start, end, style.segment_color(a, b)))
        })
        .collect()
}

/// 描画対象の関節
pub fn visible_joints(pose: &Pose, style: &SkeletonStyle) -> Vec<Keypoint> {
    BODY_KEYPOINTS
        .iter()
        .map(|&idx| *pose.get(idx))
        .filter(|kp| kp.is_valid(style.min_confidence))
        .collect()
}

/// `#RRGGBB` → 0x00RRGGBB
pub fn parse_hex_color(color: &str) -> Option<u32> {
    parse_hex(color).map(|(r, g, b)| rgb(r, g, b))
}

pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}
