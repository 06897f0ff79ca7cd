use crate::pose::Pose;

/// デフォルトのEMA係数
pub const DEFAULT_ALPHA: f32 = 0.65;

/// これ未満の信頼度の関節は平滑化しない (古い位置に引きずられるのを防ぐ)
pub const MIN_SMOOTH_CONFIDENCE: f32 = 0.3;

/// EMAベースのキーポイント平滑化
///
/// 前回の結果がなければ生の姿勢をそのまま返す。
/// 関節ごとに x, y のみ `alpha * raw + (1 - alpha) * previous`、z と score は生の値。
pub fn smooth(previous: Option<&Pose>, raw: &Pose, alpha: f32) -> Pose {
    let Some(previous) = previous else {
        return raw.clone();
    };

    let mut result = raw.clone();
    for (kp, prev) in result.keypoints.iter_mut().zip(previous.keypoints.iter()) {
        if kp.score < MIN_SMOOTH_CONFIDENCE || prev.score < MIN_SMOOTH_CONFIDENCE {
            continue;
        }
        kp.x = alpha * kp.x + (1.0 - alpha) * prev.x;
        kp.y = alpha * kp.y + (1.0 - alpha) * prev.y;
    }
    result
}
