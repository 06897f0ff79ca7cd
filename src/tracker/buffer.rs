use quanta::Instant;

use crate::pose::Pose;

/// ストリームごとの検出結果 (直前と最新の2つ)
///
/// 書き込むのはそのストリームの検出ループだけ。描画側は読むだけ。
#[derive(Debug, Clone, Default)]
pub struct DetectionBuffer {
    previous: Option<Pose>,
    current: Option<Pose>,
    last_update: Option<Instant>,
}

impl DetectionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しい検出結果を書き込む。最新の結果は previous に繰り下がる
    pub fn push(&mut self, pose: Pose, at: Instant) {
        self.previous = self.current.take();
        self.current = Some(pose);
        self.last_update = Some(at);
    }

    pub fn previous(&self) -> Option<&Pose> {
        self.previous.as_ref()
    }

    pub fn current(&self) -> Option<&Pose> {
        self.current.as_ref()
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
