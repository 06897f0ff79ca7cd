use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StreamError;
use crate::pose::Frame;

/// キャプチャスレッドと検出側の受け渡し口
///
/// 最新フレームだけを保持する。取り出してもフレームは残るので、
/// 新フレームが届くまで同じフレームが返る。
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Frame>>,
    frame_id: AtomicU64,
    error: Mutex<Option<StreamError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // 書き込み途中でパニックしても中身は常に完全なフレームか None
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: Frame) {
        *lock(&self.latest) = Some(frame);
        self.frame_id.fetch_add(1, Ordering::Release);
    }

    /// 最新フレームのコピー。初回フレーム到着前のみ None
    pub fn latest(&self) -> Option<Frame> {
        lock(&self.latest).clone()
    }

    /// 新フレームが届くたびに増える
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    pub fn set_error(&self, error: StreamError) {
        *lock(&self.error) = Some(error);
    }

    pub fn error(&self) -> Option<StreamError> {
        lock(&self.error).clone()
    }
}
