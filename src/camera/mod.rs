//! Frame sources for the two streams.
//!
//! The detection loops only see [`FrameSource`]; the desktop build backs it
//! with threaded OpenCV capture for the camera and for reference playback.

#[cfg(feature = "desktop")]
pub mod capture;
pub mod playback;
#[cfg(feature = "desktop")]
pub mod reference;
pub mod slot;

use anyhow::Result;
use std::time::Duration;

use crate::error::StreamError;
use crate::pose::Frame;

#[cfg(feature = "desktop")]
pub use capture::ThreadedCamera;
#[cfg(feature = "desktop")]
pub use reference::ReferencePlayer;
pub use playback::{PlaybackControl, SEEK_STEP};
pub use slot::FrameSlot;

/// 参照動画の再生速度の選択肢
pub const PLAYBACK_SPEEDS: [f32; 4] = [0.5, 0.75, 1.0, 1.25];

/// 最新フレームを提供するもの
pub trait FrameSource {
    /// 現在のフレーム。まだ届いていなければ None
    fn frame(&mut self) -> Option<Frame>;

    /// 再生位置。ライブ映像は None
    fn playback_position(&self) -> Option<Duration> {
        None
    }

    /// 発生済みのストリームエラー
    fn error(&self) -> Option<StreamError> {
        None
    }
}

/// 開けなかったストリームの代わり。フレームは出さず、エラーだけを報告する
#[derive(Debug, Clone)]
pub struct FailedSource {
    error: StreamError,
}

impl FailedSource {
    pub fn new(error: StreamError) -> Self {
        Self { error }
    }
}

impl FrameSource for FailedSource {
    fn frame(&mut self) -> Option<Frame> {
        None
    }

    fn error(&self) -> Option<StreamError> {
        Some(self.error.clone())
    }
}

/// 参照動画IDを再生可能なURLに解決する
pub trait MediaStore {
    fn resolve(&self, video_id: &str) -> Result<String>;
}

/// 設定済みのURLをそのまま返す
#[derive(Debug, Clone)]
pub struct DirectUrl {
    url: String,
}

impl DirectUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl MediaStore for DirectUrl {
    fn resolve(&self, video_id: &str) -> Result<String> {
        if self.url.is_empty() {
            anyhow::bail!("no reference url configured for {video_id}");
        }
        Ok(self.url.clone())
    }
}

/// 最も近い再生速度の選択肢
pub fn nearest_playback_speed(rate: f32) -> f32 {
    PLAYBACK_SPEEDS
        .into_iter()
        .min_by(|a, b| (a - rate).abs().total_cmp(&(b - rate).abs()))
        .unwrap_or(1.0)
}

/// 選択肢の中で steps 段階だけ速度を変える
pub fn step_playback_speed(current: f32, steps: i32) -> f32 {
    let current = nearest_playback_speed(current);
    let index = PLAYBACK_SPEEDS
        .iter()
        .position(|&speed| speed == current)
        .unwrap_or(2) as i32;
    let last = PLAYBACK_SPEEDS.len() as i32 - 1;
    PLAYBACK_SPEEDS[(index + steps).clamp(0, last) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_source_reports_error() {
        let mut source = FailedSource::new(StreamError::CameraPermissionDenied("denied".into()));
        assert!(source.frame().is_none());
        assert!(source.playback_position().is_none());
        assert!(source.error().is_some_and(|e| e.is_camera()));
    }

    #[test]
    fn test_direct_url() {
        let store = DirectUrl::new("file:///videos/combo.mp4");
        assert_eq!(store.resolve("combo").unwrap(), "file:///videos/combo.mp4");
        assert!(DirectUrl::new("").resolve("combo").is_err());
    }

    #[test]
    fn test_nearest_playback_speed() {
        assert_eq!(nearest_playback_speed(1.0), 1.0);
        assert_eq!(nearest_playback_speed(0.7), 0.75);
        assert_eq!(nearest_playback_speed(3.0), 1.25);
        assert_eq!(nearest_playback_speed(0.0), 0.5);
    }

    #[test]
    fn test_step_playback_speed() {
        assert_eq!(step_playback_speed(1.0, 1), 1.25);
        assert_eq!(step_playback_speed(1.25, 1), 1.25);
        assert_eq!(step_playback_speed(1.0, -1), 0.75);
        assert_eq!(step_playback_speed(0.75, -5), 0.5);
        assert_eq!(step_playback_speed(0.8, 1), 1.0);
    }
}
