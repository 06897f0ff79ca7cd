use anyhow::{Context, Result};
use opencv::{
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::capture::{mat_to_frame, read_mat};
use super::playback::{ended_early, PlaybackControl};
use super::slot::FrameSlot;
use super::FrameSource;
use crate::error::StreamError;
use crate::pose::Frame;

/// FPS を報告しない動画の仮定値
const FALLBACK_FPS: f64 = 30.0;

/// 参照動画を実時間 × 再生速度で再生し、最新フレームと再生位置を提供する
///
/// 開いた直後は先頭フレームを表示して一時停止している。終端に達しても
/// スレッドは残り、巻き戻しやシークで再び再生できる。
pub struct ReferencePlayer {
    control: Arc<PlaybackControl>,
    slot: Arc<FrameSlot>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ReferencePlayer {
    pub fn open(url: &str, rate: f32) -> Result<Self, StreamError> {
        let capture = open_video(url).map_err(|e| StreamError::ReferencePlayback(format!("{e:#}")))?;
        let fps = match capture.get(videoio::CAP_PROP_FPS) {
            Ok(fps) if fps > 0.0 => fps,
            _ => FALLBACK_FPS,
        };
        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT).unwrap_or(0.0);
        let duration = (frame_count > 0.0).then(|| Duration::from_secs_f64(frame_count / fps));
        info!(url, fps, frame_count, "reference video opened");

        let control = Arc::new(PlaybackControl::new(rate, duration));
        let slot = Arc::new(FrameSlot::new());
        let control_ref = Arc::clone(&control);
        let slot_ref = Arc::clone(&slot);
        let handle = thread::spawn(move || play(capture, fps, frame_count, &control_ref, &slot_ref));

        Ok(Self {
            control,
            slot,
            handle: Some(handle),
        })
    }

    pub fn playback_rate(&self) -> f32 {
        self.control.rate()
    }

    /// 選択肢のうち最も近い速度に設定
    pub fn set_playback_rate(&self, rate: f32) {
        let rate = self.control.set_rate(rate);
        info!(rate, "playback rate changed");
    }

    pub fn toggle_pause(&self) -> bool {
        self.control.toggle_pause()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    /// 最後まで再生した
    pub fn is_finished(&self) -> bool {
        self.control.is_finished()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.control.duration()
    }

    /// 先頭に戻す。再生/一時停止の状態はそのまま
    pub fn restart(&self) {
        self.control.restart();
    }

    pub fn seek(&self, target: Duration) {
        self.control.seek(target);
    }

    /// 数秒だけ前後にシーク
    pub fn step(&self, forward: bool) {
        self.control.step(forward);
    }
}

fn open_video(url: &str) -> Result<VideoCapture> {
    let capture = VideoCapture::from_file(url, VideoCaptureAPIs::CAP_ANY as i32)
        .with_context(|| format!("failed to open {url}"))?;
    if !capture.is_opened()? {
        anyhow::bail!("cannot play {url}");
    }
    Ok(capture)
}

fn play(
    mut capture: VideoCapture,
    fps: f64,
    frame_count: f64,
    control: &PlaybackControl,
    slot: &FrameSlot,
) {
    let frame_time = Duration::from_secs_f64(1.0 / fps);
    let mut delivered = 0u64;

    while control.is_running() {
        // シーク直後は一時停止中でも 1 フレームだけ出す
        let seeked = match control.take_seek() {
            Some(target) => {
                let target_ms = target.as_secs_f64() * 1000.0;
                if !matches!(capture.set(videoio::CAP_PROP_POS_MSEC, target_ms), Ok(true)) {
                    warn!(target_ms, "reference video seek was rejected");
                }
                true
            }
            None => false,
        };
        if !seeked && control.should_idle() {
            thread::sleep(Duration::from_millis(10));
            continue;
        }

        let started = Instant::now();
        let frame = read_mat(&mut capture).and_then(|mat| {
            let position_ms = capture.get(videoio::CAP_PROP_POS_MSEC)?;
            Ok((mat_to_frame(&mat)?, position_ms))
        });
        match frame {
            Ok((frame, position_ms)) => {
                slot.publish(frame);
                control.set_position(Duration::from_secs_f64(position_ms.max(0.0) / 1000.0));
                delivered += 1;
            }
            Err(e) => {
                let position = capture.get(videoio::CAP_PROP_POS_FRAMES).unwrap_or(0.0);
                if delivered == 0 {
                    warn!("reference video produced no frames: {e:#}");
                    slot.set_error(StreamError::ReferencePlayback(format!("{e:#}")));
                } else if ended_early(position, frame_count) {
                    warn!(position, frame_count, "reference video stopped early: {e:#}");
                    slot.set_error(StreamError::ReferencePlayback(format!(
                        "decoding stopped at frame {position} of {frame_count}: {e:#}"
                    )));
                } else {
                    info!(frames = delivered, "reference video finished");
                }
                control.finish();
                continue;
            }
        }

        if control.is_paused() {
            continue;
        }
        let target = frame_time.div_f32(control.rate().max(0.1));
        if let Some(remaining) = target.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

impl FrameSource for ReferencePlayer {
    fn frame(&mut self) -> Option<Frame> {
        self.slot.latest()
    }

    fn playback_position(&self) -> Option<Duration> {
        self.control.position()
    }

    fn error(&self) -> Option<StreamError> {
        self.slot.error()
    }
}

impl Drop for ReferencePlayer {
    fn drop(&mut self) {
        self.control.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
