use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use super::slot::FrameSlot;
use super::FrameSource;
use crate::config::CameraConfig;
use crate::error::StreamError;
use crate::pose::Frame;

/// これだけ連続で読み込みに失敗したらカメラ切断とみなす
const MAX_CONSECUTIVE_FAILURES: u32 = 30;

/// BGR Mat → RGB Frame
pub fn mat_to_frame(mat: &Mat) -> Result<Frame> {
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let data = rgb.data_bytes()?.to_vec();
    Frame::from_rgb(width, height, data).context("unexpected frame layout")
}

/// 1フレーム読み込む (BGR)
pub fn read_mat(capture: &mut VideoCapture) -> Result<Mat> {
    let mut frame = Mat::default();
    let ok = capture.read(&mut frame).context("failed to read frame")?;
    if !ok || frame.empty() {
        anyhow::bail!("empty frame received");
    }
    Ok(frame)
}

fn open_camera(config: &CameraConfig) -> Result<VideoCapture> {
    let mut capture = VideoCapture::new(config.index, VideoCaptureAPIs::CAP_ANY as i32)
        .context("failed to open camera")?;
    if !capture.is_opened()? {
        anyhow::bail!("camera {} is not available", config.index);
    }
    capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)?;
    capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)?;
    capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;
    Ok(capture)
}

/// OpenCV のエラー文言から権限拒否を見分ける
fn classify_open_error(message: String) -> StreamError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("not authorized") || lower.contains("denied") {
        StreamError::CameraPermissionDenied(message)
    } else {
        StreamError::CameraUnavailable(message)
    }
}

/// 別スレッドでカメラキャプチャを行い、最新フレームを提供する
pub struct ThreadedCamera {
    slot: Arc<FrameSlot>,
    running: Arc<AtomicBool>,
    width: u32,
    height: u32,
    handle: Option<thread::JoinHandle<()>>,
}

impl ThreadedCamera {
    pub fn start(config: &CameraConfig) -> Result<Self, StreamError> {
        let mut capture = open_camera(config).map_err(|e| classify_open_error(format!("{e:#}")))?;
        let width = match capture.get(videoio::CAP_PROP_FRAME_WIDTH) {
            Ok(w) if w > 0.0 => w as u32,
            _ => config.width,
        };
        let height = match capture.get(videoio::CAP_PROP_FRAME_HEIGHT) {
            Ok(h) if h > 0.0 => h as u32,
            _ => config.height,
        };
        info!(index = config.index, width, height, "camera opened");

        let slot = Arc::new(FrameSlot::new());
        let running = Arc::new(AtomicBool::new(true));
        let slot_ref = Arc::clone(&slot);
        let running_ref = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let mut failures = 0u32;
            while running_ref.load(Ordering::Acquire) {
                match read_mat(&mut capture).and_then(|mat| mat_to_frame(&mat)) {
                    Ok(frame) => {
                        failures = 0;
                        slot_ref.publish(frame);
                    }
                    Err(e) => {
                        failures += 1;
                        if failures == MAX_CONSECUTIVE_FAILURES {
                            warn!("camera stopped delivering frames: {e:#}");
                            slot_ref.set_error(StreamError::CameraUnavailable(format!("{e:#}")));
                        }
                        thread::sleep(Duration::from_millis(10));
                    }
                }
            }
        });

        Ok(Self {
            slot,
            running,
            width,
            height,
            handle: Some(handle),
        })
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 新フレームが到着するたびにインクリメントされる
    pub fn frame_id(&self) -> u64 {
        self.slot.frame_id()
    }
}

impl FrameSource for ThreadedCamera {
    fn frame(&mut self) -> Option<Frame> {
        self.slot.latest()
    }

    fn error(&self) -> Option<StreamError> {
        self.slot.error()
    }
}

impl Drop for ThreadedCamera {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_open_error() {
        assert!(matches!(
            classify_open_error("camera access not authorized".into()),
            StreamError::CameraPermissionDenied(_)
        ));
        assert!(matches!(
            classify_open_error("camera 3 is not available".into()),
            StreamError::CameraUnavailable(_)
        ));
    }
}
