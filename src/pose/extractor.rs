//! Pose extraction adapter: owns the landmark model's lifecycle and turns its
//! normalized output into pixel-space poses.

use std::fmt::Display;

use anyhow::Result;
use tracing::{error, info, warn};

use super::frame::Frame;
use super::keypoint::{Keypoint, KeypointIndex, Pose};
use crate::error::StreamError;

/// Only the first few per-frame failures are logged.
const LOGGED_DETECT_ERRORS: u64 = 3;

/// One landmark as reported by the model, in `[0, 1]` frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

/// A loaded landmark model.
///
/// `Ok(None)` means the model ran but found no person above its existence
/// threshold.
pub trait PoseModel {
    fn infer(&mut self, frame: &Frame) -> Result<Option<Vec<NormalizedLandmark>>>;
}

/// Builds a fresh model instance. Called once per (re)initialization.
pub trait ModelLoader {
    type Model: PoseModel;

    fn load(&self) -> Result<Self::Model>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Uninitialized,
    Ready,
    Failed(String),
}

enum ModelState<M> {
    Uninitialized,
    Ready(M),
    Failed(String),
}

pub struct PoseExtractor<L: ModelLoader> {
    loader: L,
    state: ModelState<L::Model>,
    detect_errors: u64,
}

impl<L: ModelLoader> PoseExtractor<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            state: ModelState::Uninitialized,
            detect_errors: 0,
        }
    }

    /// Loads the model unless it is already loaded.
    pub fn initialize(&mut self) -> Result<(), StreamError> {
        if let ModelState::Ready(_) = self.state {
            return Ok(());
        }

        info!("loading pose model");
        match self.loader.load() {
            Ok(model) => {
                self.state = ModelState::Ready(model);
                info!("pose model ready");
                Ok(())
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(error = %message, "pose model failed to load");
                self.state = ModelState::Failed(message.clone());
                Err(StreamError::ModelLoad(message))
            }
        }
    }

    /// Discards the current instance (failed or not) and loads from scratch.
    pub fn retry(&mut self) -> Result<(), StreamError> {
        self.teardown();
        self.initialize()
    }

    pub fn teardown(&mut self) {
        self.state = ModelState::Uninitialized;
    }

    pub fn status(&self) -> ModelStatus {
        match &self.state {
            ModelState::Uninitialized => ModelStatus::Uninitialized,
            ModelState::Ready(_) => ModelStatus::Ready,
            ModelState::Failed(message) => ModelStatus::Failed(message.clone()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    /// Number of failed detection calls since construction.
    pub fn detect_errors(&self) -> u64 {
        self.detect_errors
    }

    /// Runs the model on one frame. Never fails: anything that goes wrong
    /// yields `None` and the caller's stream just gets no update.
    pub fn detect(&mut self, frame: &Frame) -> Option<Pose> {
        let ModelState::Ready(model) = &mut self.state else {
            return None;
        };
        if frame.is_empty() {
            return None;
        }

        let result = model.infer(frame);
        match result {
            Ok(Some(landmarks)) => {
                let pose = to_pixel_pose(&landmarks, frame.width(), frame.height());
                if pose.is_none() {
                    self.record_failure(format_args!(
                        "expected {} landmarks, model returned {}",
                        KeypointIndex::COUNT,
                        landmarks.len()
                    ));
                }
                pose
            }
            Ok(None) => None,
            Err(e) => {
                self.record_failure(format_args!("{e:#}"));
                None
            }
        }
    }

    fn record_failure(&mut self, cause: impl Display) {
        self.detect_errors += 1;
        if self.detect_errors <= LOGGED_DETECT_ERRORS {
            warn!(count = self.detect_errors, "pose detection failed: {cause}");
        }
    }
}

/// Scales normalized landmarks into source pixels. `None` on a topology mismatch.
fn to_pixel_pose(landmarks: &[NormalizedLandmark], width: u32, height: u32) -> Option<Pose> {
    if landmarks.len() != KeypointIndex::COUNT {
        return None;
    }
    let (w, h) = (width as f32, height as f32);
    Some(Pose::from_fn(|idx| {
        let lm = landmarks[idx as usize];
        Keypoint::new(lm.x * w, lm.y * h, lm.visibility.clamp(0.0, 1.0))
            .with_z(lm.z)
            .named(idx)
    }))
}
