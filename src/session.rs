//! One practice session: the shared pose extractor, a detection loop and
//! buffer per stream, and the per-render-tick comparison pipeline.

use quanta::Clock;
use std::time::Duration;

use crate::camera::FrameSource;
use crate::config::{Config, ScoreConfig};
use crate::error::StreamError;
use crate::ghost::{
    mirror, normalize, score, FeedbackEvent, FeedbackTracker, GhostSettings, MatchResult,
    PracticeSettings,
};
use crate::pose::{ModelLoader, ModelStatus, Pose, PoseExtractor};
use crate::tracker::{
    interpolate, DetectionBuffer, DetectionLoop, DetectionRate, DetectionStats, LoopHandle,
    StreamKind, TickOutcome,
};

/// What the renderer needs for one display frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Interpolated user pose, in camera pixels.
    pub user: Option<Pose>,
    /// Reference pose fitted onto the user's body, in camera pixels, before
    /// mirroring. `None` when the ghost is disabled or a stream has no pose.
    pub ghost: Option<Pose>,
    pub result: MatchResult,
    /// Set on the tick the "Great!" feedback fires.
    pub feedback: Option<FeedbackEvent>,
    pub celebrating: bool,
}

pub struct PracticeSession<L: ModelLoader> {
    extractor: PoseExtractor<L>,
    clock: Clock,
    rate: DetectionRate,
    user_loop: DetectionLoop,
    reference_loop: DetectionLoop,
    user_buffer: DetectionBuffer,
    reference_buffer: DetectionBuffer,
    ghost: GhostSettings,
    score_config: ScoreConfig,
    feedback: FeedbackTracker,
}

impl<L: ModelLoader> PracticeSession<L> {
    pub fn new(
        extractor: PoseExtractor<L>,
        clock: Clock,
        config: &Config,
        practice: PracticeSettings,
        ghost: GhostSettings,
    ) -> Self {
        let rate = practice.fps;
        let alpha = config.smooth.alpha;
        let user_loop = DetectionLoop::new(StreamKind::User, clock.clone(), rate, alpha);
        let reference_loop = DetectionLoop::new(StreamKind::Reference, clock.clone(), rate, alpha)
            .with_frame_epsilon(Duration::from_millis(config.detection.frame_epsilon_ms));

        Self {
            extractor,
            clock,
            rate,
            user_loop,
            reference_loop,
            user_buffer: DetectionBuffer::new(),
            reference_buffer: DetectionBuffer::new(),
            ghost: ghost.sanitize(),
            score_config: config.score.clone(),
            feedback: FeedbackTracker::from_config(&config.feedback),
        }
    }

    pub fn initialize_model(&mut self) -> Result<(), StreamError> {
        self.extractor.initialize()
    }

    pub fn retry_model(&mut self) -> Result<(), StreamError> {
        self.extractor.retry()
    }

    pub fn model_status(&self) -> ModelStatus {
        self.extractor.status()
    }

    pub fn rate(&self) -> DetectionRate {
        self.rate
    }

    /// Applies to both streams from their next attempt on.
    pub fn set_rate(&mut self, rate: DetectionRate) {
        self.rate = rate;
        self.user_loop.set_rate(rate);
        self.reference_loop.set_rate(rate);
    }

    pub fn practice_settings(&self) -> PracticeSettings {
        PracticeSettings { fps: self.rate }
    }

    pub fn ghost_settings(&self) -> &GhostSettings {
        &self.ghost
    }

    pub fn set_ghost_settings(&mut self, settings: GhostSettings) {
        self.ghost = settings.sanitize();
    }

    /// Gives each stream one chance to run a detection, user first.
    pub fn poll_detection(
        &mut self,
        user: &mut dyn FrameSource,
        reference: &mut dyn FrameSource,
    ) -> (TickOutcome, TickOutcome) {
        let user_outcome = self
            .user_loop
            .tick(&mut self.extractor, user, &mut self.user_buffer);
        let reference_outcome =
            self.reference_loop
                .tick(&mut self.extractor, reference, &mut self.reference_buffer);
        (user_outcome, reference_outcome)
    }

    /// How long to sleep after a poll in which neither stream was due.
    pub fn yield_hint(&self) -> Duration {
        self.user_loop.yield_hint()
    }

    pub fn render_tick(&mut self, frame_width: f32) -> RenderFrame {
        let now = self.clock.now();
        let interval = self.rate.interval();
        let user = interpolate(&self.user_buffer, now, interval);
        let reference = interpolate(&self.reference_buffer, now, interval);

        let mut ghost = None;
        let mut result = MatchResult::empty();
        let mut feedback = None;
        if let (Some(user), Some(reference)) = (&user, &reference) {
            let fitted = normalize(reference, user);
            let mirrored = mirror(&fitted, frame_width);
            result = score(
                user,
                &mirrored,
                self.score_config.distance_threshold,
                self.score_config.min_confidence,
            );
            feedback = self.feedback.update(result.score, now);
            if self.ghost.enabled {
                ghost = Some(fitted);
            }
        }

        RenderFrame {
            user,
            ghost,
            result,
            feedback,
            celebrating: self.feedback.is_celebrating(now),
        }
    }

    pub fn handles(&self) -> (LoopHandle, LoopHandle) {
        (self.user_loop.handle(), self.reference_loop.handle())
    }

    /// Stops both detection loops. Render ticks keep working on the last poses.
    pub fn stop(&mut self) {
        self.user_loop.handle().stop();
        self.reference_loop.handle().stop();
    }

    pub fn stats(&self) -> (DetectionStats, DetectionStats) {
        (self.user_loop.stats(), self.reference_loop.stats())
    }

    pub fn detect_errors(&self) -> u64 {
        self.extractor.detect_errors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ghost::normalize::tests::standing_pose;
    use crate::pose::{Frame, KeypointIndex, NormalizedLandmark, PoseModel};
    use anyhow::Result;
    use std::sync::Arc;

    const SIZE: u32 = 100;

    /// Always reports the same left/right-symmetric pose centered in the frame.
    struct SymmetricModel;

    impl PoseModel for SymmetricModel {
        fn infer(&mut self, _frame: &Frame) -> Result<Option<Vec<NormalizedLandmark>>> {
            let pose = standing_pose(SIZE as f32 / 2.0, 60.0, 0.2);
            Ok(Some(
                pose.keypoints
                    .iter()
                    .map(|kp| NormalizedLandmark {
                        x: kp.x / SIZE as f32,
                        y: kp.y / SIZE as f32,
                        z: 0.0,
                        visibility: kp.score,
                    })
                    .collect(),
            ))
        }
    }

    struct SymmetricLoader {
        fail: bool,
    }

    impl ModelLoader for SymmetricLoader {
        type Model = SymmetricModel;

        fn load(&self) -> Result<SymmetricModel> {
            if self.fail {
                anyhow::bail!("model asset unreachable");
            }
            Ok(SymmetricModel)
        }
    }

    struct StillSource;

    impl FrameSource for StillSource {
        fn frame(&mut self) -> Option<Frame> {
            Some(Frame::blank(SIZE, SIZE))
        }
    }

    fn session(fail: bool) -> (PracticeSession<SymmetricLoader>, Arc<quanta::Mock>) {
        let (clock, mock) = Clock::mock();
        let session = PracticeSession::new(
            PoseExtractor::new(SymmetricLoader { fail }),
            clock,
            &Config::default(),
            PracticeSettings::default(),
            GhostSettings::default(),
        );
        (session, mock)
    }

    #[test]
    fn test_same_pose_on_both_streams_scores_100() {
        let (mut session, _mock) = session(false);
        session.initialize_model().unwrap();

        let outcomes = session.poll_detection(&mut StillSource, &mut StillSource);
        assert_eq!(outcomes, (TickOutcome::Updated, TickOutcome::Updated));

        let frame = session.render_tick(SIZE as f32);
        assert_eq!(frame.result.score, 100);
        assert_eq!(frame.result.matched_count(), KeypointIndex::COUNT);
        assert!(frame.user.is_some());
        assert!(frame.ghost.is_some());
        assert!(!frame.celebrating);
    }

    #[test]
    fn test_model_not_ready_degrades_to_zero() {
        let (mut session, _mock) = session(true);
        assert!(matches!(
            session.initialize_model(),
            Err(StreamError::ModelLoad(_))
        ));
        assert!(matches!(session.model_status(), ModelStatus::Failed(_)));

        let outcomes = session.poll_detection(&mut StillSource, &mut StillSource);
        assert_eq!(outcomes, (TickOutcome::NoPose, TickOutcome::NoPose));
        let frame = session.render_tick(SIZE as f32);
        assert_eq!(frame.result, MatchResult::empty());
        assert!(frame.user.is_none());
        assert!(frame.ghost.is_none());
    }

    #[test]
    fn test_disabled_ghost_still_scores() {
        let (mut session, _mock) = session(false);
        session.initialize_model().unwrap();
        session.set_ghost_settings(GhostSettings {
            enabled: false,
            ..GhostSettings::default()
        });

        session.poll_detection(&mut StillSource, &mut StillSource);
        let frame = session.render_tick(SIZE as f32);
        assert!(frame.ghost.is_none());
        assert_eq!(frame.result.score, 100);
    }

    #[test]
    fn test_great_feedback_after_sustained_match() {
        let (mut session, mock) = session(false);
        session.initialize_model().unwrap();

        let mut fired = 0;
        for _ in 0..200 {
            session.poll_detection(&mut StillSource, &mut StillSource);
            if session.render_tick(SIZE as f32).feedback.is_some() {
                fired += 1;
            }
            mock.increment(Duration::from_millis(16));
        }
        // 3.2 秒で 1 回。次はクールダウン後
        assert_eq!(fired, 1);
        assert!(session.render_tick(SIZE as f32).celebrating);
    }

    #[test]
    fn test_stop_halts_detection() {
        let (mut session, mock) = session(false);
        session.initialize_model().unwrap();
        session.stop();
        let (user, reference) = session.handles();
        assert!(!user.is_running());
        assert!(!reference.is_running());

        mock.increment(Duration::from_millis(100));
        let outcomes = session.poll_detection(&mut StillSource, &mut StillSource);
        assert_eq!(outcomes, (TickOutcome::Stopped, TickOutcome::Stopped));
        assert_eq!(session.stats().0.attempts, 0);
    }

    #[test]
    fn test_set_rate_applies_to_both_loops() {
        let (mut session, mock) = session(false);
        session.initialize_model().unwrap();
        session.poll_detection(&mut StillSource, &mut StillSource);

        session.set_rate(DetectionRate::Hz60);
        assert_eq!(session.practice_settings().fps, DetectionRate::Hz60);
        mock.increment(Duration::from_millis(17));
        let outcomes = session.poll_detection(&mut StillSource, &mut StillSource);
        assert_eq!(outcomes, (TickOutcome::Updated, TickOutcome::Updated));
        assert_eq!(session.yield_hint(), Duration::from_millis(4));
    }
}
