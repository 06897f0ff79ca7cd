//! Detection scheduling.
//!
//! Each stream gets its own [`DetectionLoop`]. A loop is a repeatable `tick`
//! that either declines (interval not elapsed, reference frame unchanged) or
//! runs exactly one detection and writes the smoothed result into that
//! stream's [`DetectionBuffer`]. The driver calls `tick` repeatedly and yields
//! in between, so detection cadence is bounded by the interval check rather
//! than by the display or the model latency.

use quanta::{Clock, Instant};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::buffer::DetectionBuffer;
use super::smooth::smooth;
use crate::camera::FrameSource;
use crate::pose::{KeypointIndex, ModelLoader, PoseExtractor};

/// Reference re-detection is skipped until playback moves by more than this.
pub const REFERENCE_FRAME_EPSILON: Duration = Duration::from_millis(30);

/// Upper bound for the driver's sleep between re-checks.
const MAX_YIELD: Duration = Duration::from_millis(4);

const STATS_LOG_EVERY: u64 = 30;

/// Selectable detection rate.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum DetectionRate {
    #[default]
    Hz15,
    Hz30,
    Hz60,
}

impl DetectionRate {
    pub const ALL: [DetectionRate; 3] = [Self::Hz15, Self::Hz30, Self::Hz60];

    pub fn fps(self) -> u32 {
        match self {
            Self::Hz15 => 15,
            Self::Hz30 => 30,
            Self::Hz60 => 60,
        }
    }

    /// Target interval between detection attempts (whole milliseconds, truncated).
    pub fn interval(self) -> Duration {
        match self {
            Self::Hz15 => Duration::from_millis(66),
            Self::Hz30 => Duration::from_millis(33),
            Self::Hz60 => Duration::from_millis(16),
        }
    }
}

impl TryFrom<u32> for DetectionRate {
    type Error = String;

    fn try_from(fps: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|rate| rate.fps() == fps)
            .ok_or_else(|| format!("unsupported detection rate {fps} (expected 15, 30 or 60)"))
    }
}

impl From<DetectionRate> for u32 {
    fn from(rate: DetectionRate) -> u32 {
        rate.fps()
    }
}

impl fmt::Display for DetectionRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps", self.fps())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    User,
    Reference,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::User => "user",
            StreamKind::Reference => "reference",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single `tick` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop was stopped through its handle.
    Stopped,
    /// Interval not elapsed yet; try again after (at most) this long.
    Waiting(Duration),
    /// The source had no frame to offer.
    NoFrame,
    /// Reference playback has not moved since the last attempt.
    Unchanged,
    /// The extractor returned nothing (model not ready, no person, error).
    NoPose,
    /// A new smoothed pose was written to the buffer.
    Updated,
}

/// Cooperative stop flag shared with whoever owns the loop.
#[derive(Debug, Clone)]
pub struct LoopHandle(Arc<AtomicBool>);

impl LoopHandle {
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DetectionStats {
    /// Accepted attempts (interval elapsed).
    pub attempts: u64,
    /// Attempts that produced a pose.
    pub detections: u64,
}

pub struct DetectionLoop {
    kind: StreamKind,
    clock: Clock,
    interval: Duration,
    alpha: f32,
    frame_epsilon: Duration,
    running: Arc<AtomicBool>,
    last_attempt: Option<Instant>,
    last_playback: Option<Duration>,
    stats: DetectionStats,
}

impl DetectionLoop {
    pub fn new(kind: StreamKind, clock: Clock, rate: DetectionRate, alpha: f32) -> Self {
        Self {
            kind,
            clock,
            interval: rate.interval(),
            alpha,
            frame_epsilon: REFERENCE_FRAME_EPSILON,
            running: Arc::new(AtomicBool::new(true)),
            last_attempt: None,
            last_playback: None,
            stats: DetectionStats::default(),
        }
    }

    pub fn with_frame_epsilon(mut self, epsilon: Duration) -> Self {
        self.frame_epsilon = epsilon;
        self
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_rate(&mut self, rate: DetectionRate) {
        self.interval = rate.interval();
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle(Arc::clone(&self.running))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> DetectionStats {
        self.stats
    }

    /// How long the driver should sleep before re-checking.
    pub fn yield_hint(&self) -> Duration {
        (self.interval / 4).min(MAX_YIELD)
    }

    pub fn tick<L, S>(
        &mut self,
        extractor: &mut PoseExtractor<L>,
        source: &mut S,
        buffer: &mut DetectionBuffer,
    ) -> TickOutcome
    where
        L: ModelLoader,
        S: FrameSource + ?Sized,
    {
        if !self.is_running() {
            return TickOutcome::Stopped;
        }

        let now = self.clock.now();
        if let Some(last) = self.last_attempt {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.interval {
                return TickOutcome::Waiting(self.interval - elapsed);
            }
        }
        self.last_attempt = Some(now);
        self.stats.attempts += 1;
        if self.stats.attempts % STATS_LOG_EVERY == 0 {
            debug!(
                stream = %self.kind,
                attempts = self.stats.attempts,
                detections = self.stats.detections,
                "detection stats"
            );
        }

        if self.kind == StreamKind::Reference && !self.playback_advanced(source, buffer) {
            return TickOutcome::Unchanged;
        }

        let Some(frame) = source.frame() else {
            return TickOutcome::NoFrame;
        };
        let Some(raw) = extractor.detect(&frame) else {
            return TickOutcome::NoPose;
        };

        let smoothed = smooth(buffer.current(), &raw, self.alpha);
        buffer.push(smoothed, now);
        self.stats.detections += 1;

        if self.stats.detections == 1 {
            let first = raw.get(KeypointIndex::Nose);
            info!(
                stream = %self.kind,
                keypoints = KeypointIndex::COUNT,
                x = first.x.round(),
                y = first.y.round(),
                score = first.score,
                confidence = raw.average_confidence(),
                "first detection"
            );
        }
        TickOutcome::Updated
    }

    /// Records the playback position and reports whether the reference frame
    /// moved far enough to be worth another detection. Always true until the
    /// buffer holds a pose, and for sources that report no position.
    fn playback_advanced<S: FrameSource + ?Sized>(
        &mut self,
        source: &S,
        buffer: &DetectionBuffer,
    ) -> bool {
        let Some(position) = source.playback_position() else {
            return true;
        };
        let moved = match self.last_playback {
            Some(last) => abs_diff(position, last) > self.frame_epsilon,
            None => true,
        };
        if !moved && !buffer.is_empty() {
            return false;
        }
        self.last_playback = Some(position);
        true
    }
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}
