use quanta::Instant;
use std::time::Duration;
use tracing::info;

use crate::config::FeedbackConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackEvent {
    /// 高スコアを一定時間維持した
    Great,
}

/// 高スコアの継続時間を追って "Great!" を出す
///
/// スコアが閾値以上の状態が `hold` を超えて続いたら発火し、`display` の間表示する。
/// 発火後は連続記録の開始時刻を `cooldown` だけ未来に置くので、
/// 次の発火は最短でも `cooldown + hold` 後。閾値未満のスコアで記録はリセット。
#[derive(Debug, Clone)]
pub struct FeedbackTracker {
    threshold: u8,
    hold: Duration,
    display: Duration,
    cooldown: Duration,
    streak_start: Option<Instant>,
    showing_until: Option<Instant>,
}

impl FeedbackTracker {
    pub fn new(threshold: u8, hold: Duration, display: Duration, cooldown: Duration) -> Self {
        Self {
            threshold,
            hold,
            display,
            cooldown,
            streak_start: None,
            showing_until: None,
        }
    }

    pub fn from_config(config: &FeedbackConfig) -> Self {
        Self::new(
            config.great_threshold,
            Duration::from_millis(config.hold_ms),
            Duration::from_millis(config.display_ms),
            Duration::from_millis(config.cooldown_ms),
        )
    }

    /// 描画フレームごとのスコアを渡す
    pub fn update(&mut self, score: u8, now: Instant) -> Option<FeedbackEvent> {
        if score < self.threshold {
            self.streak_start = None;
            return None;
        }

        let Some(start) = self.streak_start else {
            self.streak_start = Some(now);
            return None;
        };
        if now.saturating_duration_since(start) <= self.hold {
            return None;
        }

        self.streak_start = Some(now.checked_add(self.cooldown).unwrap_or(now));
        self.showing_until = Some(now.checked_add(self.display).unwrap_or(now));
        info!(score, "great!");
        Some(FeedbackEvent::Great)
    }

    /// バナー表示中か
    pub fn is_celebrating(&self, now: Instant) -> bool {
        self.showing_until.is_some_and(|until| now < until)
    }

    pub fn reset(&mut self) {
        self.streak_start = None;
        self.showing_until = None;
    }
}

impl Default for FeedbackTracker {
    fn default() -> Self {
        Self::from_config(&FeedbackConfig::default())
    }
}
