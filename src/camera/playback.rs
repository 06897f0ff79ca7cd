use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use super::nearest_playback_speed;

/// 左右キー 1 回分のシーク幅
pub const SEEK_STEP: Duration = Duration::from_secs(5);

/// フレーム数の誤差。これ以内で読めなくなったら最後まで再生したとみなす
const END_TOLERANCE_FRAMES: f64 = 2.0;

const UNSET: u64 = u64::MAX;

fn to_us(duration: Duration) -> u64 {
    duration.as_micros().min((UNSET - 1) as u128) as u64
}

fn from_us(us: u64) -> Option<Duration> {
    (us != UNSET).then(|| Duration::from_micros(us))
}

/// 参照動画の再生状態。UI 側が操作し、再生スレッドが反映する
///
/// シークは要求として積んでおき、再生スレッドが `take_seek` で取り出して
/// 実際のキャプチャに適用する。
#[derive(Debug)]
pub struct PlaybackControl {
    running: AtomicBool,
    paused: AtomicBool,
    finished: AtomicBool,
    /// f32 のビット列
    rate: AtomicU32,
    /// 最後に出したフレームの再生位置 (マイクロ秒)
    position_us: AtomicU64,
    duration_us: AtomicU64,
    seek_us: AtomicU64,
}

impl PlaybackControl {
    /// 一時停止状態で作る。最初のフレームを表示するため先頭へのシークを予約しておく
    pub fn new(rate: f32, duration: Option<Duration>) -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(true),
            finished: AtomicBool::new(false),
            rate: AtomicU32::new(nearest_playback_speed(rate).to_bits()),
            position_us: AtomicU64::new(UNSET),
            duration_us: AtomicU64::new(duration.map_or(UNSET, to_us)),
            seek_us: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// 再生/一時停止を切り替え、切り替え後に一時停止中かを返す。
    /// 最後まで再生した後に再開すると先頭から
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.is_paused();
        if !paused && self.is_finished() {
            self.restart();
        }
        self.paused.store(paused, Ordering::Release);
        paused
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// 終端に達した。動画の終了と同じく一時停止になる
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Release);
        self.paused.store(true, Ordering::Release);
    }

    pub fn rate(&self) -> f32 {
        f32::from_bits(self.rate.load(Ordering::Relaxed))
    }

    /// 選択肢のうち最も近い速度に設定し、設定した値を返す
    pub fn set_rate(&self, rate: f32) -> f32 {
        let rate = nearest_playback_speed(rate);
        self.rate.store(rate.to_bits(), Ordering::Relaxed);
        rate
    }

    pub fn position(&self) -> Option<Duration> {
        from_us(self.position_us.load(Ordering::Acquire))
    }

    pub fn set_position(&self, position: Duration) {
        self.position_us.store(to_us(position), Ordering::Release);
    }

    /// 動画の長さ。コンテナが報告しなければ None
    pub fn duration(&self) -> Option<Duration> {
        from_us(self.duration_us.load(Ordering::Acquire))
    }

    /// 指定位置へのシークを要求。長さが分かっていればその範囲に収める
    pub fn seek(&self, target: Duration) {
        let target = match self.duration() {
            Some(duration) => target.min(duration),
            None => target,
        };
        self.seek_us.store(to_us(target), Ordering::Release);
    }

    pub fn restart(&self) {
        self.seek(Duration::ZERO);
    }

    /// [`SEEK_STEP`] だけ前後にシーク。未処理の要求があればそこを起点にする
    pub fn step(&self, forward: bool) {
        let base = self
            .pending_seek()
            .or_else(|| self.position())
            .unwrap_or(Duration::ZERO);
        let target = if forward {
            base + SEEK_STEP
        } else {
            base.saturating_sub(SEEK_STEP)
        };
        self.seek(target);
    }

    pub fn pending_seek(&self) -> Option<Duration> {
        from_us(self.seek_us.load(Ordering::Acquire))
    }

    /// 再生スレッド用。要求を取り出し、終端状態を解除する
    pub fn take_seek(&self) -> Option<Duration> {
        let target = from_us(self.seek_us.swap(UNSET, Ordering::AcqRel))?;
        self.finished.store(false, Ordering::Release);
        Some(target)
    }

    /// フレームを進めずに待つべきか
    pub fn should_idle(&self) -> bool {
        self.is_paused() || self.is_finished()
    }
}

/// 読み込みが途切れたとき、まだ終端より手前だったか
///
/// `frame_count` が 0 以下 (不明) のときは終端とみなす。
pub fn ended_early(position_frames: f64, frame_count: f64) -> bool {
    frame_count > 0.0 && position_frames + END_TOLERANCE_FRAMES < frame_count
}
