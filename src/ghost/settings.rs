use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::storage::SettingsStore;
use crate::tracker::DetectionRate;

/// ゴーストの不透明度の上限
pub const MAX_GHOST_OPACITY: f32 = 0.8;

pub const GHOST_SETTINGS_KEY: &str = "trace-ghost-settings";
pub const PRACTICE_SETTINGS_KEY: &str = "trace-settings";

const OPACITY_STEP: f32 = 0.1;

/// ゴースト表示設定。描画にのみ影響し、スコア計算には使わない
///
/// 保存済みレコードに欠けているフィールドはデフォルトで補う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostSettings {
    pub enabled: bool,
    /// 0.0〜[`MAX_GHOST_OPACITY`]
    pub opacity: f32,
    /// `#RRGGBB`
    pub color: String,
}

impl Default for GhostSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: 0.4,
            color: "#10B981".to_string(),
        }
    }
}

impl GhostSettings {
    /// 範囲外の不透明度を丸める
    pub fn sanitize(mut self) -> Self {
        self.opacity = if self.opacity.is_nan() {
            Self::default().opacity
        } else {
            self.opacity.clamp(0.0, MAX_GHOST_OPACITY)
        };
        self
    }

    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// 0.1 刻みで不透明度を増減
    pub fn adjust_opacity(&mut self, steps: i32) {
        let opacity = self.opacity + steps as f32 * OPACITY_STEP;
        // 浮動小数の誤差を 0.01 単位で丸める
        self.opacity = ((opacity * 100.0).round() / 100.0).clamp(0.0, MAX_GHOST_OPACITY);
    }

    /// 色を RGB に変換。解釈できなければデフォルト色
    pub fn color_rgb(&self) -> (u8, u8, u8) {
        parse_hex(&self.color)
            .or_else(|| parse_hex(&Self::default().color))
            .unwrap_or((0x10, 0xB9, 0x81))
    }

    pub fn load(store: &SettingsStore) -> Self {
        store
            .load_or(GHOST_SETTINGS_KEY, Self::default())
            .sanitize()
    }

    pub fn save(&self, store: &SettingsStore) -> Result<()> {
        store.save(GHOST_SETTINGS_KEY, self)
    }
}

/// 練習画面の設定
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PracticeSettings {
    pub fps: DetectionRate,
}

/// 保存済みレコード。欠けている値は呼び出し側のフォールバックで補う
#[derive(Debug, Default, Deserialize)]
struct StoredPracticeSettings {
    #[serde(default)]
    fps: Option<DetectionRate>,
}

impl PracticeSettings {
    pub fn load(store: &SettingsStore, fallback: DetectionRate) -> Self {
        let stored: StoredPracticeSettings =
            store.load_or(PRACTICE_SETTINGS_KEY, StoredPracticeSettings::default());
        Self {
            fps: stored.fps.unwrap_or(fallback),
        }
    }

    pub fn save(&self, store: &SettingsStore) -> Result<()> {
        store.save(PRACTICE_SETTINGS_KEY, self)
    }
}

/// `#RRGGBB` または `RRGGBB`
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn approx_eq_f32(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_defaults() {
        let settings = GhostSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.opacity, 0.4);
        assert_eq!(settings.color_rgb(), (0x10, 0xB9, 0x81));
        assert_eq!(PracticeSettings::default().fps, DetectionRate::Hz15);
    }

    #[test]
    fn test_sanitize_clamps_opacity() {
        let high = GhostSettings { opacity: 1.0, ..Default::default() }.sanitize();
        assert_eq!(high.opacity, MAX_GHOST_OPACITY);
        let low = GhostSettings { opacity: -0.5, ..Default::default() }.sanitize();
        assert_eq!(low.opacity, 0.0);
        let nan = GhostSettings { opacity: f32::NAN, ..Default::default() }.sanitize();
        assert_eq!(nan.opacity, 0.4);
    }

    #[test]
    fn test_adjust_opacity() {
        let mut settings = GhostSettings::default();
        settings.adjust_opacity(1);
        assert!(approx_eq_f32(settings.opacity, 0.5, 1e-6));
        settings.adjust_opacity(10);
        assert_eq!(settings.opacity, MAX_GHOST_OPACITY);
        settings.adjust_opacity(-20);
        assert_eq!(settings.opacity, 0.0);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FFFFFF"), Some((255, 255, 255)));
        assert_eq!(parse_hex("06b6d4"), Some((0x06, 0xB6, 0xD4)));
        assert_eq!(parse_hex("#FFF"), None);
        assert_eq!(parse_hex("#GG0000"), None);
        let bad = GhostSettings { color: "green".to_string(), ..Default::default() };
        assert_eq!(bad.color_rgb(), (0x10, 0xB9, 0x81));
    }

    #[test]
    fn test_partial_record_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path(), "trace");
        fs::create_dir_all(store.root()).unwrap();
        fs::write(
            store.root().join(format!("{GHOST_SETTINGS_KEY}.json")),
            r#"{"opacity": 0.95}"#,
        )
        .unwrap();

        let settings = GhostSettings::load(&store);
        assert!(settings.enabled);
        assert_eq!(settings.color, "#10B981");
        assert_eq!(settings.opacity, MAX_GHOST_OPACITY);
    }

    #[test]
    fn test_settings_round_trip_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path(), "trace");

        let ghost = GhostSettings { enabled: false, opacity: 0.2, color: "#EC4899".to_string() };
        ghost.save(&store).unwrap();
        assert_eq!(GhostSettings::load(&store), ghost);

        assert_eq!(PracticeSettings::load(&store, DetectionRate::Hz30).fps, DetectionRate::Hz30);
        PracticeSettings { fps: DetectionRate::Hz60 }.save(&store).unwrap();
        assert_eq!(PracticeSettings::load(&store, DetectionRate::Hz15).fps, DetectionRate::Hz60);

        let raw = fs::read_to_string(store.root().join("trace-settings.json")).unwrap();
        assert!(raw.contains("60"));
    }

    #[test]
    fn test_empty_practice_record_keeps_configured_rate() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path(), "trace");
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.root().join("trace-settings.json"), "{}").unwrap();
        assert_eq!(PracticeSettings::load(&store, DetectionRate::Hz30).fps, DetectionRate::Hz30);
        assert_eq!(PracticeSettings::load(&store, DetectionRate::Hz60).fps, DetectionRate::Hz60);
    }

    #[test]
    fn test_unsupported_stored_rate_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path(), "trace");
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.root().join("trace-settings.json"), r#"{"fps": 24}"#).unwrap();
        assert_eq!(PracticeSettings::load(&store, DetectionRate::Hz15).fps, DetectionRate::Hz15);
    }
}
