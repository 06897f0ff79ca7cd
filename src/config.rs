use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::tracker::DetectionRate;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub smooth: SmoothConfig,
    #[serde(default)]
    pub score: ScoreConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: String,
    #[serde(default = "default_input_name")]
    pub input_name: String,
    /// ランドマーク出力テンソル名
    #[serde(default = "default_landmarks_output")]
    pub landmarks_output: String,
    /// 人物存在スコア出力テンソル名
    #[serde(default = "default_presence_output")]
    pub presence_output: String,
    /// 入力解像度 (正方形)
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    /// これ未満の存在スコアは「人物なし」
    #[serde(default = "default_presence_threshold")]
    pub presence_threshold: f32,
}

fn default_model_path() -> String { "models/pose_landmark_full.onnx".to_string() }
fn default_input_name() -> String { "input_1".to_string() }
fn default_landmarks_output() -> String { "Identity".to_string() }
fn default_presence_output() -> String { "Identity_1".to_string() }
fn default_input_size() -> u32 { 256 }
fn default_presence_threshold() -> f32 { 0.5 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            input_name: default_input_name(),
            landmarks_output: default_landmarks_output(),
            presence_output: default_presence_output(),
            input_size: default_input_size(),
            presence_threshold: default_presence_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// 保存済み設定がない場合の検出レート (15 / 30 / 60)
    #[serde(default)]
    pub rate: DetectionRate,
    /// 参照動画の再生位置がこれ以上進んでいなければ再検出しない (ミリ秒)
    #[serde(default = "default_frame_epsilon_ms")]
    pub frame_epsilon_ms: u64,
}

fn default_frame_epsilon_ms() -> u64 { 30 }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            rate: DetectionRate::default(),
            frame_epsilon_ms: default_frame_epsilon_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothConfig {
    /// EMA係数 (1.0 で平滑化なし)
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

fn default_alpha() -> f32 { 0.65 }

impl Default for SmoothConfig {
    fn default() -> Self {
        Self { alpha: default_alpha() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoreConfig {
    /// 一致とみなす関節間距離 (ソースピクセル)
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

fn default_distance_threshold() -> f32 { 40.0 }
fn default_min_confidence() -> f32 { 0.3 }

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
            min_confidence: default_min_confidence(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    /// "Great!" を出すスコア
    #[serde(default = "default_great_threshold")]
    pub great_threshold: u8,
    /// 閾値以上をこの時間維持したら表示 (ミリ秒)
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
    #[serde(default = "default_display_ms")]
    pub display_ms: u64,
    /// 表示後、次の判定を始めるまでの待ち時間 (ミリ秒)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_great_threshold() -> u8 { 90 }
fn default_hold_ms() -> u64 { 3000 }
fn default_display_ms() -> u64 { 2500 }
fn default_cooldown_ms() -> u64 { 5000 }

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            great_threshold: default_great_threshold(),
            hold_ms: default_hold_ms(),
            display_ms: default_display_ms(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
}

fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 480 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceConfig {
    /// 参照動画のURLまたはパス (署名付きURLも可)
    #[serde(default)]
    pub url: String,
    /// 再生速度 (0.5 / 0.75 / 1.0 / 1.25)
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f32,
}

fn default_playback_rate() -> f32 { 1.0 }

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            playback_rate: default_playback_rate(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// 設定レコードの保存先ディレクトリ
    #[serde(default = "default_storage_dir")]
    pub dir: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_storage_dir() -> String { ".trace".to_string() }
fn default_namespace() -> String { "trace".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            namespace: default_namespace(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// 描画レート (Hz)
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
}

fn default_refresh_hz() -> u32 { 60 }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { refresh_hz: default_refresh_hz() }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// 読めなければデフォルト設定で続行
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("using default config: {e:#}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.detection.rate, DetectionRate::Hz15);
        assert_eq!(config.detection.frame_epsilon_ms, 30);
        assert_eq!(config.smooth.alpha, 0.65);
        assert_eq!(config.score.distance_threshold, 40.0);
        assert_eq!(config.score.min_confidence, 0.3);
        assert_eq!(config.feedback.great_threshold, 90);
        assert_eq!(config.model.input_size, 256);
        assert_eq!(config.storage.namespace, "trace");
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [detection]
            rate = 30

            [score]
            distance_threshold = 25.0

            [reference]
            url = "https://example.com/dance.mp4"
            playback_rate = 0.75
            "#,
        )
        .unwrap();
        assert_eq!(config.detection.rate, DetectionRate::Hz30);
        assert_eq!(config.score.distance_threshold, 25.0);
        assert_eq!(config.score.min_confidence, 0.3);
        assert_eq!(config.reference.url, "https://example.com/dance.mp4");
        assert_eq!(config.reference.playback_rate, 0.75);
    }

    #[test]
    fn test_unsupported_rate_is_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[detection]\nrate = 24\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.camera.width, 640);
    }
}
