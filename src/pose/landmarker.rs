use anyhow::{bail, Context, Result};
use image::imageops::{self, FilterType};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::extractor::{ModelLoader, NormalizedLandmark, PoseModel};
use super::frame::Frame;
use super::keypoint::KeypointIndex;
use crate::config::ModelConfig;

/// ランドマーク出力 1 点あたりの値数 (x, y, z, visibility, presence)
const LANDMARK_STRIDE: usize = 5;

/// BlazePose ランドマークモデル (ONNX)
pub struct BlazePoseLandmarker {
    session: Session,
    input_name: String,
    landmarks_output: String,
    presence_output: String,
    input_size: u32,
    presence_threshold: f32,
}

impl BlazePoseLandmarker {
    /// ONNXモデルを読み込んで初期化
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(&config.path))
            .with_context(|| format!("Failed to load ONNX model: {}", config.path))?;

        Ok(Self {
            session,
            input_name: config.input_name.clone(),
            landmarks_output: config.landmarks_output.clone(),
            presence_output: config.presence_output.clone(),
            input_size: config.input_size,
            presence_threshold: config.presence_threshold,
        })
    }

    /// フレーム全体を input_size x input_size にリサイズし
    /// [1, size, size, 3] の f32 テンソル (0.0-1.0) に変換
    fn preprocess(&self, frame: &Frame) -> Array4<f32> {
        let size = self.input_size;
        let resized = imageops::resize(frame.image(), size, size, FilterType::Triangle);

        let s = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, s, s, 3));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
            }
        }
        tensor
    }
}

impl PoseModel for BlazePoseLandmarker {
    fn infer(&mut self, frame: &Frame) -> Result<Option<Vec<NormalizedLandmark>>> {
        let input_tensor = Tensor::from_array(self.preprocess(frame))?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .context("Inference failed")?;

        // 人物存在スコア [1, 1]
        let presence: ndarray::ArrayViewD<f32> = outputs[self.presence_output.as_str()]
            .try_extract_array()
            .context("Failed to extract presence tensor")?;
        let presence = presence.iter().next().copied().unwrap_or(0.0);
        if presence < self.presence_threshold {
            return Ok(None);
        }

        // ランドマーク [1, 195]: 39点 x (x, y, z, visibility, presence)、入力ピクセル座標
        // 先頭33点が体のキーポイント
        let output: ndarray::ArrayViewD<f32> = outputs[self.landmarks_output.as_str()]
            .try_extract_array()
            .context("Failed to extract landmark tensor")?;
        let values: Vec<f32> = output.iter().copied().collect();
        if values.len() < KeypointIndex::COUNT * LANDMARK_STRIDE {
            bail!(
                "landmark tensor too small: {} values for {} keypoints",
                values.len(),
                KeypointIndex::COUNT
            );
        }

        let size = self.input_size as f32;
        let landmarks = values
            .chunks_exact(LANDMARK_STRIDE)
            .take(KeypointIndex::COUNT)
            .map(|v| NormalizedLandmark {
                x: v[0] / size,
                y: v[1] / size,
                z: v[2] / size,
                visibility: sigmoid(v[3]),
            })
            .collect();

        Ok(Some(landmarks))
    }
}

fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

/// 設定から [`BlazePoseLandmarker`] を生成するローダー
#[derive(Debug, Clone)]
pub struct BlazePoseLoader {
    config: ModelConfig,
}

impl BlazePoseLoader {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

impl ModelLoader for BlazePoseLoader {
    type Model = BlazePoseLandmarker;

    fn load(&self) -> Result<BlazePoseLandmarker> {
        BlazePoseLandmarker::new(&self.config)
    }
}
