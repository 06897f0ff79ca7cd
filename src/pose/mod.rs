pub mod extractor;
pub mod frame;
pub mod keypoint;
pub mod landmarker;

pub use extractor::{ModelLoader, ModelStatus, NormalizedLandmark, PoseExtractor, PoseModel};
pub use frame::Frame;
pub use keypoint::{Keypoint, KeypointIndex, Pose};
pub use landmarker::{BlazePoseLandmarker, BlazePoseLoader};
