//! Stream-level errors surfaced to the practice UI.
//!
//! Each variant is reported independently so the UI can explain the right
//! remediation. Per-frame detection failures are not represented here; the
//! extractor swallows them and the stream simply gets no update.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("pose model not ready: {0}")]
    ModelLoad(String),

    #[error("camera permission denied: {0}")]
    CameraPermissionDenied(String),

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("reference playback failed: {0}")]
    ReferencePlayback(String),
}

impl StreamError {
    /// Short hint shown next to the error.
    pub fn remediation(&self) -> &'static str {
        match self {
            StreamError::ModelLoad(_) => "press R to retry loading the model",
            StreamError::CameraPermissionDenied(_) => {
                "grant camera access in the system settings and restart"
            }
            StreamError::CameraUnavailable(_) => "connect a camera or pick another camera index",
            StreamError::ReferencePlayback(_) => "choose a different reference video",
        }
    }

    pub fn is_camera(&self) -> bool {
        matches!(
            self,
            StreamError::CameraPermissionDenied(_) | StreamError::CameraUnavailable(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_cause() {
        let err = StreamError::ReferencePlayback("unsupported codec".to_string());
        assert_eq!(err.to_string(), "reference playback failed: unsupported codec");
    }

    #[test]
    fn test_camera_errors_are_distinct_from_model_errors() {
        assert!(StreamError::CameraPermissionDenied(String::new()).is_camera());
        assert!(StreamError::CameraUnavailable(String::new()).is_camera());
        assert!(!StreamError::ModelLoad(String::new()).is_camera());
        assert_ne!(
            StreamError::CameraUnavailable(String::new()).remediation(),
            StreamError::ModelLoad(String::new()).remediation()
        );
    }
}
