pub mod stub;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::common::Frame;
use crate::config::DetectionSettings;
use crate::error::DetectorError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One detected object instance. Produced fresh each cycle; detections are
/// never merged or tracked across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// In [0, 1].
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Opaque object-recognition capability. The scoring loop guarantees a single
/// in-flight call per detector by construction of its cadence; implementations
/// do not need internal locking for that.
#[async_trait]
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError>;
}

impl std::fmt::Debug for dyn Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("name", &self.name())
            .finish()
    }
}

/// Resolves and loads the configured detection backend. A load failure is
/// fatal for the session until the process restarts.
pub async fn load_detector(
    settings: &DetectionSettings,
) -> Result<Arc<dyn Detector>, DetectorError> {
    match settings.backend.as_str() {
        "stub" => Ok(Arc::new(stub::LuminanceDetector::new())),
        other => Err(DetectorError::ModelLoad(
            other.to_string(),
            "unknown backend".to_string(),
        )),
    }
}
