use async_trait::async_trait;
use image::RgbImage;
use serde::Deserialize;

use crate::error::CameraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

/// Facing-mode and resolution preference handed to the device when a stream
/// is requested. "Ideal" dimensions are a preference, not a requirement; the
/// device reports what it actually delivers through `MediaStream::dimensions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

/// Platform camera seam. Implementations must surface every platform failure
/// (permission denied, no device, constraints unsatisfiable) as
/// `CameraError::Unavailable` rather than panicking.
#[async_trait]
pub trait MediaDevice: Send + Sync {
    async fn get_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError>;
}

/// A live stream of video images backed by one or more device tracks.
#[async_trait]
pub trait MediaStream: Send {
    /// Resolves once stream metadata is loaded and playback has started.
    /// Dimensions are not meaningful before this completes.
    async fn play(&mut self) -> Result<(), CameraError>;

    /// Native stream dimensions. (0, 0) until playback has started.
    fn dimensions(&self) -> (u32, u32);

    /// Snapshot of the current video image.
    fn frame(&mut self) -> Result<RgbImage, CameraError>;

    /// Stops all underlying tracks. Must be idempotent.
    fn stop(&mut self);
}
