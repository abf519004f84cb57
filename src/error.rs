use thiserror::Error;

// Main application error type.

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Camera Error: {0}")]
    Camera(#[from] CameraError),
    #[error("Detector Error: {0}")]
    Detector(#[from] DetectorError),
    #[error("Location Error: {0}")]
    Location(#[from] LocationError),
    #[error("Capture Error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Setup Error: {0}")]
    Setup(String),
}

// Camera error type. Every device-level failure (denied permission, missing
// device, unsatisfiable constraints) collapses into the single Unavailable
// condition; the user recovers with the retry action.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),
    #[error("No active camera session")]
    NotReady,
}

#[derive(Error, Debug)]
pub enum DetectorError {
    // Fatal for the session until the process restarts.
    #[error("Failed to load detection backend '{0}': {1}")]
    ModelLoad(String, String),
    // Transient, swallowed at the cycle boundary.
    #[error("Detection failed: {0}")]
    DetectionFailed(String),
}

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Position unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to encode capture: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to persist capture '{1}': {0}")]
    Io(std::io::Error, String),
    #[error("Failed to serialize capture metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}
