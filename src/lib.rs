pub mod capture;
pub mod common;
pub mod config;
pub mod coordinator;
pub mod detect;
pub mod error;
pub mod game;
pub mod location;
pub mod media;
pub mod notify;
pub mod overlay;
pub mod scoring;

pub use error::{AppError, CameraError, CaptureError, DetectorError, LocationError};

pub use common::{Frame, Position};
pub use coordinator::{SessionCoordinator, SessionCoordinatorBuilder, SessionPhase};
pub use game::GameState;
