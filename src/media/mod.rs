pub mod device;
pub mod manager;
pub mod test_pattern;

pub use device::{FacingMode, MediaDevice, MediaStream, StreamConstraints};
pub use manager::MediaSourceManager;
