pub mod frame;
pub mod position;

pub use frame::Frame;
pub use position::Position;
