use serde::{Deserialize, Serialize};

/// Latest known device position. Absence is modeled as `Option<Position>` at
/// the cache level, never as a sentinel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
