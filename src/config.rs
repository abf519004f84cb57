use serde::Deserialize;
use std::path::PathBuf;

use crate::error::AppError;
use crate::media::device::StreamConstraints;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub camera: StreamConstraints,
    pub detection: DetectionSettings,
    pub location: LocationSettings,
    pub overlay: OverlaySettings,
    pub capture: CaptureSettings,
    pub game: GameSettings,
}

impl Configuration {
    /// Layers an optional `ecovision.toml` under `ECOVISION_*` environment
    /// overrides, falling back to the built-in defaults for everything else.
    pub fn load() -> Result<Self, AppError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("ecovision").required(false))
            .add_source(config::Environment::with_prefix("ECOVISION").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Detection backend resolved by name at startup.
    pub backend: String,
    /// Period of the scoring loop in milliseconds.
    pub cadence_ms: u64,
    /// Points awarded per recognized detection.
    pub reward_points: u64,
    /// Object classes eligible for scoring, matched case-insensitively.
    pub recognized_labels: Vec<String>,
    /// The one label that triggers the one-shot evidence capture.
    pub capture_label: String,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            backend: "stub".to_string(),
            cadence_ms: 1000,
            reward_points: 10,
            recognized_labels: ["bottle", "cup", "bowl", "can", "box", "plastic", "paper"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            capture_label: "bottle".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub high_accuracy: bool,
    /// Coordinates reported by the built-in static provider.
    pub static_latitude: f64,
    pub static_longitude: f64,
    /// How often the static provider re-emits its fix, in milliseconds.
    pub resample_ms: u64,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            static_latitude: 0.0,
            static_longitude: 0.0,
            resample_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// TTF font used for marker and box labels. Text is skipped when unset
    /// or unreadable.
    pub font_path: Option<PathBuf>,
    pub draw_virtual_markers: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            font_path: None,
            draw_virtual_markers: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub output_dir: PathBuf,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("captures"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub daily_challenge_goal: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            daily_challenge_goal: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_recognized_vocabulary() {
        let configuration = Configuration::default();
        assert_eq!(configuration.detection.reward_points, 10);
        assert_eq!(configuration.detection.cadence_ms, 1000);
        assert_eq!(configuration.detection.capture_label, "bottle");
        assert!(configuration
            .detection
            .recognized_labels
            .iter()
            .any(|l| l == "bottle"));
        assert_eq!(configuration.detection.recognized_labels.len(), 7);
    }
}
