//! Presentation preferences
//!
//! The simulation never reads these; they shape the quality hint handed to
//! the render collaborator. Stored by the host as JSON.

use serde::{Deserialize, Serialize};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Recommendation from the smoothed frame rate
    pub fn for_fps(fps_ema: f64) -> Self {
        if fps_ema < 40.0 {
            QualityPreset::Low
        } else if fps_ema < 55.0 {
            QualityPreset::Medium
        } else {
            QualityPreset::High
        }
    }
}

/// Player preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Preferred quality; a ceiling when adaptive quality is on
    pub quality: QualityPreset,
    /// Drop quality when the frame rate sags
    pub adaptive_quality: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            adaptive_quality: true,
        }
    }
}

impl Settings {
    /// Quality to render this frame: the preferred preset, lowered to what
    /// the frame rate supports when adaptive quality is on
    pub fn resolve_quality(&self, fps_ema: f64) -> QualityPreset {
        if self.adaptive_quality {
            self.quality.min(QualityPreset::for_fps(fps_ema))
        } else {
            self.quality
        }
    }

    /// Parse host-stored settings; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
