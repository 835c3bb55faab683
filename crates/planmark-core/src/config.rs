//! Engine configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::factory::UnitScales;
use crate::label::DEFAULT_MIN_SCREEN_PX;
use crate::throttle::Duration;
use serde::{Deserialize, Serialize};

/// Tunable engine settings. Every field has a default, so partial JSON works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model/page and millimeter/model scale factors.
    pub unit_scales: UnitScales,
    /// Minimum on-screen marker diameter in pixels; drives label font size.
    pub min_screen_px: f64,
    /// Rotation applied by the rotate shortcut.
    pub rotation_step_degrees: f64,
    /// Minimum time between move-preview recomputations.
    pub move_preview_interval_ms: u64,
    /// Minimum time between hover hit tests.
    pub hover_interval_ms: u64,
    /// Distance beyond which a marker counts as dragged by the host.
    pub displacement_threshold: f64,
    /// Label scale while its marker is hovered.
    pub hover_label_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            unit_scales: UnitScales::default(),
            min_screen_px: DEFAULT_MIN_SCREEN_PX,
            rotation_step_degrees: 15.0,
            move_preview_interval_ms: 50,
            hover_interval_ms: 16,
            displacement_threshold: 0.1,
            hover_label_scale: 1.25,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validated()
    }

    /// Load a configuration file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(path: impl AsRef<std::path::Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Check settings. Bad unit scales are repaired, other bad values rejected.
    pub fn validated(mut self) -> ConfigResult<Self> {
        self.unit_scales = self.unit_scales.sanitized();
        positive("min_screen_px", self.min_screen_px)?;
        positive("hover_label_scale", self.hover_label_scale)?;
        if !self.rotation_step_degrees.is_finite() {
            return Err(ConfigError::Invalid {
                name: "rotation_step_degrees",
                reason: "must be finite".to_string(),
            });
        }
        if !(self.displacement_threshold.is_finite() && self.displacement_threshold >= 0.0) {
            return Err(ConfigError::Invalid {
                name: "displacement_threshold",
                reason: "must be a non-negative number".to_string(),
            });
        }
        Ok(self)
    }

    pub fn move_preview_interval(&self) -> Duration {
        Duration::from_millis(self.move_preview_interval_ms)
    }

    pub fn hover_interval(&self) -> Duration {
        Duration::from_millis(self.hover_interval_ms)
    }
}

fn positive(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            name,
            reason: format!("must be positive, got {}", value),
        })
    }
}
