//! Text labels bound to a marker's first primitive.

use crate::shapes::PrimitiveId;
use crate::substrate::{LabelId, LabelStyle, Substrate};

/// Smallest font size a label is ever given, in screen pixels.
pub const MIN_LABEL_FONT_PX: f64 = 8.0;

/// Label font size relative to the minimum on-screen marker diameter.
pub const LABEL_FONT_RATIO: f64 = 0.6;

/// Default minimum on-screen marker diameter, in screen pixels.
pub const DEFAULT_MIN_SCREEN_PX: f64 = 24.0;

/// Minimum label font size for a minimum on-screen marker diameter.
pub fn min_font_size(min_screen_px: f64) -> f64 {
    (min_screen_px * LABEL_FONT_RATIO).round().max(MIN_LABEL_FONT_PX)
}

/// Computes label styling from zoom-independent preferences.
///
/// The engine only decides target font size and transient scale; applying
/// them is up to the substrate's label renderer.
#[derive(Debug, Clone)]
pub struct LabelManager {
    min_screen_px: f64,
    hover_scale: f64,
}

impl LabelManager {
    pub fn new(min_screen_px: f64, hover_scale: f64) -> Self {
        let mut labels = Self {
            min_screen_px: DEFAULT_MIN_SCREEN_PX,
            hover_scale: 1.0,
        };
        labels.set_min_screen_px(min_screen_px);
        labels.hover_scale = if hover_scale.is_finite() && hover_scale > 0.0 {
            hover_scale
        } else {
            1.0
        };
        labels
    }

    pub fn min_screen_px(&self) -> f64 {
        self.min_screen_px
    }

    /// Update the minimum on-screen marker diameter. Invalid values are ignored.
    pub fn set_min_screen_px(&mut self, px: f64) {
        if px.is_finite() && px > 0.0 {
            self.min_screen_px = px;
        } else {
            log::warn!("Ignoring invalid minimum screen size {}", px);
        }
    }

    /// Current minimum font size.
    pub fn min_font_size(&self) -> f64 {
        min_font_size(self.min_screen_px)
    }

    /// Create a label on a primitive and give it the baseline style.
    ///
    /// Returns `None` when the substrate cannot label that primitive.
    pub fn create_label<S: Substrate>(
        &self,
        substrate: &mut S,
        anchor: PrimitiveId,
        text: &str,
    ) -> Option<LabelId> {
        let Some(label) = substrate.create_label(anchor, text) else {
            log::debug!("Substrate declined a label for primitive {}", anchor);
            return None;
        };
        self.apply_style(substrate, label, false);
        Some(label)
    }

    /// Apply the baseline or hovered style to a label.
    pub fn apply_style<S: Substrate>(&self, substrate: &mut S, label: LabelId, hovered: bool) {
        substrate.style_label(
            label,
            LabelStyle {
                font_size: self.min_font_size(),
                scale: if hovered { self.hover_scale } else { 1.0 },
            },
        );
    }
}

impl Default for LabelManager {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCREEN_PX, 1.25)
    }
}
