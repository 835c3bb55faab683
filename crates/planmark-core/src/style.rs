//! Named visual states with save/restore of original primitive styling.

use crate::shapes::{Primitive, PrimitiveId, PrimitiveStyle, SerializableColor};
use crate::substrate::Substrate;
use std::collections::HashMap;

/// Stroke color of hovered markers.
pub const HOVER_STROKE: SerializableColor = SerializableColor::new(249, 115, 22, 255);
/// Stroke color of the selected marker.
pub const SELECTED_STROKE: SerializableColor = SerializableColor::new(37, 99, 235, 255);
/// Opacity of move-preview primitives.
pub const PREVIEW_OPACITY: f64 = 0.6;
/// Opacity of the ghosted original during a move.
pub const GHOST_OPACITY: f64 = 0.3;

/// A named visual state a marker's primitives can be put in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualState {
    /// Pointer is over the marker.
    Hover,
    /// The marker is selected.
    Selected,
    /// Live preview following the pointer in move-mode.
    Preview,
    /// Dimmed original during move-mode.
    Ghost,
}

impl VisualState {
    /// Derive the styled version of an original style.
    ///
    /// Only the attributes relevant to the state are touched.
    pub fn apply_to(self, original: &PrimitiveStyle) -> PrimitiveStyle {
        let mut style = original.clone();
        match self {
            VisualState::Hover => {
                style.stroke_color = Some(HOVER_STROKE);
                style.stroke_width = original.stroke_width * 1.5;
            }
            VisualState::Selected => {
                style.stroke_color = Some(SELECTED_STROKE);
                style.stroke_width = original.stroke_width * 2.0;
            }
            VisualState::Preview => style.opacity = PREVIEW_OPACITY,
            VisualState::Ghost => style.opacity = GHOST_OPACITY,
        }
        style
    }
}

/// Tracks the pre-modification style of every restyled primitive.
#[derive(Debug, Clone, Default)]
pub struct StyleManager {
    originals: HashMap<PrimitiveId, PrimitiveStyle>,
}

impl StyleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put primitives in a visual state.
    ///
    /// The original style is captured on first modification; later states
    /// are always derived from it, so states never compound.
    pub fn apply<S: Substrate>(&mut self, substrate: &mut S, primitives: &[Primitive], state: VisualState) {
        for prim in primitives {
            let original = self
                .originals
                .entry(prim.id())
                .or_insert_with(|| prim.style.clone());
            substrate.set_style(prim.id(), &state.apply_to(original));
        }
    }

    /// Restore primitives to their original style. No-op for untouched ones.
    pub fn restore<S: Substrate>(&mut self, substrate: &mut S, primitives: &[Primitive]) {
        for prim in primitives {
            if let Some(original) = self.originals.remove(&prim.id()) {
                substrate.set_style(prim.id(), &original);
            }
        }
    }

    /// Whether a primitive currently carries a modified style.
    pub fn is_modified(&self, id: PrimitiveId) -> bool {
        self.originals.contains_key(&id)
    }

    /// Drop saved originals for primitives that left the substrate.
    pub fn forget(&mut self, primitives: &[Primitive]) {
        for prim in primitives {
            self.originals.remove(&prim.id());
        }
    }

    pub fn clear(&mut self) {
        self.originals.clear();
    }
}
