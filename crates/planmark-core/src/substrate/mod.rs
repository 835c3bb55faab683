//! Host drawing substrate abstraction.
//!
//! The engine never renders anything itself. It hands primitives, styles and
//! labels to a `Substrate` implementation provided by the host (a CAD viewer,
//! a canvas widget, or the in-memory substrate used by tests).

mod memory;

pub use memory::{MemoryLabel, MemorySubstrate};

use crate::shapes::{Primitive, PrimitiveId, PrimitiveStyle};
use kurbo::{Point, Rect};
use uuid::Uuid;

/// Identifier of a text label created by the substrate.
pub type LabelId = Uuid;

/// Visual parameters of a label, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    /// Minimum on-screen font size.
    pub font_size: f64,
    /// Transient scale factor (hover feedback); 1.0 is the baseline.
    pub scale: f64,
}

/// Operations the engine needs from the host drawing surface.
pub trait Substrate {
    /// Whether the substrate is able to host markers at all.
    fn is_ready(&self) -> bool {
        true
    }

    /// Add primitives to the marker display layer.
    fn add_primitives(&mut self, primitives: &[Primitive]);

    /// Remove primitives from the display layer. Unknown ids are ignored.
    fn remove_primitives(&mut self, ids: &[PrimitiveId]);

    /// Replace the style of a displayed primitive.
    fn set_style(&mut self, id: PrimitiveId, style: &PrimitiveStyle);

    /// Current bounding box of a displayed primitive, in page coordinates.
    ///
    /// This reflects host-side changes such as native drag gestures.
    fn primitive_bounds(&self, id: PrimitiveId) -> Option<Rect>;

    /// Primitives currently in the host's native selection.
    fn selection(&self) -> Vec<PrimitiveId>;

    /// Clear the native selection.
    ///
    /// Returns true when the selection changed, in which case the host will
    /// deliver one selection-changed notification for it.
    fn clear_selection(&mut self) -> bool;

    /// Topmost primitive under a screen point.
    fn hit_test(&self, screen_point: Point) -> Option<PrimitiveId>;

    /// Attach a text label to a primitive. `None` if the host cannot.
    fn create_label(&mut self, anchor: PrimitiveId, text: &str) -> Option<LabelId>;

    fn remove_label(&mut self, id: LabelId);

    fn set_label_visible(&mut self, id: LabelId, visible: bool);

    fn style_label(&mut self, id: LabelId, style: LabelStyle);

    /// Flush batched changes to the screen.
    fn request_redraw(&mut self) {}
}
