//! In-memory substrate implementation.

use super::{LabelId, LabelStyle, Substrate};
use crate::shapes::{Primitive, PrimitiveId, PrimitiveStyle};
use kurbo::{Point, Rect, Vec2};
use std::collections::HashMap;
use uuid::Uuid;

/// A label held by the in-memory substrate.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryLabel {
    pub anchor: PrimitiveId,
    pub text: String,
    pub visible: bool,
    pub style: Option<LabelStyle>,
}

/// In-memory substrate for testing and headless use.
///
/// Keeps the display layer in insertion order, tracks the native selection
/// and counts calls so tests can assert on the work the engine issued.
#[derive(Debug, Clone)]
pub struct MemorySubstrate {
    ready: bool,
    supports_labels: bool,
    layer: HashMap<PrimitiveId, Primitive>,
    order: Vec<PrimitiveId>,
    selection: Vec<PrimitiveId>,
    labels: HashMap<LabelId, MemoryLabel>,
    /// Screen pixels per page unit.
    pub zoom: f64,
    /// Screen position of the page origin.
    pub pan: Vec2,
    add_calls: usize,
    remove_calls: usize,
    redraws: usize,
}

impl Default for MemorySubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySubstrate {
    /// Create a ready substrate with an identity camera.
    pub fn new() -> Self {
        Self {
            ready: true,
            supports_labels: true,
            layer: HashMap::new(),
            order: Vec::new(),
            selection: Vec::new(),
            labels: HashMap::new(),
            zoom: 1.0,
            pan: Vec2::ZERO,
            add_calls: 0,
            remove_calls: 0,
            redraws: 0,
        }
    }

    /// A substrate whose host context is missing.
    pub fn unavailable() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    /// A substrate that cannot create labels.
    pub fn without_labels() -> Self {
        Self {
            supports_labels: false,
            ..Self::new()
        }
    }

    /// Get a displayed primitive.
    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.layer.get(&id)
    }

    /// Whether a primitive is on the display layer.
    pub fn contains(&self, id: PrimitiveId) -> bool {
        self.layer.contains_key(&id)
    }

    /// Number of displayed primitives.
    pub fn primitive_count(&self) -> usize {
        self.layer.len()
    }

    /// Get a label.
    pub fn label(&self, id: LabelId) -> Option<&MemoryLabel> {
        self.labels.get(&id)
    }

    /// All labels.
    pub fn labels(&self) -> impl Iterator<Item = (&LabelId, &MemoryLabel)> {
        self.labels.iter()
    }

    /// Number of `add_primitives` calls so far.
    pub fn add_calls(&self) -> usize {
        self.add_calls
    }

    /// Number of `remove_primitives` calls so far.
    pub fn remove_calls(&self) -> usize {
        self.remove_calls
    }

    /// Number of redraw requests so far.
    pub fn redraws(&self) -> usize {
        self.redraws
    }

    /// Simulate the user selecting primitives with the host's own tools.
    pub fn user_select(&mut self, ids: &[PrimitiveId]) {
        self.selection = ids.iter().copied().filter(|id| self.layer.contains_key(id)).collect();
    }

    /// Simulate a host-native drag of primitives.
    pub fn drag_primitives(&mut self, ids: &[PrimitiveId], delta: Vec2) {
        for id in ids {
            if let Some(prim) = self.layer.get_mut(id) {
                prim.translate(delta);
            }
        }
    }

    /// Convert a page point to screen coordinates.
    pub fn page_to_screen(&self, page: Point) -> Point {
        Point::new(page.x * self.zoom, page.y * self.zoom) + self.pan
    }

    fn screen_to_page(&self, screen: Point) -> Point {
        let p = screen - self.pan;
        Point::new(p.x / self.zoom, p.y / self.zoom)
    }
}

impl Substrate for MemorySubstrate {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn add_primitives(&mut self, primitives: &[Primitive]) {
        self.add_calls += 1;
        for prim in primitives {
            if self.layer.insert(prim.id(), prim.clone()).is_none() {
                self.order.push(prim.id());
            }
        }
    }

    fn remove_primitives(&mut self, ids: &[PrimitiveId]) {
        self.remove_calls += 1;
        for id in ids {
            if self.layer.remove(id).is_some() {
                self.order.retain(|p| p != id);
                self.selection.retain(|p| p != id);
            }
        }
    }

    fn set_style(&mut self, id: PrimitiveId, style: &PrimitiveStyle) {
        if let Some(prim) = self.layer.get_mut(&id) {
            prim.style = style.clone();
        }
    }

    fn primitive_bounds(&self, id: PrimitiveId) -> Option<Rect> {
        self.layer.get(&id).map(Primitive::bounds)
    }

    fn selection(&self) -> Vec<PrimitiveId> {
        self.selection.clone()
    }

    fn clear_selection(&mut self) -> bool {
        let changed = !self.selection.is_empty();
        self.selection.clear();
        changed
    }

    fn hit_test(&self, screen_point: Point) -> Option<PrimitiveId> {
        let page = self.screen_to_page(screen_point);
        self.order
            .iter()
            .rev()
            .find(|id| self.layer.get(*id).is_some_and(|p| p.bounds().contains(page)))
            .copied()
    }

    fn create_label(&mut self, anchor: PrimitiveId, text: &str) -> Option<LabelId> {
        if !self.supports_labels || !self.layer.contains_key(&anchor) {
            return None;
        }
        let id = Uuid::new_v4();
        self.labels.insert(
            id,
            MemoryLabel {
                anchor,
                text: text.to_string(),
                visible: true,
                style: None,
            },
        );
        Some(id)
    }

    fn remove_label(&mut self, id: LabelId) {
        self.labels.remove(&id);
    }

    fn set_label_visible(&mut self, id: LabelId, visible: bool) {
        if let Some(label) = self.labels.get_mut(&id) {
            label.visible = visible;
        }
    }

    fn style_label(&mut self, id: LabelId, style: LabelStyle) {
        if let Some(label) = self.labels.get_mut(&id) {
            label.style = Some(style);
        }
    }

    fn request_redraw(&mut self) {
        self.redraws += 1;
    }
}
