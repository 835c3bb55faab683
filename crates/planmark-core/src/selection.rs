//! Selection and hover state, reconciled with the host's native selection.

use crate::engine::{EngineContext, MarkerEvent};
use crate::style::VisualState;
use crate::substrate::Substrate;
use crate::table::MarkerId;
use crate::throttle::{Duration, Instant, Throttle};
use kurbo::Point;

/// Whether the engine is waiting for the echo of its own selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPhase {
    #[default]
    Idle,
    /// The native selection was cleared programmatically and the host has
    /// yet to report it.
    ProgrammaticSelectionInFlight,
}

#[derive(Debug, Clone)]
pub struct SelectionController {
    selected: Option<MarkerId>,
    hovered: Option<MarkerId>,
    phase: SelectionPhase,
    hover_throttle: Throttle,
    displacement_threshold: f64,
}

impl SelectionController {
    pub fn new(hover_interval: Duration, displacement_threshold: f64) -> Self {
        Self {
            selected: None,
            hovered: None,
            phase: SelectionPhase::Idle,
            hover_throttle: Throttle::new(hover_interval),
            displacement_threshold,
        }
    }

    pub fn selected(&self) -> Option<MarkerId> {
        self.selected
    }

    pub fn hovered(&self) -> Option<MarkerId> {
        self.hovered
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    /// Clear the host's native selection, expecting an echo if it changed.
    pub(crate) fn clear_native<S: Substrate>(&mut self, substrate: &mut S) {
        if substrate.clear_selection() {
            self.phase = SelectionPhase::ProgrammaticSelectionInFlight;
        }
    }

    /// React to a selection-changed notification from the host.
    ///
    /// `locked` is a marker that must not be selected (the one being moved).
    pub(crate) fn handle_native_change<S: Substrate>(
        &mut self,
        ctx: &mut EngineContext,
        substrate: &mut S,
        locked: Option<MarkerId>,
    ) {
        let native = substrate.selection();
        if self.phase == SelectionPhase::ProgrammaticSelectionInFlight {
            self.phase = SelectionPhase::Idle;
            if native.is_empty() {
                log::trace!("Consumed selection echo");
                return;
            }
        }

        if let Some(previous) = self.selected {
            self.sync_displacement(ctx, substrate, previous);
        }

        let resolved = native
            .iter()
            .find_map(|prim| ctx.table.owner_of(*prim))
            .filter(|id| Some(*id) != locked);

        match resolved {
            Some(id) => {
                self.select(ctx, substrate, Some(id));
            }
            None if native.is_empty() => {}
            None => {
                self.select(ctx, substrate, None);
            }
        }
        if !native.is_empty() {
            self.clear_native(substrate);
        }
    }

    /// Change the selected marker and emit a notification when it changed.
    pub(crate) fn select<S: Substrate>(
        &mut self,
        ctx: &mut EngineContext,
        substrate: &mut S,
        id: Option<MarkerId>,
    ) -> bool {
        if self.selected == id {
            return false;
        }
        let previous = std::mem::replace(&mut self.selected, id);
        if let Some(previous) = previous {
            self.restyle(ctx, substrate, previous);
        }
        if let Some(id) = id {
            self.restyle(ctx, substrate, id);
        }
        log::debug!("Selected marker {:?}", id);
        ctx.emit(MarkerEvent::Selected(id));
        true
    }

    /// Follow a host-native drag of a marker's primitives.
    ///
    /// Compares the composite bounding box of the displayed primitives with
    /// the center recorded when the shapes were built; beyond the threshold
    /// the stored position and geometry are shifted by the same offset.
    pub(crate) fn sync_displacement<S: Substrate>(
        &self,
        ctx: &mut EngineContext,
        substrate: &S,
        id: MarkerId,
    ) -> bool {
        let Some(entry) = ctx.table.get(id) else {
            return false;
        };
        let Some(bounds) = entry
            .shapes()
            .ids()
            .into_iter()
            .filter_map(|prim| substrate.primitive_bounds(prim))
            .reduce(|acc, r| acc.union(r))
        else {
            return false;
        };
        let offset = bounds.center() - entry.shapes().baseline_center();
        if offset.hypot() <= self.displacement_threshold {
            return false;
        }

        ctx.table.translate_shapes(id, offset);
        let Some(record) = ctx.table.record_mut(id) else {
            return false;
        };
        record.position += offset;
        let position = record.position;
        log::debug!("Marker {} dragged natively to ({}, {})", id, position.x, position.y);
        ctx.emit(MarkerEvent::Moved { id, position });
        true
    }

    /// Throttled hover hit test at a screen point.
    pub(crate) fn handle_pointer_move<S: Substrate>(
        &mut self,
        ctx: &mut EngineContext,
        substrate: &mut S,
        screen_point: Point,
        now: Instant,
        locked: Option<MarkerId>,
    ) -> bool {
        if !self.hover_throttle.ready(now) {
            return false;
        }
        let hit = substrate
            .hit_test(screen_point)
            .and_then(|prim| ctx.table.owner_of(prim))
            .filter(|id| Some(*id) != locked);
        self.set_hovered(ctx, substrate, hit)
    }

    pub(crate) fn set_hovered<S: Substrate>(
        &mut self,
        ctx: &mut EngineContext,
        substrate: &mut S,
        id: Option<MarkerId>,
    ) -> bool {
        if self.hovered == id {
            return false;
        }
        let previous = std::mem::replace(&mut self.hovered, id);
        if let Some(previous) = previous {
            self.restyle(ctx, substrate, previous);
        }
        if let Some(id) = id {
            self.restyle(ctx, substrate, id);
        }
        true
    }

    /// Bring a marker's primitives and label in line with selection and hover.
    ///
    /// Selection wins over hover.
    pub(crate) fn restyle<S: Substrate>(&self, ctx: &mut EngineContext, substrate: &mut S, id: MarkerId) {
        let Some(entry) = ctx.table.get(id) else {
            return;
        };
        let primitives = entry.shapes().primitives();
        let hovered = self.hovered == Some(id);
        if self.selected == Some(id) {
            ctx.styles.apply(substrate, primitives, VisualState::Selected);
        } else if hovered {
            ctx.styles.apply(substrate, primitives, VisualState::Hover);
        } else {
            ctx.styles.restore(substrate, primitives);
        }
        if let Some(label) = entry.label() {
            ctx.labels.apply_style(substrate, label, hovered);
        }
    }

    /// Forget a marker that is going away. Returns true if it was selected.
    pub(crate) fn drop_marker(&mut self, id: MarkerId) -> bool {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        if self.selected == Some(id) {
            self.selected = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn reset(&mut self) {
        self.selected = None;
        self.hovered = None;
        self.phase = SelectionPhase::Idle;
        self.hover_throttle.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{HOVER_STROKE, SELECTED_STROKE};
    use crate::substrate::MemorySubstrate;
    use kurbo::Vec2;

    fn controller() -> SelectionController {
        SelectionController::new(Duration::from_millis(16), 0.1)
    }

    fn stroke_of(substrate: &MemorySubstrate, ctx: &EngineContext, id: MarkerId) -> Option<crate::shapes::SerializableColor> {
        let prim = ctx.table.get(id).unwrap().shapes().first().unwrap().id();
        substrate.primitive(prim).unwrap().style.stroke_color
    }

    #[test]
    fn test_native_selection_resolves_marker() {
        let mut ctx = EngineContext::detached();
        let mut substrate = MemorySubstrate::new();
        let id = ctx.place(&mut substrate, Point::new(100.0, 100.0));
        let mut selection = controller();

        let prim = ctx.table.get(id).unwrap().shapes().ids();
        substrate.user_select(&prim);
        selection.handle_native_change(&mut ctx, &mut substrate, None);

        assert_eq!(selection.selected(), Some(id));
        assert_eq!(ctx.events, vec![MarkerEvent::Selected(Some(id))]);
        assert!(substrate.selection().is_empty());
        assert_eq!(selection.phase(), SelectionPhase::ProgrammaticSelectionInFlight);
        assert_eq!(stroke_of(&substrate, &ctx, id), Some(SELECTED_STROKE));

        // The echo of clearing the native selection changes nothing.
        selection.handle_native_change(&mut ctx, &mut substrate, None);
        assert_eq!(selection.selected(), Some(id));
        assert_eq!(selection.phase(), SelectionPhase::Idle);
        assert_eq!(ctx.events.len(), 1);
    }

    #[test]
    fn test_foreign_primitive_clears_selection() {
        let mut ctx = EngineContext::detached();
        let mut substrate = MemorySubstrate::new();
        let id = ctx.place(&mut substrate, Point::ZERO);
        let mut selection = controller();
        selection.select(&mut ctx, &mut substrate, Some(id));

        let foreign = crate::factory::fallback_primitive(Point::new(500.0, 0.0), ctx.scales);
        substrate.add_primitives(std::slice::from_ref(&foreign));
        substrate.user_select(&[foreign.id()]);
        selection.handle_native_change(&mut ctx, &mut substrate, None);

        assert_eq!(selection.selected(), None);
        assert!(substrate.selection().is_empty());
        assert_eq!(ctx.events.last(), Some(&MarkerEvent::Selected(None)));
    }

    #[test]
    fn test_locked_marker_not_selectable() {
        let mut ctx = EngineContext::detached();
        let mut substrate = MemorySubstrate::new();
        let id = ctx.place(&mut substrate, Point::ZERO);
        let mut selection = controller();

        substrate.user_select(&ctx.table.get(id).unwrap().shapes().ids());
        selection.handle_native_change(&mut ctx, &mut substrate, Some(id));
        assert_eq!(selection.selected(), None);
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn test_native_drag_updates_position() {
        let mut ctx = EngineContext::detached();
        let mut substrate = MemorySubstrate::new();
        let id = ctx.place(&mut substrate, Point::new(10.0, 10.0));
        let mut selection = controller();
        selection.select(&mut ctx, &mut substrate, Some(id));
        ctx.events.clear();

        let ids = ctx.table.get(id).unwrap().shapes().ids();
        substrate.drag_primitives(&ids, Vec2::new(30.0, -5.0));
        substrate.user_select(&[]);
        selection.handle_native_change(&mut ctx, &mut substrate, None);

        let position = ctx.table.record(id).unwrap().position;
        assert!((position.x - 40.0).abs() < 1e-9);
        assert!((position.y - 5.0).abs() < 1e-9);
        assert_eq!(ctx.events, vec![MarkerEvent::Moved { id, position }]);
        // Geometry follows, so a second check reports nothing.
        assert!(!selection.sync_displacement(&mut ctx, &substrate, id));
    }

    #[test]
    fn test_small_displacement_ignored() {
        let mut ctx = EngineContext::detached();
        let mut substrate = MemorySubstrate::new();
        let id = ctx.place(&mut substrate, Point::ZERO);
        let selection = controller();
        let ids = ctx.table.get(id).unwrap().shapes().ids();
        substrate.drag_primitives(&ids, Vec2::new(0.05, 0.0));
        assert!(!selection.sync_displacement(&mut ctx, &substrate, id));
        assert_eq!(ctx.table.record(id).unwrap().position, Point::ZERO);
    }

    #[test]
    fn test_hover_throttled_and_styled() {
        let mut ctx = EngineContext::detached();
        let mut substrate = MemorySubstrate::new();
        let id = ctx.place(&mut substrate, Point::new(100.0, 100.0));
        let mut selection = controller();
        let start = Instant::now();

        assert!(selection.handle_pointer_move(&mut ctx, &mut substrate, Point::new(100.0, 100.0), start, None));
        assert_eq!(selection.hovered(), Some(id));
        assert_eq!(stroke_of(&substrate, &ctx, id), Some(HOVER_STROKE));
        let label = ctx.table.get(id).unwrap().label().unwrap();
        assert!((substrate.label(label).unwrap().style.unwrap().scale - 1.25).abs() < f64::EPSILON);

        // Inside the window the pointer leaving is not seen yet.
        let later = start + Duration::from_millis(5);
        assert!(!selection.handle_pointer_move(&mut ctx, &mut substrate, Point::new(900.0, 900.0), later, None));
        assert_eq!(selection.hovered(), Some(id));

        let after = start + Duration::from_millis(20);
        assert!(selection.handle_pointer_move(&mut ctx, &mut substrate, Point::new(900.0, 900.0), after, None));
        assert_eq!(selection.hovered(), None);
        assert!(!ctx.styles.is_modified(ctx.table.get(id).unwrap().shapes().ids()[0]));
        assert!((substrate.label(label).unwrap().style.unwrap().scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_selection_wins_over_hover() {
        let mut ctx = EngineContext::detached();
        let mut substrate = MemorySubstrate::new();
        let id = ctx.place(&mut substrate, Point::ZERO);
        let mut selection = controller();

        selection.select(&mut ctx, &mut substrate, Some(id));
        selection.set_hovered(&mut ctx, &mut substrate, Some(id));
        assert_eq!(stroke_of(&substrate, &ctx, id), Some(SELECTED_STROKE));

        selection.select(&mut ctx, &mut substrate, None);
        assert_eq!(stroke_of(&substrate, &ctx, id), Some(HOVER_STROKE));
    }
}
