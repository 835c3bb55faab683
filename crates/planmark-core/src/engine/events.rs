//! Notifications surfaced to the host.

use crate::table::MarkerId;
use kurbo::Point;

/// A successful state change.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerEvent {
    /// Selection changed; `None` means nothing is selected.
    Selected(Option<MarkerId>),
    Deleted(MarkerId),
    Rotated { id: MarkerId, rotation_degrees: f64 },
    /// The marker's stored position changed.
    Moved { id: MarkerId, position: Point },
    MoveStarted(MarkerId),
    MoveEnded { id: MarkerId, confirmed: bool },
}

/// Host callbacks. Unset callbacks are skipped.
#[derive(Default)]
pub struct MarkerCallbacks {
    pub on_select: Option<Box<dyn FnMut(Option<MarkerId>)>>,
    pub on_delete: Option<Box<dyn FnMut(MarkerId)>>,
    pub on_rotate: Option<Box<dyn FnMut(MarkerId, f64)>>,
    pub on_move: Option<Box<dyn FnMut(MarkerId, Point)>>,
    pub on_move_start: Option<Box<dyn FnMut(MarkerId)>>,
    pub on_move_end: Option<Box<dyn FnMut(MarkerId, bool)>>,
}

impl MarkerCallbacks {
    /// Deliver one event to the matching callback.
    pub fn dispatch(&mut self, event: &MarkerEvent) {
        match *event {
            MarkerEvent::Selected(id) => {
                if let Some(cb) = self.on_select.as_mut() {
                    cb(id);
                }
            }
            MarkerEvent::Deleted(id) => {
                if let Some(cb) = self.on_delete.as_mut() {
                    cb(id);
                }
            }
            MarkerEvent::Rotated { id, rotation_degrees } => {
                if let Some(cb) = self.on_rotate.as_mut() {
                    cb(id, rotation_degrees);
                }
            }
            MarkerEvent::Moved { id, position } => {
                if let Some(cb) = self.on_move.as_mut() {
                    cb(id, position);
                }
            }
            MarkerEvent::MoveStarted(id) => {
                if let Some(cb) = self.on_move_start.as_mut() {
                    cb(id);
                }
            }
            MarkerEvent::MoveEnded { id, confirmed } => {
                if let Some(cb) = self.on_move_end.as_mut() {
                    cb(id, confirmed);
                }
            }
        }
    }
}

impl std::fmt::Debug for MarkerCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerCallbacks")
            .field("on_select", &self.on_select.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_rotate", &self.on_rotate.is_some())
            .field("on_move", &self.on_move.is_some())
            .field("on_move_start", &self.on_move_start.is_some())
            .field("on_move_end", &self.on_move_end.is_some())
            .finish()
    }
}
