//! Explicit move-mode: ghost the original, preview at the pointer, then
//! confirm or cancel.

use crate::engine::{EngineContext, MarkerEvent};
use crate::shapes::{Primitive, PrimitiveId};
use crate::style::VisualState;
use crate::substrate::Substrate;
use crate::table::MarkerId;
use crate::throttle::{Duration, Instant, Throttle};
use kurbo::Point;

/// A marker being moved.
#[derive(Debug, Clone)]
pub struct MoveSession {
    marker: MarkerId,
    /// Preview primitives currently on the substrate.
    preview: Vec<Primitive>,
    /// Latest pointer position not yet rendered.
    pending: Option<Point>,
}

impl MoveSession {
    pub fn marker(&self) -> MarkerId {
        self.marker
    }

    pub fn preview(&self) -> &[Primitive] {
        &self.preview
    }

    fn preview_ids(&self) -> Vec<PrimitiveId> {
        self.preview.iter().map(Primitive::id).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub enum MoveState {
    #[default]
    Idle,
    Moving(MoveSession),
}

#[derive(Debug, Clone)]
pub struct MoveController {
    state: MoveState,
    throttle: Throttle,
}

impl MoveController {
    pub fn new(preview_interval: Duration) -> Self {
        Self {
            state: MoveState::Idle,
            throttle: Throttle::new(preview_interval),
        }
    }

    pub fn state(&self) -> &MoveState {
        &self.state
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, MoveState::Moving(_))
    }

    /// Marker currently being moved.
    pub fn marker(&self) -> Option<MarkerId> {
        match &self.state {
            MoveState::Moving(session) => Some(session.marker),
            MoveState::Idle => None,
        }
    }

    /// Enter move-mode for a marker. Fails if a move is already running.
    pub(crate) fn start<S: Substrate>(&mut self, ctx: &mut EngineContext, substrate: &mut S, id: MarkerId) -> bool {
        if self.is_moving() {
            log::debug!("Move already in progress, ignoring start for {}", id);
            return false;
        }
        let Some(entry) = ctx.table.get(id) else {
            return false;
        };
        ctx.styles
            .apply(substrate, entry.shapes().primitives(), VisualState::Ghost);
        ctx.set_label_visible(substrate, id, false);
        self.throttle.reset();
        self.state = MoveState::Moving(MoveSession {
            marker: id,
            preview: Vec::new(),
            pending: None,
        });
        log::debug!("Move started for marker {}", id);
        ctx.emit(MarkerEvent::MoveStarted(id));
        true
    }

    /// Record a pointer position and render it if the throttle window allows.
    pub(crate) async fn update_preview<S: Substrate>(
        &mut self,
        ctx: &mut EngineContext,
        substrate: &mut S,
        point: Point,
        now: Instant,
    ) -> bool {
        let MoveState::Moving(session) = &mut self.state else {
            return false;
        };
        if !point.x.is_finite() || !point.y.is_finite() {
            return false;
        }
        session.pending = Some(point);
        if !self.throttle.ready(now) {
            return false;
        }
        self.render_pending(ctx, substrate).await
    }

    /// Render the latest throttled-away pointer position, if any.
    pub(crate) async fn flush<S: Substrate>(&mut self, ctx: &mut EngineContext, substrate: &mut S) -> bool {
        self.render_pending(ctx, substrate).await
    }

    async fn render_pending<S: Substrate>(&mut self, ctx: &mut EngineContext, substrate: &mut S) -> bool {
        let (marker, point) = match &mut self.state {
            MoveState::Moving(session) => match session.pending.take() {
                Some(point) => (session.marker, point),
                None => return false,
            },
            MoveState::Idle => return false,
        };
        let Some(record) = ctx.table.record(marker) else {
            return false;
        };
        let key = record.artwork_key().to_string();
        let rotation = record.rotation_degrees;

        let Some(mut primitives) = ctx.build_shapes(&key, point, rotation).await else {
            return false;
        };
        let MoveState::Moving(session) = &mut self.state else {
            return false;
        };
        if session.marker != marker {
            return false;
        }
        for prim in &mut primitives {
            prim.style = VisualState::Preview.apply_to(&prim.style);
        }
        if !session.preview.is_empty() {
            substrate.remove_primitives(&session.preview_ids());
        }
        substrate.add_primitives(&primitives);
        session.preview = primitives;
        true
    }

    /// Finish the move at `point`.
    ///
    /// A marker deleted mid-move, a non-finite point or a failed rebuild
    /// end the move as cancelled.
    pub(crate) async fn confirm<S: Substrate>(
        &mut self,
        ctx: &mut EngineContext,
        substrate: &mut S,
        point: Point,
    ) -> bool {
        let MoveState::Moving(session) = std::mem::take(&mut self.state) else {
            return false;
        };
        let marker = session.marker;
        if !session.preview.is_empty() {
            substrate.remove_primitives(&session.preview_ids());
        }

        let Some(record) = ctx.table.record(marker) else {
            log::warn!("Marker {} was deleted during its move", marker);
            ctx.emit(MarkerEvent::MoveEnded {
                id: marker,
                confirmed: false,
            });
            return false;
        };
        let key = record.artwork_key().to_string();
        let rotation = record.rotation_degrees;

        let built = if point.x.is_finite() && point.y.is_finite() {
            ctx.build_shapes(&key, point, rotation).await
        } else {
            None
        };
        let Some(primitives) = built.filter(|_| ctx.table.contains(marker)) else {
            log::warn!("Could not rebuild marker {} at its new position", marker);
            restore(ctx, substrate, marker);
            ctx.emit(MarkerEvent::MoveEnded {
                id: marker,
                confirmed: false,
            });
            return false;
        };

        ctx.install_shapes(substrate, marker, primitives, true);
        if let Some(record) = ctx.table.record_mut(marker) {
            record.position = point;
        }
        log::debug!("Marker {} moved to ({}, {})", marker, point.x, point.y);
        ctx.emit(MarkerEvent::Moved {
            id: marker,
            position: point,
        });
        ctx.emit(MarkerEvent::MoveEnded {
            id: marker,
            confirmed: true,
        });
        true
    }

    /// Leave move-mode, restoring the original. No-op when idle.
    pub(crate) fn cancel<S: Substrate>(&mut self, ctx: &mut EngineContext, substrate: &mut S) -> Option<MarkerId> {
        let MoveState::Moving(session) = std::mem::take(&mut self.state) else {
            return None;
        };
        if !session.preview.is_empty() {
            substrate.remove_primitives(&session.preview_ids());
        }
        restore(ctx, substrate, session.marker);
        log::debug!("Move cancelled for marker {}", session.marker);
        ctx.emit(MarkerEvent::MoveEnded {
            id: session.marker,
            confirmed: false,
        });
        Some(session.marker)
    }

    /// Drop the session without touching the marker, e.g. when everything
    /// is being removed.
    pub(crate) fn abort<S: Substrate>(&mut self, substrate: &mut S) {
        if let MoveState::Moving(session) = std::mem::take(&mut self.state) {
            if !session.preview.is_empty() {
                substrate.remove_primitives(&session.preview_ids());
            }
        }
    }
}

/// Undo the ghosting of a marker's original shapes.
fn restore<S: Substrate>(ctx: &mut EngineContext, substrate: &mut S, id: MarkerId) {
    if let Some(entry) = ctx.table.get(id) {
        ctx.styles.restore(substrate, entry.shapes().primitives());
    }
    ctx.set_label_visible(substrate, id, true);
}
