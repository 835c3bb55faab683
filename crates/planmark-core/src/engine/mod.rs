//! Marker engine: owns marker state and exposes the host-facing operations.
//!
//! Every public operation absorbs its failures (logged, reported as `false`
//! or `None`) and finishes with one batched redraw followed by dispatch of
//! the notifications it produced.

mod context;
mod events;

pub(crate) use context::EngineContext;
pub use events::{MarkerCallbacks, MarkerEvent};

use crate::artwork::{ArtworkCache, ArtworkSource};
use crate::config::EngineConfig;
use crate::factory::{UnitScales, normalize_degrees};
use crate::label::LabelManager;
use crate::movement::MoveController;
use crate::selection::SelectionController;
use crate::shapes::{Primitive, PrimitiveId};
use crate::shortcuts::{self, KeyInput, MarkerAction};
use crate::substrate::Substrate;
use crate::table::{MarkerData, MarkerId, MarkerRecord};
use crate::throttle::Instant;
use crate::visibility::VisibilityController;
use futures_util::future::join_all;
use kurbo::Point;
use std::collections::BTreeSet;
use uuid::Uuid;

/// One marker to place.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub position: Point,
    pub data: MarkerData,
    /// Caller-chosen id; a fresh one is generated when absent.
    pub id: Option<MarkerId>,
    pub rotation_degrees: Option<f64>,
}

impl Placement {
    pub fn new(x: f64, y: f64, data: MarkerData) -> Self {
        Self {
            position: Point::new(x, y),
            data,
            id: None,
            rotation_degrees: None,
        }
    }

    pub fn with_id(mut self, id: MarkerId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = Some(degrees);
        self
    }
}

/// The marker overlay engine.
pub struct MarkerEngine<S: Substrate> {
    substrate: Option<S>,
    ctx: EngineContext,
    selection: SelectionController,
    movement: MoveController,
    visibility: VisibilityController,
    callbacks: MarkerCallbacks,
    config: EngineConfig,
}

impl<S: Substrate> MarkerEngine<S> {
    /// Create an engine. It stays inert until [`initialize`](Self::initialize).
    pub fn new(source: impl ArtworkSource + 'static, config: EngineConfig) -> Self {
        let config = match config.validated() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid engine configuration, using defaults: {}", e);
                EngineConfig::default()
            }
        };
        Self {
            substrate: None,
            ctx: EngineContext::new(
                ArtworkCache::new(source),
                LabelManager::new(config.min_screen_px, config.hover_label_scale),
                config.unit_scales,
            ),
            selection: SelectionController::new(config.hover_interval(), config.displacement_threshold),
            movement: MoveController::new(config.move_preview_interval()),
            visibility: VisibilityController::new(),
            callbacks: MarkerCallbacks::default(),
            config,
        }
    }

    /// Attach the host substrate. Returns false, leaving the engine inert,
    /// when the substrate is not usable.
    pub fn initialize(&mut self, substrate: S) -> bool {
        if !substrate.is_ready() {
            log::error!("Drawing substrate unavailable, marker engine stays inert");
            return false;
        }
        if self.substrate.is_some() {
            log::warn!("Marker engine re-initialized, dropping existing markers");
            self.clear_all();
        }
        self.substrate = Some(substrate);
        log::info!("Marker engine initialized");
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.substrate.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn substrate(&self) -> Option<&S> {
        self.substrate.as_ref()
    }

    pub fn substrate_mut(&mut self) -> Option<&mut S> {
        self.substrate.as_mut()
    }

    pub fn artwork(&self) -> &ArtworkCache {
        &self.ctx.artwork
    }

    pub fn set_callbacks(&mut self, callbacks: MarkerCallbacks) {
        self.callbacks = callbacks;
    }

    /// Place a marker. `None` means placement failed and no callbacks follow.
    pub async fn add_marker(
        &mut self,
        x: f64,
        y: f64,
        data: MarkerData,
        id: Option<MarkerId>,
        rotation_degrees: Option<f64>,
    ) -> Option<MarkerId> {
        let placement = Placement {
            position: Point::new(x, y),
            data,
            id,
            rotation_degrees,
        };
        let placed = self.add_markers(vec![placement]).await;
        placed.into_iter().next().flatten()
    }

    /// Place several markers, fetching their artwork concurrently.
    ///
    /// Placements sharing an artwork key share one fetch; each gets its own
    /// shape set. Results are in input order.
    pub async fn add_markers(&mut self, placements: Vec<Placement>) -> Vec<Option<MarkerId>> {
        if self.substrate.is_none() {
            log::warn!("Cannot add markers before the engine is initialized");
            return vec![None; placements.len()];
        }

        let ctx = &self.ctx;
        let builds = join_all(placements.iter().map(|p| {
            let rotation = normalize_degrees(p.rotation_degrees.unwrap_or(0.0));
            async move {
                let shapes = ctx
                    .build_shapes(p.data.resolved_artwork_key(), p.position, rotation)
                    .await;
                (shapes, rotation)
            }
        }))
        .await;

        let placed = placements
            .into_iter()
            .zip(builds)
            .map(|(placement, (shapes, rotation))| self.install_marker(placement, shapes, rotation))
            .collect();
        self.finish();
        placed
    }

    fn install_marker(
        &mut self,
        placement: Placement,
        shapes: Option<Vec<Primitive>>,
        rotation_degrees: f64,
    ) -> Option<MarkerId> {
        let substrate = self.substrate.as_mut()?;
        let Some(primitives) = shapes else {
            log::error!("No shapes for product {}, placement failed", placement.data.product_id);
            return None;
        };
        let id = placement.id.unwrap_or_else(Uuid::new_v4);
        let record = MarkerRecord {
            id,
            data: placement.data,
            position: placement.position,
            rotation_degrees,
        };
        let visible = self.visibility.is_visible(&record);
        if !self.ctx.table.insert(record, primitives) {
            log::warn!("Marker {} already exists, placement ignored", id);
            return None;
        }
        if visible {
            self.ctx.show_marker(substrate, id);
        }
        log::debug!("Placed marker {}", id);
        Some(id)
    }

    /// Programmatic selection; `None` clears it.
    pub fn select_marker(&mut self, id: Option<MarkerId>) -> bool {
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        if let Some(id) = id {
            let selectable = self
                .ctx
                .table
                .record(id)
                .is_some_and(|r| self.visibility.is_visible(r))
                && self.movement.marker() != Some(id);
            if !selectable {
                return false;
            }
        }
        self.selection.select(&mut self.ctx, substrate, id);
        self.selection.clear_native(substrate);
        self.finish();
        true
    }

    pub fn delete_marker(&mut self, id: MarkerId) -> bool {
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        let Some(record) = self.ctx.table.record(id) else {
            return false;
        };
        let visible = self.visibility.is_visible(record);
        if self.movement.marker() == Some(id) {
            self.movement.cancel(&mut self.ctx, substrate);
        }
        self.selection.drop_marker(id);
        self.ctx.remove_marker(substrate, id, visible);
        log::debug!("Deleted marker {}", id);
        self.ctx.emit(MarkerEvent::Deleted(id));
        self.finish();
        true
    }

    pub fn delete_selected(&mut self) -> bool {
        match self.selection.selected() {
            Some(id) => self.delete_marker(id),
            None => false,
        }
    }

    /// Rotate a marker by a relative angle. A marker in move-mode is left alone.
    pub async fn rotate_marker(&mut self, id: MarkerId, delta_degrees: f64) -> bool {
        if !delta_degrees.is_finite() || self.movement.marker() == Some(id) {
            return false;
        }
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        self.selection.sync_displacement(&mut self.ctx, substrate, id);
        let Some(record) = self.ctx.table.record(id) else {
            return false;
        };
        let rotation = normalize_degrees(record.rotation_degrees + delta_degrees);
        let position = record.position;
        let key = record.artwork_key().to_string();
        let visible = self.visibility.is_visible(record);

        let Some(primitives) = self.ctx.build_shapes(&key, position, rotation).await else {
            return false;
        };
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        if !self.ctx.table.contains(id) {
            log::debug!("Marker {} deleted while its rotation was built", id);
            return false;
        }
        self.ctx.install_shapes(substrate, id, primitives, visible);
        if let Some(record) = self.ctx.table.record_mut(id) {
            record.rotation_degrees = rotation;
        }
        self.selection.restyle(&mut self.ctx, substrate, id);
        self.ctx.emit(MarkerEvent::Rotated {
            id,
            rotation_degrees: rotation,
        });
        self.finish();
        true
    }

    /// Enter move-mode. The marker is deselected while it moves.
    pub fn start_move(&mut self, id: MarkerId) -> bool {
        if self.movement.is_moving() {
            return false;
        }
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        if !self
            .ctx
            .table
            .record(id)
            .is_some_and(|r| self.visibility.is_visible(r))
        {
            return false;
        }
        self.selection.sync_displacement(&mut self.ctx, substrate, id);
        self.selection.select(&mut self.ctx, substrate, None);
        self.selection.clear_native(substrate);
        if self.selection.hovered() == Some(id) {
            self.selection.set_hovered(&mut self.ctx, substrate, None);
        }
        let started = self.movement.start(&mut self.ctx, substrate, id);
        self.finish();
        started
    }

    /// Leave move-mode and re-select the marker. No-op when not moving.
    pub fn cancel_move(&mut self) -> bool {
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        let Some(id) = self.movement.cancel(&mut self.ctx, substrate) else {
            return false;
        };
        if self.ctx.table.contains(id) {
            self.selection.select(&mut self.ctx, substrate, Some(id));
        }
        self.finish();
        true
    }

    /// Finish the move at `(x, y)`. Selection is cleared whatever the outcome.
    pub async fn confirm_move(&mut self, x: f64, y: f64) -> bool {
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        if !self.movement.is_moving() {
            return false;
        }
        let confirmed = self
            .movement
            .confirm(&mut self.ctx, substrate, Point::new(x, y))
            .await;
        self.selection.select(&mut self.ctx, substrate, None);
        self.finish();
        confirmed
    }

    pub async fn update_move_preview(&mut self, x: f64, y: f64) -> bool {
        self.update_move_preview_at(x, y, Instant::now()).await
    }

    /// Throttled preview update with an explicit clock reading.
    pub async fn update_move_preview_at(&mut self, x: f64, y: f64, now: Instant) -> bool {
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        let rendered = self
            .movement
            .update_preview(&mut self.ctx, substrate, Point::new(x, y), now)
            .await;
        if rendered {
            self.finish();
        }
        rendered
    }

    /// Render a preview position that was throttled away.
    pub async fn flush_move_preview(&mut self) -> bool {
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        let rendered = self.movement.flush(&mut self.ctx, substrate).await;
        if rendered {
            self.finish();
        }
        rendered
    }

    /// Hide every marker of a symbol group. Returns false if already hidden.
    pub fn hide_symbol_group(&mut self, tag: &str) -> bool {
        let changed = self.hide_group(tag);
        if changed {
            self.finish();
        }
        changed
    }

    /// Show every marker of a symbol group. Returns false if not hidden.
    pub fn show_symbol_group(&mut self, tag: &str) -> bool {
        let changed = self.show_group(tag);
        if changed {
            self.finish();
        }
        changed
    }

    /// Make exactly `groups` hidden, toggling only groups whose state differs.
    pub fn apply_hidden_groups<I, T>(&mut self, groups: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let desired: BTreeSet<String> = groups.into_iter().map(Into::into).collect();
        let (to_show, to_hide) = self.visibility.diff(&desired);
        if to_show.is_empty() && to_hide.is_empty() {
            return;
        }
        for tag in &to_show {
            self.show_group(tag);
        }
        for tag in &to_hide {
            self.hide_group(tag);
        }
        self.finish();
    }

    fn hide_group(&mut self, tag: &str) -> bool {
        if self.visibility.is_group_hidden(tag) {
            return false;
        }
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        let members = self.ctx.table.ids_in_group(tag);
        if let Some(moving) = self.movement.marker().filter(|id| members.contains(id)) {
            log::debug!("Cancelling move of hidden marker {}", moving);
            self.movement.cancel(&mut self.ctx, substrate);
        }
        if self.selection.selected().is_some_and(|id| members.contains(&id)) {
            self.selection.select(&mut self.ctx, substrate, None);
        }
        if self.selection.hovered().is_some_and(|id| members.contains(&id)) {
            self.selection.set_hovered(&mut self.ctx, substrate, None);
        }
        self.visibility.hide(&mut self.ctx, substrate, tag)
    }

    fn show_group(&mut self, tag: &str) -> bool {
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        self.visibility.show(&mut self.ctx, substrate, tag)
    }

    /// Change unit scales. Existing markers keep their geometry.
    pub fn set_unit_scales(&mut self, model_to_page: f64, mm_to_model: f64) {
        self.ctx.scales = UnitScales::new(model_to_page, mm_to_model);
        self.config.unit_scales = self.ctx.scales;
    }

    /// Change the minimum on-screen marker size and restyle every label.
    pub fn set_min_screen_px(&mut self, px: f64) {
        self.ctx.labels.set_min_screen_px(px);
        self.config.min_screen_px = self.ctx.labels.min_screen_px();
        self.handle_camera_settled();
    }

    /// The host camera stopped moving: recompute label styling.
    pub fn handle_camera_settled(&mut self) {
        let Some(substrate) = self.substrate.as_mut() else {
            return;
        };
        self.ctx.restyle_labels(substrate, self.selection.hovered());
        self.finish();
    }

    /// The host's native selection changed.
    pub fn handle_selection_changed(&mut self) {
        let Some(substrate) = self.substrate.as_mut() else {
            return;
        };
        self.selection
            .handle_native_change(&mut self.ctx, substrate, self.movement.marker());
        self.finish();
    }

    pub fn handle_pointer_move(&mut self, screen_point: Point) -> bool {
        self.handle_pointer_move_at(screen_point, Instant::now())
    }

    /// Throttled hover update with an explicit clock reading.
    pub fn handle_pointer_move_at(&mut self, screen_point: Point, now: Instant) -> bool {
        let Some(substrate) = self.substrate.as_mut() else {
            return false;
        };
        let changed = self.selection.handle_pointer_move(
            &mut self.ctx,
            substrate,
            screen_point,
            now,
            self.movement.marker(),
        );
        if changed {
            self.finish();
        }
        changed
    }

    /// Apply marker keyboard shortcuts. Returns true when the key was used,
    /// in which case the host should stop propagating it.
    pub async fn handle_key(&mut self, input: KeyInput<'_>) -> bool {
        if self.substrate.is_none() {
            return false;
        }
        let selected = self.selection.selected();
        let Some(action) = shortcuts::resolve(
            input,
            selected.is_some(),
            self.movement.is_moving(),
            self.config.rotation_step_degrees,
        ) else {
            return false;
        };
        log::debug!("Key {:?} -> {:?}", input.key, action);
        match (action, selected) {
            (MarkerAction::DeleteSelected, _) => self.delete_selected(),
            (MarkerAction::RotateSelected(step), Some(id)) => self.rotate_marker(id, step).await,
            (MarkerAction::StartMove, Some(id)) => self.start_move(id),
            (MarkerAction::CancelMove, _) => self.cancel_move(),
            _ => false,
        }
    }

    /// All marker records, in placement order.
    pub fn get_all_markers(&self) -> Vec<MarkerRecord> {
        self.ctx.table.iter().map(|e| e.record.clone()).collect()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&MarkerRecord> {
        self.ctx.table.record(id)
    }

    /// Ids of a marker's live primitives.
    pub fn marker_primitives(&self, id: MarkerId) -> Vec<PrimitiveId> {
        self.ctx
            .table
            .get(id)
            .map(|e| e.shapes().ids())
            .unwrap_or_default()
    }

    /// Marker owning a primitive, if any.
    pub fn marker_for_primitive(&self, primitive: PrimitiveId) -> Option<MarkerId> {
        self.ctx.table.owner_of(primitive)
    }

    pub fn selected_marker(&self) -> Option<MarkerId> {
        self.selection.selected()
    }

    pub fn hovered_marker(&self) -> Option<MarkerId> {
        self.selection.hovered()
    }

    pub fn is_moving(&self) -> bool {
        self.movement.is_moving()
    }

    pub fn moving_marker(&self) -> Option<MarkerId> {
        self.movement.marker()
    }

    pub fn hidden_groups(&self) -> &BTreeSet<String> {
        self.visibility.hidden_groups()
    }

    /// Serialize every marker record for caller-side persistence.
    pub fn markers_to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.get_all_markers())
    }

    /// Remove every marker. Emits no per-marker notifications.
    pub fn clear_all(&mut self) {
        let Some(substrate) = self.substrate.as_mut() else {
            return;
        };
        self.movement.abort(substrate);
        let entries = self.ctx.table.drain();
        for entry in &entries {
            if self.visibility.is_visible(&entry.record) {
                substrate.remove_primitives(&entry.shapes().ids());
            }
            if let Some(label) = entry.label() {
                substrate.remove_label(label);
            }
        }
        self.selection.reset();
        self.ctx.styles.clear();
        log::debug!("Cleared {} markers", entries.len());
        self.finish();
    }

    /// Tear down: remove all markers, drop callbacks and hand the substrate
    /// back. The engine is inert afterwards.
    pub fn dispose(&mut self) -> Option<S> {
        self.clear_all();
        self.visibility.clear();
        self.callbacks = MarkerCallbacks::default();
        self.ctx.events.clear();
        self.substrate.take()
    }

    /// Flush substrate changes and deliver queued notifications.
    fn finish(&mut self) {
        if let Some(substrate) = self.substrate.as_mut() {
            substrate.request_redraw();
        }
        for event in std::mem::take(&mut self.ctx.events) {
            self.callbacks.dispatch(&event);
        }
    }
}
