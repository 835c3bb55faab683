//! Shared mutable state handed to the controllers.

use super::events::MarkerEvent;
use crate::artwork::ArtworkCache;
use crate::factory::{UnitScales, build_marker_shapes};
use crate::label::LabelManager;
use crate::shapes::Primitive;
use crate::style::StyleManager;
use crate::substrate::Substrate;
use crate::table::{MarkerEntry, MarkerId, MarkerTable};
use kurbo::Point;

pub(crate) struct EngineContext {
    pub table: MarkerTable,
    pub styles: StyleManager,
    pub labels: LabelManager,
    pub artwork: ArtworkCache,
    pub scales: UnitScales,
    /// Notifications waiting to be dispatched to the host callbacks.
    pub events: Vec<MarkerEvent>,
}

impl EngineContext {
    pub fn new(artwork: ArtworkCache, labels: LabelManager, scales: UnitScales) -> Self {
        Self {
            table: MarkerTable::new(),
            styles: StyleManager::new(),
            labels,
            artwork,
            scales: scales.sanitized(),
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: MarkerEvent) {
        self.events.push(event);
    }

    /// Fetch artwork and build primitives at a position.
    pub async fn build_shapes(
        &self,
        artwork_key: &str,
        position: Point,
        rotation_degrees: f64,
    ) -> Option<Vec<Primitive>> {
        let markup = self.artwork.fetch(artwork_key).await;
        build_marker_shapes(markup.as_deref(), position, rotation_degrees, self.scales)
    }

    /// Put a marker's primitives on the substrate and make its label visible.
    pub fn show_marker<S: Substrate>(&mut self, substrate: &mut S, id: MarkerId) {
        let Some(entry) = self.table.get(id) else {
            return;
        };
        substrate.add_primitives(entry.shapes().primitives());
        match entry.label() {
            Some(label) => substrate.set_label_visible(label, true),
            None => self.attach_label(substrate, id),
        }
    }

    /// Take a marker's primitives off the substrate, keeping all its state.
    pub fn hide_marker<S: Substrate>(&mut self, substrate: &mut S, id: MarkerId) {
        let Some(entry) = self.table.get(id) else {
            return;
        };
        substrate.remove_primitives(&entry.shapes().ids());
        if let Some(label) = entry.label() {
            substrate.set_label_visible(label, false);
        }
        self.styles.restore(substrate, entry.shapes().primitives());
    }

    /// Replace a marker's shape set.
    ///
    /// The old primitives leave the substrate before the new ones are added;
    /// the label is re-created on the new first primitive.
    pub fn install_shapes<S: Substrate>(
        &mut self,
        substrate: &mut S,
        id: MarkerId,
        primitives: Vec<Primitive>,
        visible: bool,
    ) {
        let Some(old) = self.table.replace_shapes(id, primitives) else {
            return;
        };
        if visible {
            substrate.remove_primitives(&old.ids());
        }
        self.styles.forget(old.primitives());
        if let Some(label) = self.table.set_label(id, None) {
            substrate.remove_label(label);
        }
        if visible {
            self.show_marker(substrate, id);
        }
    }

    /// Remove a marker entirely.
    pub fn remove_marker<S: Substrate>(&mut self, substrate: &mut S, id: MarkerId, visible: bool) -> Option<MarkerEntry> {
        let entry = self.table.remove(id)?;
        if visible {
            substrate.remove_primitives(&entry.shapes().ids());
        }
        self.styles.forget(entry.shapes().primitives());
        if let Some(label) = entry.label() {
            substrate.remove_label(label);
        }
        Some(entry)
    }

    pub fn set_label_visible<S: Substrate>(&mut self, substrate: &mut S, id: MarkerId, visible: bool) {
        if let Some(label) = self.table.get(id).and_then(MarkerEntry::label) {
            substrate.set_label_visible(label, visible);
        }
    }

    /// Re-apply label styling after a zoom or preference change.
    pub fn restyle_labels<S: Substrate>(&self, substrate: &mut S, hovered: Option<MarkerId>) {
        for entry in self.table.iter() {
            if let Some(label) = entry.label() {
                self.labels
                    .apply_style(substrate, label, hovered == Some(entry.record.id));
            }
        }
    }

    fn attach_label<S: Substrate>(&mut self, substrate: &mut S, id: MarkerId) {
        let Some(entry) = self.table.get(id) else {
            return;
        };
        let (Some(text), Some(anchor)) = (entry.record.data.label.as_deref(), entry.shapes().first()) else {
            return;
        };
        let label = self.labels.create_label(substrate, anchor.id(), text);
        self.table.set_label(id, label);
    }
}

#[cfg(test)]
impl EngineContext {
    /// Context with an empty artwork source and default preferences.
    pub fn detached() -> Self {
        Self::new(
            ArtworkCache::new(crate::artwork::MemoryArtworkSource::new()),
            LabelManager::default(),
            UnitScales::default(),
        )
    }

    /// Insert and display a labelled fallback marker.
    pub fn place<S: Substrate>(&mut self, substrate: &mut S, position: Point) -> MarkerId {
        let primitives = build_marker_shapes(None, position, 0.0, self.scales).unwrap_or_default();
        let record = crate::table::MarkerRecord {
            id: uuid::Uuid::new_v4(),
            data: crate::table::MarkerData::new("p-1", "Chair").with_label("Chair"),
            position,
            rotation_degrees: 0.0,
        };
        let id = record.id;
        self.table.insert(record, primitives);
        self.show_marker(substrate, id);
        id
    }
}
