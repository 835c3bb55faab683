//! Marker table: records, live shape sets and labels keyed by marker id.
//!
//! The primitive → marker reverse index is private and only changed through
//! the table's own methods, so it always matches shape set membership.

use crate::shapes::{Primitive, PrimitiveId, composite_bounds};
use crate::substrate::LabelId;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for markers.
pub type MarkerId = Uuid;

/// Caller-supplied description of the product a marker represents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerData {
    pub product_id: String,
    /// Product display name; also the artwork key when none is given.
    pub product_name: String,
    /// Symbol group used for bulk visibility.
    #[serde(default)]
    pub group_tag: Option<String>,
    #[serde(default)]
    pub artwork_key: Option<String>,
    /// Label text; no label is drawn when absent.
    #[serde(default)]
    pub label: Option<String>,
}

impl MarkerData {
    pub fn new(product_id: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            ..Self::default()
        }
    }

    pub fn with_group(mut self, tag: impl Into<String>) -> Self {
        self.group_tag = Some(tag.into());
        self
    }

    pub fn with_artwork_key(mut self, key: impl Into<String>) -> Self {
        self.artwork_key = Some(key.into());
        self
    }

    pub fn with_label(mut self, text: impl Into<String>) -> Self {
        self.label = Some(text.into());
        self
    }

    /// Key used to fetch the symbol artwork.
    pub fn resolved_artwork_key(&self) -> &str {
        self.artwork_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .unwrap_or(&self.product_name)
    }
}

/// Identity and semantic state of one placed marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub id: MarkerId,
    #[serde(flatten)]
    pub data: MarkerData,
    /// Position in page coordinates.
    pub position: Point,
    /// Rotation in degrees, within [0, 360).
    pub rotation_degrees: f64,
}

impl MarkerRecord {
    pub fn group_tag(&self) -> Option<&str> {
        self.data.group_tag.as_deref()
    }

    pub fn artwork_key(&self) -> &str {
        self.data.resolved_artwork_key()
    }
}

/// The live primitives of one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSet {
    primitives: Vec<Primitive>,
    /// Composite center when the set was built, for drag detection.
    baseline_center: Point,
}

impl ShapeSet {
    fn new(primitives: Vec<Primitive>) -> Self {
        let baseline_center = composite_bounds(&primitives)
            .map(|r| r.center())
            .unwrap_or(Point::ZERO);
        Self {
            primitives,
            baseline_center,
        }
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn ids(&self) -> Vec<PrimitiveId> {
        self.primitives.iter().map(Primitive::id).collect()
    }

    pub fn first(&self) -> Option<&Primitive> {
        self.primitives.first()
    }

    pub fn baseline_center(&self) -> Point {
        self.baseline_center
    }

    fn translate(&mut self, delta: Vec2) {
        for prim in &mut self.primitives {
            prim.translate(delta);
        }
        self.baseline_center += delta;
    }
}

/// All facets of one marker.
#[derive(Debug, Clone)]
pub struct MarkerEntry {
    pub record: MarkerRecord,
    shapes: ShapeSet,
    label: Option<LabelId>,
}

impl MarkerEntry {
    pub fn shapes(&self) -> &ShapeSet {
        &self.shapes
    }

    pub fn label(&self) -> Option<LabelId> {
        self.label
    }
}

/// Marker storage with a derived reverse index.
#[derive(Debug, Clone, Default)]
pub struct MarkerTable {
    entries: HashMap<MarkerId, MarkerEntry>,
    /// Insertion order, for stable listings.
    order: Vec<MarkerId>,
    owners: HashMap<PrimitiveId, MarkerId>,
}

impl MarkerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new marker. Returns false if the id is already taken.
    pub fn insert(&mut self, record: MarkerRecord, primitives: Vec<Primitive>) -> bool {
        let id = record.id;
        if self.entries.contains_key(&id) {
            return false;
        }
        self.index(id, &primitives);
        self.entries.insert(
            id,
            MarkerEntry {
                record,
                shapes: ShapeSet::new(primitives),
                label: None,
            },
        );
        self.order.push(id);
        true
    }

    /// Remove a marker and its reverse index entries.
    pub fn remove(&mut self, id: MarkerId) -> Option<MarkerEntry> {
        let entry = self.entries.remove(&id)?;
        self.unindex(&entry.shapes.primitives);
        self.order.retain(|m| *m != id);
        Some(entry)
    }

    /// Swap a marker's shape set. Returns the previous one.
    pub fn replace_shapes(&mut self, id: MarkerId, primitives: Vec<Primitive>) -> Option<ShapeSet> {
        if !self.entries.contains_key(&id) {
            return None;
        }
        let new_set = ShapeSet::new(primitives);
        let entry = self.entries.get_mut(&id)?;
        let old = std::mem::replace(&mut entry.shapes, new_set);
        for prim in &old.primitives {
            self.owners.remove(&prim.id());
        }
        let ids: Vec<PrimitiveId> = entry.shapes.ids();
        for prim_id in ids {
            self.owners.insert(prim_id, id);
        }
        Some(old)
    }

    /// Move a marker's stored geometry, keeping primitive ids.
    pub fn translate_shapes(&mut self, id: MarkerId, delta: Vec2) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.shapes.translate(delta);
        }
    }

    /// Attach a label, returning the one it replaces.
    pub fn set_label(&mut self, id: MarkerId, label: Option<LabelId>) -> Option<LabelId> {
        let entry = self.entries.get_mut(&id)?;
        std::mem::replace(&mut entry.label, label)
    }

    pub fn get(&self, id: MarkerId) -> Option<&MarkerEntry> {
        self.entries.get(&id)
    }

    pub fn record(&self, id: MarkerId) -> Option<&MarkerRecord> {
        self.entries.get(&id).map(|e| &e.record)
    }

    pub fn record_mut(&mut self, id: MarkerId) -> Option<&mut MarkerRecord> {
        self.entries.get_mut(&id).map(|e| &mut e.record)
    }

    pub fn contains(&self, id: MarkerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Marker owning a primitive.
    pub fn owner_of(&self, primitive: PrimitiveId) -> Option<MarkerId> {
        self.owners.get(&primitive).copied()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Ids of markers in a symbol group, in insertion order.
    pub fn ids_in_group(&self, tag: &str) -> Vec<MarkerId> {
        self.iter()
            .filter(|e| e.record.group_tag() == Some(tag))
            .map(|e| e.record.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every marker, returning the entries in insertion order.
    pub fn drain(&mut self) -> Vec<MarkerEntry> {
        self.owners.clear();
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .collect()
    }

    fn index(&mut self, id: MarkerId, primitives: &[Primitive]) {
        for prim in primitives {
            if let Some(previous) = self.owners.insert(prim.id(), id) {
                log::warn!("Primitive {} moved from marker {} to {}", prim.id(), previous, id);
            }
        }
    }

    fn unindex(&mut self, primitives: &[Primitive]) {
        for prim in primitives {
            self.owners.remove(&prim.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{PrimitiveGeometry, PrimitiveStyle};

    fn dot(x: f64, y: f64) -> Primitive {
        Primitive::new(
            PrimitiveGeometry::Circle {
                center: Point::new(x, y),
                radius: 1.0,
            },
            PrimitiveStyle::default(),
        )
    }

    fn record(group: Option<&str>) -> MarkerRecord {
        let mut data = MarkerData::new("p1", "Chair");
        data.group_tag = group.map(str::to_string);
        MarkerRecord {
            id: Uuid::new_v4(),
            data,
            position: Point::ZERO,
            rotation_degrees: 0.0,
        }
    }

    #[test]
    fn test_reverse_index_follows_replacement() {
        let mut table = MarkerTable::new();
        let rec = record(None);
        let id = rec.id;
        let old = dot(0.0, 0.0);
        assert!(table.insert(rec, vec![old.clone()]));
        assert_eq!(table.owner_of(old.id()), Some(id));

        let new = dot(5.0, 5.0);
        let previous = table.replace_shapes(id, vec![new.clone()]).unwrap();
        assert_eq!(previous.ids(), vec![old.id()]);
        assert_eq!(table.owner_of(old.id()), None);
        assert_eq!(table.owner_of(new.id()), Some(id));
        assert_eq!(table.get(id).unwrap().shapes().baseline_center(), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = MarkerTable::new();
        let rec = record(None);
        assert!(table.insert(rec.clone(), vec![dot(0.0, 0.0)]));
        assert!(!table.insert(rec, vec![dot(1.0, 1.0)]));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_clears_index() {
        let mut table = MarkerTable::new();
        let rec = record(None);
        let id = rec.id;
        let prim = dot(0.0, 0.0);
        table.insert(rec, vec![prim.clone()]);
        assert!(table.remove(id).is_some());
        assert_eq!(table.owner_of(prim.id()), None);
        assert!(table.is_empty());
        assert!(table.remove(id).is_none());
    }

    #[test]
    fn test_group_listing_in_insertion_order() {
        let mut table = MarkerTable::new();
        let a = record(Some("A1"));
        let b = record(Some("B"));
        let c = record(Some("A1"));
        let (a_id, c_id) = (a.id, c.id);
        table.insert(a, vec![dot(0.0, 0.0)]);
        table.insert(b, vec![dot(0.0, 0.0)]);
        table.insert(c, vec![dot(0.0, 0.0)]);
        assert_eq!(table.ids_in_group("A1"), vec![a_id, c_id]);
    }

    #[test]
    fn test_artwork_key_falls_back_to_name() {
        let data = MarkerData::new("p", "Sofa");
        assert_eq!(data.resolved_artwork_key(), "Sofa");
        assert_eq!(data.with_artwork_key("S-1").resolved_artwork_key(), "S-1");
    }

    #[test]
    fn test_translate_keeps_ids() {
        let mut table = MarkerTable::new();
        let rec = record(None);
        let id = rec.id;
        let prim = dot(0.0, 0.0);
        table.insert(rec, vec![prim.clone()]);
        table.translate_shapes(id, Vec2::new(2.0, 3.0));
        let shapes = table.get(id).unwrap().shapes();
        assert_eq!(shapes.ids(), vec![prim.id()]);
        assert_eq!(shapes.baseline_center(), Point::new(2.0, 3.0));
        assert_eq!(table.owner_of(prim.id()), Some(id));
    }
}
