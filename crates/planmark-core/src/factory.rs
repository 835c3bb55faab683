//! Shape factory: artwork to page-space primitives.

use crate::artwork::Artwork;
use crate::shapes::{Primitive, PrimitiveGeometry, PrimitiveStyle};
use kurbo::{Affine, Point};
use serde::{Deserialize, Serialize};

/// Radius of the fallback circle, in millimeters.
pub const FALLBACK_RADIUS_MM: f64 = 50.0;

/// Stroke width of the fallback circle relative to its radius.
const FALLBACK_STROKE_RATIO: f64 = 0.08;

/// Scale factors between real-world units, the drawing model and the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitScales {
    /// Page units per model unit.
    pub model_to_page: f64,
    /// Model units per millimeter.
    pub mm_to_model: f64,
}

impl Default for UnitScales {
    fn default() -> Self {
        Self {
            model_to_page: 1.0,
            mm_to_model: 1.0,
        }
    }
}

impl UnitScales {
    pub fn new(model_to_page: f64, mm_to_model: f64) -> Self {
        Self {
            model_to_page,
            mm_to_model,
        }
        .sanitized()
    }

    /// Replace zero, negative or non-finite factors by 1.
    pub fn sanitized(self) -> Self {
        let guard = |value: f64, name: &str| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                log::warn!("Invalid unit scale {} = {}, using 1", name, value);
                1.0
            }
        };
        Self {
            model_to_page: guard(self.model_to_page, "model_to_page"),
            mm_to_model: guard(self.mm_to_model, "mm_to_model"),
        }
    }

    /// Page units per millimeter.
    pub fn page_per_mm(&self) -> f64 {
        let s = self.sanitized();
        s.mm_to_model * s.model_to_page
    }
}

/// Build the primitives for a marker placed at `target`.
///
/// Absent or malformed artwork degrades to a single fallback circle. Returns
/// `None` only when not even the fallback can be produced.
pub fn build_marker_shapes(
    markup: Option<&str>,
    target: Point,
    rotation_degrees: f64,
    scales: UnitScales,
) -> Option<Vec<Primitive>> {
    if !target.x.is_finite() || !target.y.is_finite() || !rotation_degrees.is_finite() {
        log::error!(
            "Cannot build marker shapes at ({}, {}) rotated {}",
            target.x,
            target.y,
            rotation_degrees
        );
        return None;
    }

    let artwork = markup.and_then(|m| match Artwork::parse(m) {
        Ok(artwork) => Some(artwork),
        Err(e) => {
            log::warn!("Falling back to placeholder symbol: {}", e);
            None
        }
    });

    if let Some(artwork) = artwork {
        let primitives = artwork_primitives(&artwork, target, rotation_degrees, scales);
        if !primitives.is_empty() {
            return Some(primitives);
        }
        log::warn!("Artwork has no drawable elements, using placeholder symbol");
    }

    Some(vec![fallback_primitive(target, scales)])
}

/// Transform every artwork element into page space.
pub fn artwork_primitives(
    artwork: &Artwork,
    target: Point,
    rotation_degrees: f64,
    scales: UnitScales,
) -> Vec<Primitive> {
    let scale = artwork.mm_per_unit() * scales.page_per_mm();
    let transform = marker_transform(artwork.center(), target, rotation_degrees, scale);
    artwork
        .elements
        .iter()
        .map(|element| {
            let style = PrimitiveStyle {
                stroke_width: element.style.stroke_width * scale,
                ..element.style.clone()
            };
            Primitive::new(element.geometry.transformed(transform), style)
        })
        .collect()
}

/// Point transform: recenter, scale, rotate about the center, move to target.
pub fn marker_transform(center: Point, target: Point, rotation_degrees: f64, scale: f64) -> Affine {
    Affine::translate(target.to_vec2())
        * Affine::rotate(rotation_degrees.to_radians())
        * Affine::scale(scale)
        * Affine::translate(-center.to_vec2())
}

/// The circle drawn for markers without usable artwork.
pub fn fallback_primitive(target: Point, scales: UnitScales) -> Primitive {
    let radius = FALLBACK_RADIUS_MM * scales.page_per_mm();
    Primitive::new(
        PrimitiveGeometry::Circle {
            center: target,
            radius,
        },
        PrimitiveStyle::fallback(radius * FALLBACK_STROKE_RATIO),
    )
}

/// Normalize an angle in degrees into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if normalized >= 360.0 { 0.0 } else { normalized }
}
