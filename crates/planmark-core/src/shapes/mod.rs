//! Drawable primitives handed to the host substrate.

mod color;

pub use color::parse_color;

use kurbo::{Affine, Arc as KurboArc, Circle, Point, Rect, Shape as KurboShape, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Stroke color used by the fallback circle.
pub const FALLBACK_STROKE: SerializableColor = SerializableColor::new(220, 38, 38, 255);
/// Fill color used by the fallback circle.
pub const FALLBACK_FILL: SerializableColor = SerializableColor::new(254, 202, 202, 255);

/// Style properties of a primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveStyle {
    /// Stroke color (None = no outline).
    pub stroke_color: Option<SerializableColor>,
    /// Stroke width in page units.
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill_color: Option<SerializableColor>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl PrimitiveStyle {
    /// Style of the circle drawn when a marker has no usable artwork.
    pub fn fallback(stroke_width: f64) -> Self {
        Self {
            stroke_color: Some(FALLBACK_STROKE),
            stroke_width,
            fill_color: Some(FALLBACK_FILL),
            opacity: 1.0,
        }
    }

    /// Stroke color with opacity folded into alpha, for renderers that take a
    /// single paint per primitive.
    pub fn stroke_with_opacity(&self) -> Option<Color> {
        self.stroke_color.map(|c| self.apply_opacity(c))
    }

    /// Fill counterpart of [`Self::stroke_with_opacity`].
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill_color.map(|c| self.apply_opacity(c))
    }

    fn apply_opacity(&self, color: SerializableColor) -> Color {
        let alpha = (color.a as f64 * self.opacity.clamp(0.0, 1.0)) as u8;
        Color::from_rgba8(color.r, color.g, color.b, alpha)
    }
}

impl Default for PrimitiveStyle {
    fn default() -> Self {
        Self {
            stroke_color: Some(SerializableColor::black()),
            stroke_width: 1.0,
            fill_color: None,
            opacity: 1.0,
        }
    }
}

/// Unique identifier for primitives.
pub type PrimitiveId = Uuid;

/// Geometry of a single primitive, in page coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveGeometry {
    /// Closed polygon.
    Polygon(Vec<Point>),
    /// Open polyline (a line segment is a two-point polyline).
    Polyline(Vec<Point>),
    /// Circular arc. Angles are in radians.
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        sweep_angle: f64,
    },
    /// Full circle.
    Circle { center: Point, radius: f64 },
}

impl PrimitiveGeometry {
    /// Apply a similarity transform (translate, rotate, uniform scale).
    ///
    /// Arc radii assume a uniform scale; the rotation part of the affine is
    /// folded into the arc's start angle.
    pub fn transformed(&self, affine: Affine) -> Self {
        match self {
            Self::Polygon(points) => Self::Polygon(points.iter().map(|p| affine * *p).collect()),
            Self::Polyline(points) => Self::Polyline(points.iter().map(|p| affine * *p).collect()),
            Self::Arc {
                center,
                radius,
                start_angle,
                sweep_angle,
            } => {
                let [a, b, _, _, _, _] = affine.as_coeffs();
                Self::Arc {
                    center: affine * *center,
                    radius: radius * a.hypot(b),
                    start_angle: start_angle + b.atan2(a),
                    sweep_angle: *sweep_angle,
                }
            }
            Self::Circle { center, radius } => {
                let [a, b, _, _, _, _] = affine.as_coeffs();
                Self::Circle {
                    center: affine * *center,
                    radius: radius * a.hypot(b),
                }
            }
        }
    }

    /// Bounding box of the geometry.
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Polygon(points) | Self::Polyline(points) => points_bounds(points),
            Self::Arc {
                center,
                radius,
                start_angle,
                sweep_angle,
            } => KurboArc {
                center: *center,
                radii: Vec2::new(*radius, *radius),
                start_angle: *start_angle,
                sweep_angle: *sweep_angle,
                x_rotation: 0.0,
            }
            .bounding_box(),
            Self::Circle { center, radius } => Circle::new(*center, *radius).bounding_box(),
        }
    }
}

fn points_bounds(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::ZERO;
    };
    points
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p))
}

/// A drawable primitive: geometry plus style, identified for the substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub(crate) id: PrimitiveId,
    pub geometry: PrimitiveGeometry,
    pub style: PrimitiveStyle,
}

impl Primitive {
    /// Create a primitive with a fresh identifier.
    pub fn new(geometry: PrimitiveGeometry, style: PrimitiveStyle) -> Self {
        Self {
            id: Uuid::new_v4(),
            geometry,
            style,
        }
    }

    pub fn id(&self) -> PrimitiveId {
        self.id
    }

    pub fn bounds(&self) -> Rect {
        self.geometry.bounds()
    }

    /// Move the primitive in place, keeping its identifier.
    pub fn translate(&mut self, delta: Vec2) {
        self.geometry = self.geometry.transformed(Affine::translate(delta));
    }
}

/// Union of the bounding boxes of a set of primitives.
pub fn composite_bounds<'a>(primitives: impl IntoIterator<Item = &'a Primitive>) -> Option<Rect> {
    primitives
        .into_iter()
        .map(Primitive::bounds)
        .reduce(|acc, r| acc.union(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_polygon_bounds() {
        let poly = PrimitiveGeometry::Polygon(vec![
            Point::new(1.0, 2.0),
            Point::new(5.0, -1.0),
            Point::new(3.0, 7.0),
        ]);
        assert_eq!(poly.bounds(), Rect::new(1.0, -1.0, 5.0, 7.0));
    }

    #[test]
    fn test_half_arc_bounds() {
        let arc = PrimitiveGeometry::Arc {
            center: Point::new(0.0, 0.0),
            radius: 10.0,
            start_angle: 0.0,
            sweep_angle: PI,
        };
        let b = arc.bounds();
        assert!((b.x0 + 10.0).abs() < 1e-6);
        assert!((b.x1 - 10.0).abs() < 1e-6);
        assert!(b.y0.abs() < 1e-6);
        assert!((b.y1 - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_arc_transform_folds_rotation_into_angle() {
        let arc = PrimitiveGeometry::Arc {
            center: Point::new(1.0, 0.0),
            radius: 2.0,
            start_angle: 0.0,
            sweep_angle: PI,
        };
        let affine = Affine::rotate(FRAC_PI_2) * Affine::scale(3.0);
        let PrimitiveGeometry::Arc {
            center,
            radius,
            start_angle,
            ..
        } = arc.transformed(affine)
        else {
            panic!("expected arc");
        };
        assert!(center.x.abs() < 1e-9);
        assert!((center.y - 3.0).abs() < 1e-9);
        assert!((radius - 6.0).abs() < 1e-9);
        assert!((start_angle - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_translate_keeps_id() {
        let mut prim = Primitive::new(
            PrimitiveGeometry::Circle {
                center: Point::ZERO,
                radius: 1.0,
            },
            PrimitiveStyle::default(),
        );
        let id = prim.id();
        prim.translate(Vec2::new(4.0, 5.0));
        assert_eq!(prim.id(), id);
        assert_eq!(prim.bounds().center(), Point::new(4.0, 5.0));
    }

    #[test]
    fn test_opacity_applies_to_alpha() {
        let style = PrimitiveStyle {
            opacity: 0.5,
            ..PrimitiveStyle::default()
        };
        let stroke = style.stroke_with_opacity().unwrap().to_rgba8();
        assert_eq!(stroke.a, 127);
    }
}
