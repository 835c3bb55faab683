//! Vector symbol artwork: model, markup parser, sources and cache.

mod cache;
mod parser;
mod source;

pub use cache::ArtworkCache;
pub use source::{ArtworkSource, MemoryArtworkSource, SourceFuture};

#[cfg(not(target_arch = "wasm32"))]
pub use source::FileArtworkSource;

use crate::error::ArtworkError;
use crate::shapes::{PrimitiveGeometry, PrimitiveStyle};
use kurbo::{Point, Rect};

/// Physical size, in millimeters, of the largest extent of design-space artwork.
pub const DESIGN_SYMBOL_SIZE_MM: f64 = 500.0;

/// Nominal extent of the abstract design space.
pub const DESIGN_SPACE_EXTENT: f64 = 100.0;

/// Unit convention declared by a piece of artwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitConvention {
    /// One artwork unit is one physical millimeter.
    Millimeters,
    /// Abstract 100-unit design space, mapped to `DESIGN_SYMBOL_SIZE_MM`.
    #[default]
    DesignSpace,
}

/// A single drawable element of the artwork, in artwork units.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtworkElement {
    pub geometry: PrimitiveGeometry,
    pub style: PrimitiveStyle,
}

/// Parsed vector artwork.
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    /// Declared bounding box.
    pub view_box: Rect,
    /// Declared unit convention.
    pub units: UnitConvention,
    /// Drawable elements in document order.
    pub elements: Vec<ArtworkElement>,
}

impl Artwork {
    /// Parse artwork markup.
    pub fn parse(markup: &str) -> Result<Self, ArtworkError> {
        parser::parse(markup)
    }

    /// Geometric center of the drawn elements, or of the declared box when
    /// nothing is drawn.
    pub fn center(&self) -> Point {
        self.elements
            .iter()
            .map(|e| e.geometry.bounds())
            .reduce(|acc, r| acc.union(r))
            .unwrap_or(self.view_box)
            .center()
    }

    /// Physical millimeters represented by one artwork unit.
    pub fn mm_per_unit(&self) -> f64 {
        match self.units {
            UnitConvention::Millimeters => 1.0,
            UnitConvention::DesignSpace => {
                let extent = self.view_box.width().max(self.view_box.height());
                let extent = if extent > f64::EPSILON {
                    extent
                } else {
                    DESIGN_SPACE_EXTENT
                };
                DESIGN_SYMBOL_SIZE_MM / extent
            }
        }
    }
}
