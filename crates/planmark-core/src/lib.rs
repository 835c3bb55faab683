//! PlanMark Core Library
//!
//! Product-symbol marker overlay engine for 2D CAD floor plans. Host-agnostic:
//! drawing, hit testing and native selection are reached through the
//! [`Substrate`] trait.

pub mod artwork;
pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod label;
pub mod movement;
pub mod selection;
pub mod shapes;
pub mod shortcuts;
pub mod style;
pub mod substrate;
pub mod table;
pub mod throttle;
pub mod visibility;

pub use artwork::{Artwork, ArtworkCache, ArtworkSource, MemoryArtworkSource};
#[cfg(not(target_arch = "wasm32"))]
pub use artwork::FileArtworkSource;
pub use config::EngineConfig;
pub use engine::{MarkerCallbacks, MarkerEngine, MarkerEvent, Placement};
pub use error::{ArtworkError, ConfigError};
pub use factory::{UnitScales, build_marker_shapes};
pub use shapes::{Primitive, PrimitiveGeometry, PrimitiveId, PrimitiveStyle, SerializableColor};
pub use shortcuts::{KeyInput, ShortcutRegistry};
pub use substrate::{LabelId, LabelStyle, MemorySubstrate, Substrate};
pub use table::{MarkerData, MarkerId, MarkerRecord};
