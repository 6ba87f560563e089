//! Soil coverage lookup.
//!
//! Loads the soil mapping-unit polygons once and resolves a coordinate to
//! the containing unit, falling back to the nearest unit by centroid
//! distance when no polygon contains it.

mod bounds;
mod containment;
mod error;
mod index;
mod nearest;
mod service;
mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use bounds::DatasetBounds;
pub use containment::{feature_contains, find_containing, polygon_contains, ContainmentResolver};
pub use error::GeoLookupError;
pub use index::{LinearScan, SpatialIndex};
pub use nearest::{feature_centroid, find_nearest, haversine_km, NearestMatch, NearestResolver};
pub use service::{GeoLookupService, LookupHandle, ResolverKind};
pub use store::PolygonStore;
