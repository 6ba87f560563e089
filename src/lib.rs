//! LandIQ - soil coverage lookup for land assessments
//!
//! This library provides the lookup engine, assessment service and
//! explanation pipeline shared by the server and lookup binaries.

pub mod assessment;
pub mod config;
pub mod explanation;
pub mod geo_lookup;
pub mod models;

pub use geo_lookup::{GeoLookupError, GeoLookupService, LookupHandle, PolygonStore};
pub use models::{Coordinate, Coverage, LookupResult};
