//! Coverage classification: exact containment first, nearest unit second.

use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::containment::ContainmentResolver;
use super::index::{LinearScan, SpatialIndex};
use super::nearest::{NearestMatch, NearestResolver};
use super::{DatasetBounds, GeoLookupError, PolygonStore};
use crate::models::{Coordinate, LookupResult, SoilFeature};

/// Which resolver implementation backs the lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ResolverKind {
    #[default]
    Linear,
    Rtree,
}

/// Soil coverage lookup service over a loaded polygon store
pub struct GeoLookupService {
    store: Arc<PolygonStore>,
    containment: Box<dyn ContainmentResolver>,
    nearest: Box<dyn NearestResolver>,
}

impl GeoLookupService {
    /// Create a lookup service using linear scans
    pub fn new(store: Arc<PolygonStore>) -> Self {
        Self::with_resolver(store, ResolverKind::Linear)
    }

    pub fn with_resolver(store: Arc<PolygonStore>, kind: ResolverKind) -> Self {
        match kind {
            ResolverKind::Linear => Self::from_parts(
                Arc::clone(&store),
                Box::new(LinearScan::new(Arc::clone(&store))),
                Box::new(LinearScan::new(store)),
            ),
            ResolverKind::Rtree => {
                let index = Arc::new(SpatialIndex::build(Arc::clone(&store)));
                Self::from_parts(
                    store,
                    Box::new(SharedIndex(Arc::clone(&index))),
                    Box::new(SharedIndex(index)),
                )
            }
        }
    }

    /// Assemble a service from custom resolvers
    pub fn from_parts(
        store: Arc<PolygonStore>,
        containment: Box<dyn ContainmentResolver>,
        nearest: Box<dyn NearestResolver>,
    ) -> Self {
        Self {
            store,
            containment,
            nearest,
        }
    }

    /// Classify a coordinate as exact, estimated, or uncovered (`None`).
    ///
    /// The coordinate must already be range-checked by the caller.
    pub fn lookup(&self, coord: Coordinate) -> Option<LookupResult> {
        let within_bounds = self.is_within_bounds(coord);

        if let Some(feature) = self.containment.find_containing(coord) {
            debug!(
                "Lookup at ({}, {}): exact match {}",
                coord.latitude, coord.longitude, feature.mapping_unit
            );
            return Some(LookupResult::exact(feature.mapping_unit.clone()));
        }

        let nearest = self.nearest.find_nearest(coord)?;
        debug!(
            "Lookup at ({}, {}): estimated {} at {:.1} km (within bounds: {})",
            coord.latitude,
            coord.longitude,
            nearest.feature.mapping_unit,
            nearest.distance_km,
            within_bounds
        );

        Some(LookupResult::estimated(
            nearest.feature.mapping_unit.clone(),
            nearest.distance_km,
            !within_bounds,
        ))
    }

    pub fn is_within_bounds(&self, coord: Coordinate) -> bool {
        self.store.bounds().is_within_bounds(coord)
    }

    pub fn bounds(&self) -> DatasetBounds {
        self.store.bounds()
    }

    /// Get the polygon store (for stats/seeding)
    pub fn store(&self) -> &PolygonStore {
        &self.store
    }
}

/// One R-tree shared by both resolver slots
struct SharedIndex(Arc<SpatialIndex>);

impl ContainmentResolver for SharedIndex {
    fn find_containing(&self, coord: Coordinate) -> Option<&SoilFeature> {
        self.0.find_containing(coord)
    }
}

impl NearestResolver for SharedIndex {
    fn find_nearest(&self, coord: Coordinate) -> Option<NearestMatch<'_>> {
        self.0.find_nearest(coord)
    }
}

/// Lookup entry point that may not have a dataset yet
#[derive(Clone, Default)]
pub struct LookupHandle {
    service: Option<Arc<GeoLookupService>>,
}

impl LookupHandle {
    pub fn unloaded() -> Self {
        Self { service: None }
    }

    pub fn loaded(service: Arc<GeoLookupService>) -> Self {
        Self {
            service: Some(service),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.service.is_some()
    }

    pub fn service(&self) -> Result<&Arc<GeoLookupService>, GeoLookupError> {
        self.service.as_ref().ok_or(GeoLookupError::NotLoaded)
    }

    pub fn lookup(&self, coord: Coordinate) -> Result<Option<LookupResult>, GeoLookupError> {
        Ok(self.service()?.lookup(coord))
    }
}
