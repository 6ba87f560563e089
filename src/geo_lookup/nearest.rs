//! Nearest-unit fallback by great-circle distance to feature centroids.

use geo::algorithm::line_measures::metric_spaces::Haversine;
use geo::algorithm::line_measures::Distance;
use geo::{Centroid, Point};
use tracing::debug;

use crate::models::{Coordinate, SoilFeature};

/// Closest feature and its unrounded distance
#[derive(Debug, Clone, Copy)]
pub struct NearestMatch<'a> {
    pub feature: &'a SoilFeature,
    pub distance_km: f64,
}

/// Finds the feature whose centroid is closest to a coordinate
pub trait NearestResolver: Send + Sync {
    fn find_nearest(&self, coord: Coordinate) -> Option<NearestMatch<'_>>;
}

/// Area-weighted centroid over all member polygons, holes subtracting.
///
/// Returns None for empty geometries or non-finite results.
pub fn feature_centroid(feature: &SoilFeature) -> Option<Point<f64>> {
    feature
        .geometry
        .centroid()
        .filter(|p| p.x().is_finite() && p.y().is_finite())
}

/// Great-circle distance in kilometres
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b) / 1000.0
}

/// Linear scan over all features; ties keep the earliest feature
pub fn find_nearest(coord: Coordinate, features: &[SoilFeature]) -> Option<NearestMatch<'_>> {
    let point = coord.to_point();
    let mut best: Option<NearestMatch<'_>> = None;
    let mut skipped = 0usize;

    for feature in features {
        let Some(centroid) = feature_centroid(feature) else {
            debug!("Skipping unit {} with no centroid", feature.mapping_unit);
            skipped += 1;
            continue;
        };

        let distance_km = haversine_km(point, centroid);
        if best.map_or(true, |b| distance_km < b.distance_km) {
            best = Some(NearestMatch {
                feature,
                distance_km,
            });
        }
    }

    if skipped > 0 {
        debug!(
            "Nearest search skipped {} degenerate unit(s) of {}",
            skipped,
            features.len()
        );
    }

    best
}
