//! Point-in-polygon resolution over soil features.
//!
//! Polygons are treated as closed sets: a point on an exterior edge or vertex
//! is contained, a point strictly inside a hole is not. A point on a hole's
//! boundary lies on the polygon boundary and is therefore contained.

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, Polygon};

use crate::models::{Coordinate, SoilFeature};

/// Finds the feature whose geometry contains a coordinate
pub trait ContainmentResolver: Send + Sync {
    /// First containing feature in store order
    fn find_containing(&self, coord: Coordinate) -> Option<&SoilFeature>;
}

/// Closed-polygon containment test for one polygon
pub fn polygon_contains(polygon: &Polygon<f64>, coord: &Coord<f64>) -> bool {
    polygon.coordinate_position(coord) != CoordPos::Outside
}

/// Test each constituent polygon in listed order
pub fn feature_contains(feature: &SoilFeature, coord: &Coord<f64>) -> bool {
    feature
        .geometry
        .iter()
        .any(|polygon| polygon_contains(polygon, coord))
}

/// Linear scan returning the first feature, in slice order, that contains the point
pub fn find_containing(coord: Coordinate, features: &[SoilFeature]) -> Option<&SoilFeature> {
    let c = coord.to_coord();
    features.iter().find(|f| feature_contains(f, &c))
}
