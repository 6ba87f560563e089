//! Soil feature and lookup result types.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single soil mapping-unit polygon with its pass-through attributes
#[derive(Debug, Clone)]
pub struct SoilFeature {
    /// Unique soil classification identifier (e.g. "2a")
    pub mapping_unit: String,

    /// Polygon geometries are stored as a single-member MultiPolygon
    pub geometry: MultiPolygon<f64>,

    /// Soil attributes from the dataset, not interpreted by the resolvers
    pub properties: Map<String, Value>,
}

impl SoilFeature {
    /// Get the bounding box of this feature as (min_lon, min_lat, max_lon, max_lat)
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        use geo::BoundingRect;
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Query coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Range check for callers; the lookup core assumes it already passed
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Geographic (lon, lat) coordinate used by the geometry layer
    pub fn to_coord(self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }

    pub fn to_point(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// How confident a lookup is about the returned unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    /// Point lies inside a unit polygon
    Exact,
    /// Nearest unit by centroid distance
    Estimated,
    /// No dataset coverage at all
    None,
}

impl std::fmt::Display for Coverage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Coverage::Exact => write!(f, "exact"),
            Coverage::Estimated => write!(f, "estimated"),
            Coverage::None => write!(f, "none"),
        }
    }
}

/// Outcome of a coverage lookup for one coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub mapping_unit: String,
    pub is_estimated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub outside_bounds: bool,
}

impl LookupResult {
    pub fn exact(mapping_unit: impl Into<String>) -> Self {
        Self {
            mapping_unit: mapping_unit.into(),
            is_estimated: false,
            distance_km: None,
            outside_bounds: false,
        }
    }

    pub fn estimated(mapping_unit: impl Into<String>, distance_km: f64, outside_bounds: bool) -> Self {
        Self {
            mapping_unit: mapping_unit.into(),
            is_estimated: true,
            distance_km: Some(round_to_tenth(distance_km)),
            outside_bounds,
        }
    }

    pub fn coverage(&self) -> Coverage {
        if self.is_estimated {
            Coverage::Estimated
        } else {
            Coverage::Exact
        }
    }
}

/// Round a distance to one decimal place for display
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
