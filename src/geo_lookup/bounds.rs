//! Dataset extent used as an informational out-of-bounds flag.

use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, SoilFeature};

/// Axis-aligned extent of the soil dataset in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl DatasetBounds {
    /// Published extent of the Nigeria soil mapping-unit dataset
    pub const NIGERIA: DatasetBounds = DatasetBounds {
        min_lon: 2.451429629088108,
        min_lat: 4.3919549113228715,
        max_lon: 14.777616251051061,
        max_lat: 13.927350558912927,
    };

    /// Extent of all feature geometries, or None for an empty dataset
    pub fn from_features(features: &[SoilFeature]) -> Option<Self> {
        features
            .iter()
            .filter_map(SoilFeature::bbox)
            .fold(None, |acc: Option<Self>, (min_x, min_y, max_x, max_y)| {
                Some(match acc {
                    None => DatasetBounds {
                        min_lon: min_x,
                        min_lat: min_y,
                        max_lon: max_x,
                        max_lat: max_y,
                    },
                    Some(b) => DatasetBounds {
                        min_lon: b.min_lon.min(min_x),
                        min_lat: b.min_lat.min(min_y),
                        max_lon: b.max_lon.max(max_x),
                        max_lat: b.max_lat.max(max_y),
                    },
                })
            })
    }

    /// Inclusive range test on both axes
    pub fn is_within_bounds(&self, coord: Coordinate) -> bool {
        coord.longitude >= self.min_lon
            && coord.longitude <= self.max_lon
            && coord.latitude >= self.min_lat
            && coord.latitude <= self.max_lat
    }
}
