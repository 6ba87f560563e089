//! Small GeoJSON dataset shared by the lookup tests.

use geo::{polygon, MultiPolygon};
use serde_json::{json, Map, Value};

use super::PolygonStore;
use crate::models::SoilFeature;

/// Four units: a Lagos-area polygon, a polygon with a hole, a two-part
/// MultiPolygon in the north and a small central polygon.
pub fn sample_collection() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {
                    "mapping_unit": "LAG1",
                    "ecological_zone": "Mangrove Swamp",
                    "drainage": "Poorly drained",
                    "badge": "GOLD",
                    "total_score": 82,
                    "degradation_risk": "LOW"
                },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[3.0, 6.3], [3.8, 6.3], [3.8, 6.8], [3.0, 6.8], [3.0, 6.3]]]
                }
            },
            {
                "type": "Feature",
                "properties": {
                    "mapping_unit": "HOLE",
                    "badge": "SILVER",
                    "total_score": 55,
                    "degradation_risk": "MEDIUM"
                },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[5.0, 6.0], [7.0, 6.0], [7.0, 8.0], [5.0, 8.0], [5.0, 6.0]],
                        [[5.5, 6.5], [6.5, 6.5], [6.5, 7.5], [5.5, 7.5], [5.5, 6.5]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {
                    "mapping_unit": "NTH",
                    "badge": "BRONZE",
                    "total_score": 31,
                    "degradation_risk": "HIGH"
                },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[7.0, 11.0], [8.0, 11.0], [8.0, 12.0], [7.0, 12.0], [7.0, 11.0]]],
                        [[[12.0, 11.0], [13.0, 11.0], [13.0, 12.0], [12.0, 12.0], [12.0, 11.0]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {
                    "mapping_unit": "MID",
                    "badge": "SILVER",
                    "total_score": 60,
                    "degradation_risk": "MEDIUM"
                },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[8.5, 9.5], [9.5, 9.5], [9.5, 10.5], [8.5, 10.5], [8.5, 9.5]]]
                }
            }
        ]
    })
}

pub fn sample_store() -> PolygonStore {
    PolygonStore::from_geojson_str(&sample_collection().to_string())
        .expect("fixture dataset parses")
}

/// Axis-aligned square with its lower-left corner at (lon, lat)
pub fn square_feature(unit: &str, lon: f64, lat: f64, size: f64) -> SoilFeature {
    SoilFeature {
        mapping_unit: unit.to_string(),
        geometry: MultiPolygon::new(vec![polygon![
            (x: lon, y: lat),
            (x: lon + size, y: lat),
            (x: lon + size, y: lat + size),
            (x: lon, y: lat + size),
        ]]),
        properties: Map::new(),
    }
}
