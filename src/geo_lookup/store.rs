//! Immutable in-memory polygon store loaded from a GeoJSON dataset.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use geo::MultiPolygon;
use geojson::{FeatureCollection, GeoJson};
use hashbrown::HashSet;
use tracing::{debug, info};

use super::{DatasetBounds, GeoLookupError};
use crate::models::SoilFeature;

/// Soil mapping-unit features in load order
#[derive(Debug, Clone)]
pub struct PolygonStore {
    features: Vec<SoilFeature>,
    bounds: DatasetBounds,
}

impl PolygonStore {
    /// Load a FeatureCollection from disk (`.gz` files are decompressed)
    pub fn load(path: &Path) -> Result<Self, GeoLookupError> {
        info!("Loading soil dataset from {}", path.display());

        if !path.exists() {
            return Err(GeoLookupError::data_load(path, "file not found"));
        }

        let file = File::open(path).map_err(|e| GeoLookupError::data_load(path, e))?;
        let mut reader: Box<dyn Read> = if path.extension().is_some_and(|e| e == "gz") {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| GeoLookupError::data_load(path, e))?;

        let store = Self::parse(&content).map_err(|reason| GeoLookupError::data_load(path, reason))?;
        info!(
            "Loaded {} soil mapping units into memory",
            store.features.len()
        );
        Ok(store)
    }

    /// Parse GeoJSON text that was already read into memory
    pub fn from_geojson_str(content: &str) -> Result<Self, GeoLookupError> {
        Self::parse(content).map_err(|reason| GeoLookupError::data_load(PathBuf::from("<memory>"), reason))
    }

    /// Build a store from already-constructed features
    pub fn from_features(features: Vec<SoilFeature>) -> Self {
        let bounds = DatasetBounds::from_features(&features).unwrap_or(DatasetBounds::NIGERIA);
        Self { features, bounds }
    }

    pub fn empty() -> Self {
        Self::from_features(Vec::new())
    }

    /// Replace the extent derived from the geometries
    pub fn with_bounds(mut self, bounds: DatasetBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Features in load order
    pub fn features(&self) -> &[SoilFeature] {
        &self.features
    }

    pub fn get(&self, index: usize) -> Option<&SoilFeature> {
        self.features.get(index)
    }

    pub fn bounds(&self) -> DatasetBounds {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn parse(content: &str) -> Result<Self, String> {
        let geojson: GeoJson = content
            .parse()
            .map_err(|e| format!("invalid GeoJSON: {e}"))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err("expected a FeatureCollection".to_string()),
        };

        Ok(Self::from_features(features_from_collection(collection)?))
    }
}

fn features_from_collection(collection: FeatureCollection) -> Result<Vec<SoilFeature>, String> {
    let mut seen = HashSet::new();
    let mut features = Vec::with_capacity(collection.features.len());

    for (idx, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties.unwrap_or_default();

        let mapping_unit = properties
            .get("mapping_unit")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| format!("feature {idx} has no mapping_unit"))?
            .to_string();

        if !seen.insert(mapping_unit.clone()) {
            return Err(format!(
                "feature {idx} repeats mapping_unit '{mapping_unit}'"
            ));
        }

        let geometry = feature
            .geometry
            .ok_or_else(|| format!("feature {idx} ('{mapping_unit}') has no geometry"))?;

        let geometry: geo::Geometry<f64> = geometry.try_into().map_err(|e| {
            format!("feature {idx} ('{mapping_unit}') has invalid geometry: {e}")
        })?;

        let geometry = match geometry {
            geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
            geo::Geometry::MultiPolygon(mp) => mp,
            _ => {
                return Err(format!(
                    "feature {idx} ('{mapping_unit}') is not a Polygon or MultiPolygon"
                ))
            }
        };

        debug!(
            "Loaded unit {} with {} polygon(s)",
            mapping_unit,
            geometry.0.len()
        );

        features.push(SoilFeature {
            mapping_unit,
            geometry,
            properties,
        });
    }

    Ok(features)
}
