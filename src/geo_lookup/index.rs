//! Resolver implementations: a linear scan and an R-tree index.

use std::sync::Arc;

use rstar::primitives::GeomWithData;
use rstar::{RTree, RTreeObject, AABB};
use tracing::info;

use super::containment::{feature_contains, find_containing, ContainmentResolver};
use super::nearest::{
    feature_centroid, find_nearest, haversine_km, NearestMatch, NearestResolver,
};
use super::PolygonStore;
use crate::models::{Coordinate, SoilFeature};

/// Relative slack when collecting near-equal chord candidates
const CHORD_TIE_EPSILON: f64 = 1e-9;

/// Scans every feature on each query
pub struct LinearScan {
    store: Arc<PolygonStore>,
}

impl LinearScan {
    pub fn new(store: Arc<PolygonStore>) -> Self {
        Self { store }
    }
}

impl ContainmentResolver for LinearScan {
    fn find_containing(&self, coord: Coordinate) -> Option<&SoilFeature> {
        find_containing(coord, self.store.features())
    }
}

impl NearestResolver for LinearScan {
    fn find_nearest(&self, coord: Coordinate) -> Option<NearestMatch<'_>> {
        find_nearest(coord, self.store.features())
    }
}

/// Feature envelope tagged with its store index
#[derive(Clone)]
struct IndexedEnvelope {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedEnvelope {
    fn new(index: usize, feature: &SoilFeature) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = feature.bbox()?;
        Some(Self {
            index,
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// Centroid on the unit sphere; chord length orders like great-circle distance
type IndexedCentroid = GeomWithData<[f64; 3], usize>;

fn unit_sphere(lon: f64, lat: f64) -> [f64; 3] {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// R-tree backed resolvers with the same results as [`LinearScan`]
pub struct SpatialIndex {
    store: Arc<PolygonStore>,
    envelopes: RTree<IndexedEnvelope>,
    centroids: RTree<IndexedCentroid>,
}

impl SpatialIndex {
    /// Build spatial index over the store's features
    pub fn build(store: Arc<PolygonStore>) -> Self {
        info!("Building spatial index for {} soil units...", store.len());

        let envelopes: Vec<IndexedEnvelope> = store
            .features()
            .iter()
            .enumerate()
            .filter_map(|(i, f)| IndexedEnvelope::new(i, f))
            .collect();

        let centroids: Vec<IndexedCentroid> = store
            .features()
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                feature_centroid(f).map(|c| GeomWithData::new(unit_sphere(c.x(), c.y()), i))
            })
            .collect();

        let envelopes = RTree::bulk_load(envelopes);
        let centroids = RTree::bulk_load(centroids);

        info!(
            "Spatial index built with {} envelopes and {} centroids",
            envelopes.size(),
            centroids.size()
        );

        Self {
            store,
            envelopes,
            centroids,
        }
    }

    pub fn len(&self) -> usize {
        self.envelopes.size()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.size() == 0
    }
}

impl ContainmentResolver for SpatialIndex {
    fn find_containing(&self, coord: Coordinate) -> Option<&SoilFeature> {
        let c = coord.to_coord();
        let query_envelope = AABB::from_point([c.x, c.y]);

        // Envelope candidates come back in tree order; the lowest store index wins
        self.envelopes
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ie| feature_contains(&self.store.features()[ie.index], &c))
            .map(|ie| ie.index)
            .min()
            .and_then(|i| self.store.get(i))
    }
}

impl NearestResolver for SpatialIndex {
    fn find_nearest(&self, coord: Coordinate) -> Option<NearestMatch<'_>> {
        let point = coord.to_point();
        let query = unit_sphere(coord.longitude, coord.latitude);

        let mut candidates = self.centroids.nearest_neighbor_iter_with_distance_2(&query);
        let (first, first_d2) = candidates.next()?;
        let cutoff = first_d2 * (1.0 + CHORD_TIE_EPSILON) + f64::EPSILON;

        // Re-rank everything within float noise of the closest chord by haversine
        std::iter::once((first, first_d2))
            .chain(candidates.take_while(|(_, d2)| *d2 <= cutoff))
            .filter_map(|(c, _)| {
                let feature = self.store.get(c.data)?;
                let centroid = feature_centroid(feature)?;
                Some((c.data, haversine_km(point, centroid)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .and_then(|(i, distance_km)| {
                self.store.get(i).map(|feature| NearestMatch {
                    feature,
                    distance_km,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_lookup::fixtures::{sample_store, square_feature};

    fn grid_store() -> Arc<PolygonStore> {
        let mut features = Vec::new();
        for row in 0..6 {
            for col in 0..8 {
                // leave gaps between cells
                features.push(square_feature(
                    &format!("G{row}{col}"),
                    3.0 + col as f64 * 1.5,
                    4.5 + row as f64 * 1.5,
                    1.0,
                ));
            }
        }
        Arc::new(PolygonStore::from_features(features))
    }

    #[test]
    fn test_index_matches_linear_scan() {
        let store = grid_store();
        let linear = LinearScan::new(Arc::clone(&store));
        let index = SpatialIndex::build(Arc::clone(&store));
        assert_eq!(index.len(), 48);

        let mut lat = 3.0;
        while lat < 15.0 {
            let mut lon = 2.0;
            while lon < 16.0 {
                let coord = Coordinate::new(lat, lon);

                let a = linear.find_containing(coord).map(|f| &f.mapping_unit);
                let b = index.find_containing(coord).map(|f| &f.mapping_unit);
                assert_eq!(a, b, "containment differs at {coord:?}");

                let a = linear.find_nearest(coord).unwrap();
                let b = index.find_nearest(coord).unwrap();
                assert_eq!(
                    a.feature.mapping_unit, b.feature.mapping_unit,
                    "nearest differs at {coord:?}"
                );
                assert_eq!(a.distance_km, b.distance_km);

                lon += 0.37;
            }
            lat += 0.41;
        }
    }

    #[test]
    fn test_index_first_match_on_overlap() {
        let store = Arc::new(PolygonStore::from_features(vec![
            square_feature("BIG", 0.0, 0.0, 4.0),
            square_feature("SMALL", 1.0, 1.0, 1.0),
        ]));
        let index = SpatialIndex::build(store);
        let hit = index.find_containing(Coordinate::new(1.5, 1.5)).unwrap();
        assert_eq!(hit.mapping_unit, "BIG");
    }

    #[test]
    fn test_index_tie_keeps_store_order() {
        let store = Arc::new(PolygonStore::from_features(vec![
            square_feature("EAST", 0.5, -0.5, 1.0),
            square_feature("WEST", -1.5, -0.5, 1.0),
        ]));
        let index = SpatialIndex::build(store);
        let nearest = index.find_nearest(Coordinate::new(0.0, 0.0)).unwrap();
        assert_eq!(nearest.feature.mapping_unit, "EAST");
    }

    #[test]
    fn test_index_on_sample_dataset() {
        let index = SpatialIndex::build(Arc::new(sample_store()));
        assert_eq!(
            index
                .find_containing(Coordinate::new(6.5, 3.4))
                .map(|f| f.mapping_unit.as_str()),
            Some("LAG1")
        );
        assert!(index.find_containing(Coordinate::new(7.0, 6.0)).is_none());
        assert_eq!(
            index
                .find_nearest(Coordinate::new(9.0, 8.0))
                .map(|m| m.feature.mapping_unit.as_str()),
            Some("MID")
        );
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(Arc::new(PolygonStore::empty()));
        assert!(index.is_empty());
        assert!(index.find_containing(Coordinate::new(6.5, 3.4)).is_none());
        assert!(index.find_nearest(Coordinate::new(6.5, 3.4)).is_none());
    }
}
