//! Spatial indexing for radius queries.
//!
//! Uses an R-tree over `[lng, lat]` points. Radius searches first query the
//! degree envelope(s) around the center, then filter by exact haversine
//! distance and sort nearest first.

use rstar::{AABB, RTree, RTreeObject};

use crate::GpsPoint;
use crate::geo_utils::{haversine_nm, search_envelopes};

/// An indexed location pointing back into the owner's slot table.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub slot: usize,
    pub location: GpsPoint,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.longitude, self.location.latitude])
    }
}

/// Immutable R-tree of slot locations.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load an index from `(slot, location)` pairs.
    pub fn build(points: impl IntoIterator<Item = (usize, GpsPoint)>) -> Self {
        let items: Vec<IndexedPoint> = points
            .into_iter()
            .filter(|(_, p)| p.is_valid())
            .map(|(slot, location)| IndexedPoint { slot, location })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Slots within `radius_nm` of `center`, nearest first, with distances.
    ///
    /// Ties in distance are broken by slot so results are deterministic.
    pub fn within_radius(&self, center: &GpsPoint, radius_nm: f64) -> Vec<(usize, f64)> {
        if radius_nm < 0.0 || !center.is_valid() {
            return Vec::new();
        }

        let mut hits: Vec<(usize, f64)> = Vec::new();
        for env in search_envelopes(center, radius_nm) {
            let aabb = AABB::from_corners([env.min_lng, env.min_lat], [env.max_lng, env.max_lat]);
            for item in self.tree.locate_in_envelope(&aabb) {
                let d = haversine_nm(center, &item.location);
                if d <= radius_nm {
                    hits.push((item.slot, d));
                }
            }
        }

        // A slot seen through both antimeridian envelopes sorts next to itself
        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        hits.dedup_by_key(|(slot, _)| *slot);
        hits
    }

    /// The nearest slot within `radius_nm`, if any.
    pub fn nearest_within(&self, center: &GpsPoint, radius_nm: f64) -> Option<(usize, f64)> {
        self.within_radius(center, radius_nm).into_iter().next()
    }

    /// Get the number of indexed points.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
