//! In-process coordinate index for radius and bounding-box queries.
//!
//! Leaf dependency of ranking: a bounding-box prefilter followed by an exact
//! haversine check. Results are ordered by distance then id so callers get
//! deterministic output.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::common::{BoundingBox, GeoPoint, ServiceId};

/// Thread-safe map from service id to its coordinates.
pub struct GeoIndex {
    points: RwLock<HashMap<ServiceId, GeoPoint>>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self {
            points: RwLock::new(HashMap::new()),
        }
    }

    pub fn upsert(&self, id: ServiceId, point: GeoPoint) {
        self.points.write().unwrap().insert(id, point);
    }

    pub fn remove(&self, id: ServiceId) {
        self.points.write().unwrap().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.points.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids within `radius_km` of `center`, with distances, ordered by
    /// distance then id.
    pub fn within_radius(&self, center: &GeoPoint, radius_km: f64) -> Vec<(ServiceId, f64)> {
        let bbox = BoundingBox::around(center, radius_km);
        let points = self.points.read().unwrap();

        let mut hits: Vec<(ServiceId, f64)> = points
            .iter()
            .filter(|(_, point)| bbox.contains(point))
            .filter_map(|(id, point)| {
                let distance = center.distance_km(point);
                (distance <= radius_km).then_some((*id, distance))
            })
            .collect();

        hits.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        hits
    }

    /// Ids inside the box, ordered by id.
    pub fn within_bbox(&self, bbox: &BoundingBox) -> Vec<ServiceId> {
        let points = self.points.read().unwrap();
        let mut hits: Vec<ServiceId> = points
            .iter()
            .filter(|(_, point)| bbox.contains(point))
            .map(|(id, _)| *id)
            .collect();
        hits.sort();
        hits
    }
}

impl Default for GeoIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_query_excludes_far_points() {
        let index = GeoIndex::new();
        let center = GeoPoint::new(40.0, -74.0).unwrap();

        let near = ServiceId::new();
        let far = ServiceId::new();
        // ~2 km north and ~8 km north of center
        index.upsert(near, GeoPoint::new(40.018, -74.0).unwrap());
        index.upsert(far, GeoPoint::new(40.072, -74.0).unwrap());

        let hits = index.within_radius(&center, 5.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, near);
        assert!(hits[0].1 < 5.0);
    }

    #[test]
    fn test_radius_results_ordered_by_distance() {
        let index = GeoIndex::new();
        let center = GeoPoint::new(44.98, -93.27).unwrap();

        let a = ServiceId::new();
        let b = ServiceId::new();
        index.upsert(a, GeoPoint::new(44.99, -93.27).unwrap());
        index.upsert(b, GeoPoint::new(44.981, -93.27).unwrap());

        let hits = index.within_radius(&center, 10.0);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].1 <= hits[1].1);
        assert_eq!(hits[0].0, b);
    }

    #[test]
    fn test_upsert_moves_a_point() {
        let index = GeoIndex::new();
        let center = GeoPoint::new(40.0, -74.0).unwrap();
        let id = ServiceId::new();

        index.upsert(id, GeoPoint::new(41.0, -74.0).unwrap());
        assert!(index.within_radius(&center, 5.0).is_empty());

        index.upsert(id, GeoPoint::new(40.01, -74.0).unwrap());
        assert_eq!(index.within_radius(&center, 5.0).len(), 1);
    }
}
