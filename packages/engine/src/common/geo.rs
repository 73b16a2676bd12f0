//! Geographic primitives: validated coordinates and distance math.
//!
//! Coordinates are WGS84 decimal degrees. Distances use the haversine
//! formula, which is accurate enough for city-scale radius queries.

use serde::{Deserialize, Serialize};

use crate::common::{EngineError, EngineResult};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree of latitude (roughly constant).
const KM_PER_DEGREE_LAT: f64 = 110.574;

/// Kilometers per degree of longitude at the equator.
const KM_PER_DEGREE_LNG_EQUATOR: f64 = 111.320;

/// A validated WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Build a point, validating latitude to [-90, 90] and longitude to
    /// [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> EngineResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(EngineError::Validation(format!(
                "invalid latitude: {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(EngineError::Validation(format!(
                "invalid longitude: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to another point in kilometers (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (dlng / 2.0).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// Axis-aligned lat/lng box used to prefilter radius queries before the
/// exact haversine check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// The smallest box guaranteed to contain every point within
    /// `radius_km` of `center`. Near the poles the longitude span
    /// degenerates to the full range.
    pub fn around(center: &GeoPoint, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE_LAT;

        let lat_cos = center.latitude.to_radians().cos();
        let lng_delta = if lat_cos.abs() < 1e-6 {
            180.0
        } else {
            radius_km / (KM_PER_DEGREE_LNG_EQUATOR * lat_cos.abs())
        };

        Self {
            min_lat: (center.latitude - lat_delta).max(-90.0),
            max_lat: (center.latitude + lat_delta).min(90.0),
            min_lng: (center.longitude - lng_delta).max(-180.0),
            max_lng: (center.longitude + lng_delta).min(180.0),
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}
