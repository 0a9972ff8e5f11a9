// SPDX-License-Identifier: MIT

//! Geographic helpers: haversine distance and region bounding boxes.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

/// Radius around the user inside which pharmacies count as "nearby"
/// for proximity notifications, in meters.
pub const NEARBY_RADIUS_METERS: f64 = 100.0;

/// Radius of the region fetched from the remote store around the
/// user's location, in kilometers.
pub const REGION_RADIUS_KM: f64 = 30.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Haversine distance between two coordinates, in meters.
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    Haversine.distance(Point::new(a.lng, a.lat), Point::new(b.lng, b.lat))
}

/// Latitude/longitude box around a center point, used for the remote
/// region query. Field names match the query filters they feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub lower_lat: f64,
    pub upper_lat: f64,
    pub lower_lng: f64,
    pub upper_lng: f64,
}

impl RegionBounds {
    pub fn contains(&self, c: Coordinates) -> bool {
        c.lat > self.lower_lat
            && c.lat < self.upper_lat
            && c.lng > self.lower_lng
            && c.lng < self.upper_lng
    }
}

/// Compute the bounding box of `radius_km` around `center`.
///
/// The longitude span widens with latitude; this is the flat-box
/// approximation the region query needs, not a geodesic buffer.
pub fn region_bounds(center: Coordinates, radius_km: f64) -> RegionBounds {
    let lat_radius = (radius_km / EARTH_RADIUS_KM).to_degrees();
    let lng_radius = (radius_km / (EARTH_RADIUS_KM * center.lat.to_radians().cos())).to_degrees();

    RegionBounds {
        lower_lat: center.lat - lat_radius,
        upper_lat: center.lat + lat_radius,
        lower_lng: center.lng - lng_radius,
        upper_lng: center.lng + lng_radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // IST Alameda campus and two points at increasing distance.
    const ALAMEDA: Coordinates = Coordinates {
        lat: 38.7369,
        lng: -9.1427,
    };
    const ROSSIO: Coordinates = Coordinates {
        lat: 38.7139,
        lng: -9.1394,
    };
    const PORTO: Coordinates = Coordinates {
        lat: 41.1579,
        lng: -8.6291,
    };

    #[test]
    fn test_distance_is_ordered_and_plausible() {
        let near = distance_meters(ALAMEDA, ROSSIO);
        let far = distance_meters(ALAMEDA, PORTO);

        // Rossio is roughly 2.5 km away, Porto roughly 270 km.
        assert!(near > 2_000.0 && near < 3_500.0, "near = {near}");
        assert!(far > 250_000.0 && far < 300_000.0, "far = {far}");
        assert!(near < far);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_meters(ALAMEDA, ALAMEDA), 0.0);
    }

    #[test]
    fn test_region_bounds_contains_center_and_near_points() {
        let bounds = region_bounds(ALAMEDA, REGION_RADIUS_KM);

        assert!(bounds.contains(ALAMEDA));
        assert!(bounds.contains(ROSSIO));
        assert!(!bounds.contains(PORTO));
    }

    #[test]
    fn test_region_bounds_are_symmetric_around_center() {
        let bounds = region_bounds(ALAMEDA, 10.0);

        let lat_span_up = bounds.upper_lat - ALAMEDA.lat;
        let lat_span_down = ALAMEDA.lat - bounds.lower_lat;
        assert!((lat_span_up - lat_span_down).abs() < 1e-12);
    }
}
