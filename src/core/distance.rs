use crate::models::{BoundingBox, Coordinate};

/// Earth's radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Approximate miles per degree of latitude
const MILES_PER_DEGREE: f64 = 69.0;

/// Calculate the Haversine distance between two points in miles
///
/// Invalid input (non-finite, latitude outside [-90, 90] or longitude
/// outside [-180, 180]) yields `f64::INFINITY`, so any distance
/// constraint evaluated against it fails.
#[inline]
pub fn haversine_miles(a: Coordinate, b: Coordinate) -> f64 {
    if !a.is_valid() || !b.is_valid() {
        return f64::INFINITY;
    }

    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Distance between two optional locations, `None` when either is unknown
#[inline]
pub fn distance_between(a: Option<Coordinate>, b: Option<Coordinate>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(haversine_miles(a, b)),
        _ => None,
    }
}

/// Calculate a bounding box around a center point
///
/// Used as a cheap store-side pre-filter before the exact Haversine check.
/// 1° latitude ≈ 69 miles, 1° longitude ≈ 69 miles * cos(latitude).
/// The box is clamped to valid coordinates. When the circle reaches a pole
/// or wraps the antimeridian it widens to every longitude.
pub fn calculate_bounding_box(center: Coordinate, radius_miles: f64) -> BoundingBox {
    let lat_delta = radius_miles / MILES_PER_DEGREE;
    let cos_lat = center.latitude.to_radians().cos().abs();

    let reaches_pole = center.latitude + lat_delta >= 90.0 || center.latitude - lat_delta <= -90.0;

    let (min_lon, max_lon) = if reaches_pole || cos_lat < 1e-6 {
        (-180.0, 180.0)
    } else {
        let lon_delta = radius_miles / (MILES_PER_DEGREE * cos_lat);
        if center.longitude - lon_delta < -180.0 || center.longitude + lon_delta > 180.0 {
            (-180.0, 180.0)
        } else {
            (center.longitude - lon_delta, center.longitude + lon_delta)
        }
    };

    BoundingBox {
        min_lat: (center.latitude - lat_delta).max(-90.0),
        max_lat: (center.latitude + lat_delta).min(90.0),
        min_lon,
        max_lon,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: Coordinate, bbox: &BoundingBox) -> bool {
    point.latitude >= bbox.min_lat
        && point.latitude <= bbox.max_lat
        && point.longitude >= bbox.min_lon
        && point.longitude <= bbox.max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_miles() {
        // London to Paris is roughly 214 miles
        let london = Coordinate::new(51.5074, -0.1278);
        let paris = Coordinate::new(48.8566, 2.3522);

        let distance = haversine_miles(london, paris);
        assert!((distance - 214.0).abs() < 6.0, "Distance should be ~214mi, got {}", distance);
    }

    #[test]
    fn test_same_point_is_zero() {
        let p = Coordinate::new(35.6762, 139.6503);
        assert_eq!(haversine_miles(p, p), 0.0);
    }

    #[test]
    fn test_invalid_coordinates_are_infinite() {
        let ok = Coordinate::new(0.0, 0.0);
        assert!(haversine_miles(Coordinate::new(91.0, 0.0), ok).is_infinite());
        assert!(haversine_miles(ok, Coordinate::new(0.0, -180.5)).is_infinite());
        assert!(haversine_miles(ok, Coordinate::new(f64::INFINITY, 0.0)).is_infinite());
    }

    #[test]
    fn test_bounding_box() {
        let center = Coordinate::new(40.7128, -74.0060);
        let bbox = calculate_bounding_box(center, 10.0);

        assert!(bbox.min_lat < center.latitude);
        assert!(bbox.max_lat > center.latitude);
        assert!(bbox.min_lon < center.longitude);
        assert!(bbox.max_lon > center.longitude);

        // 20mi / 69mi per degree = ~0.29 degrees
        let lat_span = bbox.max_lat - bbox.min_lat;
        assert!((lat_span - 0.29).abs() < 0.02, "Lat span should be ~0.29 degrees");
    }

    #[test]
    fn test_bounding_box_near_pole() {
        let bbox = calculate_bounding_box(Coordinate::new(89.99, 10.0), 50.0);
        assert_eq!(bbox.max_lat, 90.0);
        assert_eq!(bbox.min_lon, -180.0);
        assert_eq!(bbox.max_lon, 180.0);
    }

    #[test]
    fn test_bounding_box_over_pole_keeps_far_longitudes() {
        let center = Coordinate::new(89.0, 10.0);
        let across = Coordinate::new(89.5, -170.0);
        let bbox = calculate_bounding_box(center, 200.0);

        assert!(haversine_miles(center, across) < 200.0);
        assert!(is_within_bounding_box(across, &bbox));
        assert_eq!((bbox.min_lon, bbox.max_lon), (-180.0, 180.0));

        let south = calculate_bounding_box(Coordinate::new(-88.0, 45.0), 200.0);
        assert_eq!(south.min_lat, -90.0);
        assert_eq!((south.min_lon, south.max_lon), (-180.0, 180.0));
    }

    #[test]
    fn test_point_within_bbox() {
        let center = Coordinate::new(40.7128, -74.0060);
        let bbox = calculate_bounding_box(center, 10.0);

        assert!(is_within_bounding_box(center, &bbox));
        assert!(is_within_bounding_box(Coordinate::new(40.71, -74.0), &bbox));
        assert!(!is_within_bounding_box(Coordinate::new(50.0, -80.0), &bbox));
    }
}
