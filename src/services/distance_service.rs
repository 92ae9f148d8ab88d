//! Great-circle distance between two coordinates.
//!
//! Used by the quote service to price destinations when no live provider
//! quote is available (manual/mock modes and per-destination fallback).

const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Distance in miles between two lat/lon points using the Haversine formula
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance_for_same_point() {
        assert_eq!(haversine_miles(30.2672, -97.7431, 30.2672, -97.7431), 0.0);
    }

    #[test]
    fn test_austin_to_dallas() {
        // Austin to Dallas is roughly 182 miles as the crow flies
        let miles = haversine_miles(30.2672, -97.7431, 32.7767, -96.7970);
        assert!(miles > 175.0 && miles < 190.0, "got {}", miles);
    }

    #[test]
    fn test_symmetry() {
        let a = haversine_miles(40.7128, -74.0060, 34.0522, -118.2437);
        let b = haversine_miles(34.0522, -118.2437, 40.7128, -74.0060);
        assert!((a - b).abs() < 1e-9);
        // NYC to LA is about 2,450 miles
        assert!(a > 2400.0 && a < 2500.0, "got {}", a);
    }
}
