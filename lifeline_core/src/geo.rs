//! Geodesy helpers for distance and arrival estimates.

use lifeline_env::GeoPoint;
use std::time::Duration;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average urban ambulance speed used for straight-line ETA estimates.
const AVERAGE_SPEED_KMH: f64 = 40.0;

/// Great-circle distance between two points in kilometers (haversine).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Straight-line travel time estimate at the assumed average speed.
///
/// Purely a display aid: no road routing (non-goal), so this is the
/// haversine distance over a city-average speed.
pub fn estimate_travel_time(from: GeoPoint, to: GeoPoint) -> Duration {
    let hours = haversine_km(from, to) / AVERAGE_SPEED_KMH;
    // NaN coordinates reach here unsanitized, and
    // `Duration::from_secs_f64` panics on non-finite input.
    if !hours.is_finite() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(hours * 3600.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_haversine_zero_distance() {
        let p = GeoPoint::new(19.0760, 72.8777);
        assert_relative_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Mumbai to Delhi, roughly 1150 km great-circle
        let mumbai = GeoPoint::new(19.0760, 72.8777);
        let delhi = GeoPoint::new(28.7041, 77.1025);
        let d = haversine_km(mumbai, delhi);
        assert!(d > 1100.0 && d < 1200.0, "got {d}");
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = GeoPoint::new(12.9716, 77.5946);
        let b = GeoPoint::new(13.0827, 80.2707);
        assert_relative_eq!(haversine_km(a, b), haversine_km(b, a), epsilon = 1e-9);
    }

    #[test]
    fn test_travel_time_nan_coordinates_is_zero() {
        let good = GeoPoint::new(19.0760, 72.8777);
        let bad = GeoPoint::new(f64::NAN, 72.8778);
        assert_eq!(estimate_travel_time(bad, good), Duration::ZERO);
        assert_eq!(estimate_travel_time(good, bad), Duration::ZERO);
    }

    #[test]
    fn test_travel_time_scales_with_distance() {
        let a = GeoPoint::new(19.0760, 72.8777);
        let near = GeoPoint::new(19.0860, 72.8877);
        let far = GeoPoint::new(19.5760, 73.3777);
        assert!(estimate_travel_time(a, far) > estimate_travel_time(a, near));
    }
}
