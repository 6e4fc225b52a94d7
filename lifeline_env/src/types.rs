//! Common types shared across the Lifeline environment abstraction.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees
    pub lat: f64,

    /// Longitude in decimal degrees
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a point from decimal degrees.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Midpoint of the straight segment between two points.
    ///
    /// Good enough at city scale; the route line is a visual aid, not a
    /// computed path.
    pub fn midpoint(self, other: GeoPoint) -> GeoPoint {
        GeoPoint {
            lat: (self.lat + other.lat) / 2.0,
            lng: (self.lng + other.lng) / 2.0,
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// One raw positional fix as delivered by the device sensor.
///
/// Samples are transient: the core folds them into its smoothing window and
/// discards them. `accuracy_m` is the sensor's own error estimate and may be
/// reported as very large (poor fix) or near-zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Reported position
    pub position: GeoPoint,

    /// Estimated error radius in meters
    pub accuracy_m: f64,

    /// Sensor capture time
    pub captured_at: SystemTime,
}

impl LocationSample {
    /// Creates a sample captured now.
    pub fn new(position: GeoPoint, accuracy_m: f64) -> Self {
        Self {
            position,
            accuracy_m,
            captured_at: SystemTime::now(),
        }
    }
}

/// Identity of one live location watch.
///
/// Uses UUID v4 so handles from different sources can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchId(pub Uuid);

impl WatchId {
    /// Creates a new random WatchId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint() {
        let a = GeoPoint::new(10.0, 20.0);
        let b = GeoPoint::new(12.0, 24.0);
        let mid = a.midpoint(b);
        assert_eq!(mid.lat, 11.0);
        assert_eq!(mid.lng, 22.0);
    }

    #[test]
    fn test_watch_ids_unique() {
        assert_ne!(WatchId::new(), WatchId::new());
    }
}
