/// Great-circle geometry and unit conversions
use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance computations (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const MPS_TO_KMH: f32 = 3.6;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to another point (meters)
    pub fn distance_to(&self, other: &LatLon) -> f64 {
        haversine_m(*self, *other)
    }

    /// Move this point by a local north/east offset
    ///
    /// Exact along a meridian (pure `north_m`), spherical approximation for
    /// the east component. Used to synthesize tracks in tests and simulation.
    ///
    /// # Arguments
    /// * `north_m` - Displacement towards north (meters, negative = south)
    /// * `east_m` - Displacement towards east (meters, negative = west)
    pub fn offset_m(&self, north_m: f64, east_m: f64) -> LatLon {
        let dlat = (north_m / EARTH_RADIUS_M).to_degrees();
        let dlon = (east_m / (EARTH_RADIUS_M * self.lat.to_radians().cos())).to_degrees();
        LatLon::new(self.lat + dlat, self.lon + dlon)
    }
}

/// Haversine distance between two positions
///
/// # Arguments
/// * `a` - First position (degrees)
/// * `b` - Second position (degrees)
///
/// # Returns
/// * Distance in meters on a sphere of radius [`EARTH_RADIUS_M`]
pub fn haversine_m(a: LatLon, b: LatLon) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Convert m/s to km/h
pub fn mps_to_kmh(speed_mps: f32) -> f32 {
    speed_mps * MPS_TO_KMH
}

/// Convert km/h to m/s
pub fn kmh_to_mps(speed_kmh: f32) -> f32 {
    speed_kmh / MPS_TO_KMH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_distance() {
        let p = LatLon::new(52.37, 4.89);
        assert_eq!(haversine_m(p, p), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree along a meridian = R * π / 180
        let d = haversine_m(LatLon::new(10.0, 20.0), LatLon::new(11.0, 20.0));
        let expected = EARTH_RADIUS_M * core::f64::consts::PI / 180.0;
        assert!((d - expected).abs() < 1e-6, "got {}", d);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = LatLon::new(48.8566, 2.3522);
        let b = LatLon::new(51.5074, -0.1278);
        assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-9);
        // Paris - London is roughly 343 km
        assert!((haversine_m(a, b) - 343_500.0).abs() < 2_000.0);
    }

    #[test]
    fn test_offset_north_is_exact() {
        let origin = LatLon::new(37.0, -122.0);
        let moved = origin.offset_m(10.0, 0.0);
        assert!((origin.distance_to(&moved) - 10.0).abs() < 1e-6);
        assert_eq!(moved.lon, origin.lon);
    }

    #[test]
    fn test_offset_east_is_close() {
        let origin = LatLon::new(37.0, -122.0);
        let moved = origin.offset_m(0.0, 25.0);
        assert!((origin.distance_to(&moved) - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_speed_conversions() {
        assert!((mps_to_kmh(10.0) - 36.0).abs() < 1e-4);
        assert!((kmh_to_mps(36.0) - 10.0).abs() < 1e-4);
    }
}
