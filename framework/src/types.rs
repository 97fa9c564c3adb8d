/// Sensor records and detection outputs shared by every stage
/// Inputs arrive from the location and motion sources, outputs go to the
/// event sink and the display list.
use serde::{Deserialize, Serialize};

use crate::geo::LatLon;

/// Position fix from the location source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Milliseconds, non-decreasing across fixes from one source
    pub timestamp_ms: u64,
    /// Ground speed reported by the receiver (m/s)
    #[serde(default)]
    pub speed_mps: Option<f32>,
    /// Horizontal accuracy reported by the receiver (m)
    #[serde(default)]
    pub accuracy_m: Option<f32>,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: u64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            speed_mps: None,
            accuracy_m: None,
        }
    }

    pub fn with_speed(mut self, speed_mps: f32) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn with_accuracy(mut self, accuracy_m: f32) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }

    pub fn coords(&self) -> LatLon {
        LatLon::new(self.latitude, self.longitude)
    }
}

/// Raw gravity-inclusive accelerometer sample (m/s²)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub timestamp_ms: u64,
}

impl AccelSample {
    pub fn new(x: f32, y: f32, z: f32, timestamp_ms: u64) -> Self {
        Self { x, y, z, timestamp_ms }
    }

    pub fn axes(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean norm of the three axes
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A detected road anomaly
///
/// Built exactly once by the classifier (or received from a peer) and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BumpEvent {
    pub id: String,
    pub device_id: String,
    pub timestamp_ms: u64,
    /// Latest fix at classification time; `None` only for detectors that may
    /// fire before the first fix
    pub coords: Option<LatLon>,
    /// Gravity-subtracted acceleration magnitude (m/s²)
    pub accel_magnitude: f32,
    pub speed_kmh: f32,
    /// Relative excess over the firing threshold
    #[serde(default)]
    pub score: Option<f32>,
}

/// Stretch of travelled path associated with a strong event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedSegment {
    pub event_id: String,
    /// Oldest first, ends at the event location
    pub points: Vec<LatLon>,
    /// Arc length covered by `points` (meters)
    pub length_m: f64,
}

/// Outcome of the motion source's one-time permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPermission {
    Granted,
    Denied,
    /// The platform exposes no (or a malformed) permission API
    Unsupported,
}

impl MotionPermission {
    /// Missing permission APIs degrade to an implicit grant
    pub fn allows_detection(self) -> bool {
        !matches!(self, MotionPermission::Denied)
    }
}

/// Outcome of the location source's permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPermission {
    Granted,
    Denied,
}

/// Both permission outcomes, gathered once before detection starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub motion: MotionPermission,
    pub location: LocationPermission,
}

impl Permissions {
    pub fn new(motion: MotionPermission, location: LocationPermission) -> Self {
        Self { motion, location }
    }

    pub fn allows_detection(self) -> bool {
        self.motion.allows_detection() && self.location == LocationPermission::Granted
    }
}

/// Motion outcome alone; location is assumed granted
impl From<MotionPermission> for Permissions {
    fn from(motion: MotionPermission) -> Self {
        Self::new(motion, LocationPermission::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_norm() {
        let s = AccelSample::new(3.0, 4.0, 0.0, 0);
        assert!((s.norm() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_fix_builders() {
        let fix = PositionFix::new(1.0, 2.0, 10).with_speed(3.5).with_accuracy(4.0);
        assert_eq!(fix.speed_mps, Some(3.5));
        assert_eq!(fix.accuracy_m, Some(4.0));
        assert_eq!(fix.coords(), LatLon::new(1.0, 2.0));
    }

    #[test]
    fn test_permission_degrades_to_grant() {
        assert!(MotionPermission::Granted.allows_detection());
        assert!(MotionPermission::Unsupported.allows_detection());
        assert!(!MotionPermission::Denied.allows_detection());
    }

    #[test]
    fn test_either_denial_blocks_detection() {
        use LocationPermission as Location;
        use MotionPermission as Motion;

        assert!(Permissions::from(Motion::Granted).allows_detection());
        assert!(Permissions::new(Motion::Unsupported, Location::Granted).allows_detection());
        assert!(!Permissions::new(Motion::Granted, Location::Denied).allows_detection());
        assert!(!Permissions::new(Motion::Denied, Location::Granted).allows_detection());
    }

    #[test]
    fn test_fix_deserializes_without_optional_fields() {
        let fix: PositionFix =
            serde_json::from_str(r#"{"latitude":1.5,"longitude":2.5,"timestamp_ms":7}"#).unwrap();
        assert_eq!(fix, PositionFix::new(1.5, 2.5, 7));
    }
}
