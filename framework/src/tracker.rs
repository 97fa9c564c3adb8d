//! Geo tracker: latest fix, speed and travelled path
//!
//! Consumes position fixes from the location source and maintains three
//! pieces of state for the rest of the pipeline:
//!
//! - the latest fix (geotag for the next bump event)
//! - the current speed in km/h (input to the auto-tuner)
//! - a bounded path history (input to the segment correlator and rendering)
//!
//! ## Speed derivation
//!
//! Receivers that report ground speed are trusted directly. Otherwise speed
//! is derived from the haversine distance to the previous fix divided by the
//! elapsed time. Fixes closer than 0.5 s apart are too noisy, fixes more than
//! 15 s apart are stale; both leave the speed untouched. The result is clamped
//! to 0-180 km/h so a single GPS jump can't retune the detector.
//!
//! A fix older than the latest one is dropped: it never becomes the geotag,
//! never enters the path and never updates the speed.

use std::collections::VecDeque;

use log::debug;

use crate::geo::{haversine_m, mps_to_kmh, LatLon};
use crate::types::PositionFix;

/// Maximum number of points retained in the path
pub const DEFAULT_PATH_CAPACITY: usize = 10_000;

/// Upper clamp for any speed estimate (km/h)
pub const MAX_SPEED_KMH: f32 = 180.0;

/// Elapsed-time window for position-based speed (seconds, both exclusive)
pub const MIN_SPEED_DT_S: f64 = 0.5;
pub const MAX_SPEED_DT_S: f64 = 15.0;

/// Ordered, deduplicated, capacity-bounded list of visited points
#[derive(Debug, Clone)]
pub struct Path {
    points: VecDeque<LatLon>,
    capacity: usize,
}

impl Path {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a point unless it equals the newest one
    ///
    /// Evicts from the head once the capacity is exceeded.
    ///
    /// # Returns
    /// * `true` if the point was appended
    pub fn push(&mut self, point: LatLon) -> bool {
        if self.points.back() == Some(&point) {
            return false;
        }
        self.points.push_back(point);
        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest point
    pub fn last(&self) -> Option<&LatLon> {
        self.points.back()
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LatLon> + ExactSizeIterator {
        self.points.iter()
    }

    /// Newest to oldest
    pub fn iter_rev(&self) -> impl Iterator<Item = &LatLon> + ExactSizeIterator {
        self.points.iter().rev()
    }

    pub fn to_vec(&self) -> Vec<LatLon> {
        self.points.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PATH_CAPACITY)
    }
}

/// Result of feeding one fix to the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixOutcome {
    /// New speed estimate, if this fix produced one
    pub speed_kmh: Option<f32>,
    pub path_appended: bool,
    /// `false` when the fix was dropped and tracker state is unchanged
    pub accepted: bool,
}

impl FixOutcome {
    pub fn ignored() -> Self {
        Self {
            speed_kmh: None,
            path_appended: false,
            accepted: false,
        }
    }
}

/// Tracks position, speed and path for one device
#[derive(Debug, Clone, Default)]
pub struct GeoTracker {
    path: Path,
    latest: Option<PositionFix>,
    speed_kmh: f32,
}

impl GeoTracker {
    pub fn new(path_capacity: usize) -> Self {
        Self {
            path: Path::with_capacity(path_capacity),
            latest: None,
            speed_kmh: 0.0,
        }
    }

    /// Process a new position fix
    ///
    /// Records the fix as the latest one, even when no speed update is
    /// produced, unless it is older than the current latest fix.
    pub fn on_fix(&mut self, fix: PositionFix) -> FixOutcome {
        if let Some(latest) = &self.latest {
            if fix.timestamp_ms < latest.timestamp_ms {
                debug!(
                    "Dropping out-of-order fix ({} ms < latest {} ms)",
                    fix.timestamp_ms, latest.timestamp_ms
                );
                return FixOutcome::ignored();
            }
        }

        let speed_kmh = match fix.speed_mps {
            Some(native) if native >= 0.0 && native.is_finite() => Some(mps_to_kmh(native)),
            _ => self.derive_speed(&fix),
        }
        .map(|kmh| kmh.clamp(0.0, MAX_SPEED_KMH));

        if let Some(kmh) = speed_kmh {
            self.speed_kmh = kmh;
        }

        let path_appended = self.path.push(fix.coords());
        self.latest = Some(fix);

        FixOutcome {
            speed_kmh,
            path_appended,
            accepted: true,
        }
    }

    /// Position-based speed against the previous fix (km/h)
    ///
    /// `None` when there is no previous fix or the elapsed time falls
    /// outside (0.5 s, 15 s).
    fn derive_speed(&self, fix: &PositionFix) -> Option<f32> {
        let prev = self.latest.as_ref()?;
        let dt_ms = fix.timestamp_ms.checked_sub(prev.timestamp_ms)?;
        let dt = dt_ms as f64 / 1000.0;

        if dt <= MIN_SPEED_DT_S || dt >= MAX_SPEED_DT_S {
            return None;
        }

        let dist = haversine_m(prev.coords(), fix.coords());
        Some(mps_to_kmh((dist / dt) as f32))
    }

    pub fn latest_fix(&self) -> Option<&PositionFix> {
        self.latest.as_ref()
    }

    /// Current speed estimate (km/h), zero until the first estimate
    pub fn speed_kmh(&self) -> f32 {
        self.speed_kmh
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reset(&mut self) {
        self.path.clear();
        self.latest = None;
        self.speed_kmh = 0.0;
    }
}
