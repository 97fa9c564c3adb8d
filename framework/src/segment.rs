//! Hot-segment correlation
//!
//! Strong events mark the stretch of road that led up to them. Starting at
//! the newest path point, the correlator walks backwards, accumulating
//! haversine distance, until it has covered the target arc length or runs
//! out of path.

use std::collections::VecDeque;

use crate::geo::{haversine_m, LatLon};
use crate::tracker::Path;
use crate::types::HighlightedSegment;

/// Default backtrack distance (meters)
pub const DEFAULT_BACKTRACK_M: f64 = 30.0;

/// Hard cap on points visited per backtrack (pathological spacing)
pub const MAX_BACKTRACK_POINTS: usize = 2_000;

#[derive(Debug, Clone, Copy)]
pub struct SegmentCorrelator {
    target_m: f64,
    max_points: usize,
}

impl SegmentCorrelator {
    pub fn new(target_m: f64) -> Self {
        Self {
            target_m,
            max_points: MAX_BACKTRACK_POINTS,
        }
    }

    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points = max_points.max(1);
        self
    }

    pub fn target_m(&self) -> f64 {
        self.target_m
    }

    /// Build the highlighted segment for a strong event
    ///
    /// # Arguments
    /// * `event_id` - Id of the triggering event
    /// * `coords` - Event location, becomes the terminal point
    /// * `path` - Travelled path, oldest first
    ///
    /// # Returns
    /// * `None` if the path has fewer than two points
    pub fn on_strong_event(
        &self,
        event_id: &str,
        coords: LatLon,
        path: &Path,
    ) -> Option<HighlightedSegment> {
        if path.len() < 2 {
            return None;
        }

        let mut walk = path.iter_rev();
        let newest = *walk.next()?;

        let mut points = VecDeque::new();
        points.push_front(newest);
        let mut length_m = 0.0;
        let mut prev = newest;

        for &point in walk.take(self.max_points) {
            length_m += haversine_m(prev, point);
            points.push_front(point);
            prev = point;
            if length_m >= self.target_m {
                break;
            }
        }

        if points.back() != Some(&coords) {
            length_m += haversine_m(newest, coords);
            points.push_back(coords);
        }

        Some(HighlightedSegment {
            event_id: event_id.to_string(),
            points: points.into(),
            length_m,
        })
    }
}

impl Default for SegmentCorrelator {
    fn default() -> Self {
        Self::new(DEFAULT_BACKTRACK_M)
    }
}
