/// Detector configuration
/// Every field has a default, so partial TOML/JSON documents deserialize.
use serde::{Deserialize, Serialize};

use crate::conditioner::ConditionerKind;
use crate::segment::DEFAULT_BACKTRACK_M;
use crate::tracker::DEFAULT_PATH_CAPACITY;
use crate::tuning::TuningMode;
use crate::wire::RELAY_HISTORY_LIMIT;

/// Strong events exceed the firing threshold by more than half
pub const DEFAULT_STRONG_SCORE: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Stamped on every local event and position message
    pub device_id: String,
    /// Baseline magnitude or enhanced jerk detection
    pub conditioner: ConditionerKind,
    pub tuning: TuningMode,
    /// Severity score above which an event also highlights a path segment.
    /// Scores are relative to the firing threshold, so one value serves both
    /// the m/s² and the m/s³ metric.
    pub strong_score: f32,
    /// Optional speed floor for firing (km/h), off by default
    pub min_speed_kmh: Option<f32>,
    pub path_capacity: usize,
    /// Backtrack distance for highlighted segments (m)
    pub segment_backtrack_m: f64,
    /// Most events kept in the display list (oldest dropped)
    pub display_capacity: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            device_id: "roadpulse".to_string(),
            conditioner: ConditionerKind::GravityMagnitude,
            tuning: TuningMode::Auto,
            strong_score: DEFAULT_STRONG_SCORE,
            min_speed_kmh: None,
            path_capacity: DEFAULT_PATH_CAPACITY,
            segment_backtrack_m: DEFAULT_BACKTRACK_M,
            display_capacity: RELAY_HISTORY_LIMIT,
        }
    }
}

impl DetectorConfig {
    /// Enhanced flow: jerk metric, geotagged events, highlighted segments
    pub fn enhanced(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            conditioner: ConditionerKind::HighPassJerk,
            ..Default::default()
        }
    }
}
