//! Bump classifier
//!
//! Gates the conditioned metric with the tuned threshold and cooldown.
//!
//! ```text
//!            metric > sensitivity (gates pass)
//!   ┌───────┐ ───────────────────────────────▶ ┌─────────┐
//!   │ Armed │                                  │ Cooling │
//!   └───────┘ ◀─────────────────────────────── └─────────┘
//!              now - since >= cooldown_ms
//! ```
//!
//! No event is produced while Cooling, whatever the metric. The
//! Cooling → Armed check runs first on every call, so a sample landing
//! exactly on the cooldown boundary can fire.

use crate::conditioner::{ConditionedSignal, ConditionerKind};
use crate::tuning::TuningParams;
use crate::types::{BumpEvent, PositionFix};

/// Cooldown gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Ready to fire
    Armed,
    /// Suppressing since the last detection
    Cooling { since_ms: u64 },
}

/// Per-device bump classifier
#[derive(Debug, Clone)]
pub struct BumpClassifier {
    kind: ConditionerKind,
    device_id: String,
    min_speed_kmh: Option<f32>,
    state: GateState,
    seq: u64,
}

impl BumpClassifier {
    /// # Arguments
    /// * `kind` - Metric this classifier gates on; fixed for its lifetime
    /// * `device_id` - Stamped on every event
    /// * `min_speed_kmh` - Optional minimum speed below which nothing fires
    pub fn new(
        kind: ConditionerKind,
        device_id: impl Into<String>,
        min_speed_kmh: Option<f32>,
    ) -> Self {
        Self {
            kind,
            device_id: device_id.into(),
            min_speed_kmh,
            state: GateState::Armed,
            seq: 0,
        }
    }

    pub fn kind(&self) -> ConditionerKind {
        self.kind
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Back to a cold Armed state
    ///
    /// The id sequence is kept so ids stay unique across restarts.
    pub fn reset(&mut self) {
        self.state = GateState::Armed;
    }

    /// Decide whether this sample is a bump
    ///
    /// # Arguments
    /// * `signal` - Conditioned sample
    /// * `now_ms` - Sample time
    /// * `tuning` - Threshold and cooldown for this decision
    /// * `last_fix` - Most recent fix known before this sample
    /// * `speed_kmh` - Current speed estimate
    ///
    /// # Returns
    /// * The new event if the classifier fired
    pub fn classify(
        &mut self,
        signal: &ConditionedSignal,
        now_ms: u64,
        tuning: TuningParams,
        last_fix: Option<&PositionFix>,
        speed_kmh: f32,
    ) -> Option<BumpEvent> {
        if let GateState::Cooling { since_ms } = self.state {
            if now_ms.saturating_sub(since_ms) >= u64::from(tuning.cooldown_ms()) {
                self.state = GateState::Armed;
            } else {
                return None;
            }
        }

        let metric = signal.metric(self.kind);
        let threshold = tuning.sensitivity();
        if metric.is_nan() || metric <= threshold {
            return None;
        }

        if self.kind.requires_fix() && last_fix.is_none() {
            return None;
        }
        if let Some(min_speed) = self.min_speed_kmh {
            if speed_kmh < min_speed {
                return None;
            }
        }

        self.state = GateState::Cooling { since_ms: now_ms };
        self.seq += 1;

        Some(BumpEvent {
            id: format!("{}-{}-{}", self.device_id, now_ms, self.seq),
            device_id: self.device_id.clone(),
            timestamp_ms: now_ms,
            coords: last_fix.map(PositionFix::coords),
            accel_magnitude: signal.linear_magnitude,
            speed_kmh,
            score: Some(severity_score(metric, threshold)),
        })
    }
}

/// Relative excess of the metric over the threshold
///
/// Strictly increasing in `metric`; zero at the threshold.
pub fn severity_score(metric: f32, threshold: f32) -> f32 {
    (metric - threshold) / threshold
}
