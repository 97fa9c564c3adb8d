//! Accelerometer signal conditioning
//!
//! Two interchangeable strategies turn raw gravity-inclusive samples into the
//! metric the bump classifier gates on:
//!
//! - [`GravityMagnitudeConditioner`]: `|‖a‖ − g|`. Cheap and orientation
//!   free, but only approximate: subtracting a scalar from the norm is not
//!   the same as projecting the gravity vector out, and the error depends on
//!   how the phone is mounted.
//! - [`HighPassJerkConditioner`]: single-pole high-pass per axis, then the
//!   norm of its time derivative (jerk). Sharper on short transients such as
//!   potholes and expansion joints.
//!
//! Both keep only what the next call needs; there is no sample history.

use serde::{Deserialize, Serialize};

use crate::types::AccelSample;

/// Expected resting magnitude (m/s²)
pub const GRAVITY: f32 = 9.81;

/// Decay of the per-axis high-pass filter
pub const HIGH_PASS_ALPHA: f32 = 0.8;

/// Per-sample output of a conditioner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionedSignal {
    pub timestamp_ms: u64,
    /// Gravity-subtracted magnitude (m/s²)
    pub linear_magnitude: f32,
    /// Jerk magnitude (m/s³), only from the high-pass strategy
    pub jerk_magnitude: Option<f32>,
}

impl ConditionedSignal {
    /// Value compared against the firing threshold
    pub fn metric(&self, kind: ConditionerKind) -> f32 {
        match kind {
            ConditionerKind::GravityMagnitude => self.linear_magnitude,
            ConditionerKind::HighPassJerk => self.jerk_magnitude.unwrap_or(0.0),
        }
    }
}

/// Strategy selector, set from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionerKind {
    /// Baseline: gravity-subtracted magnitude, may fire without a fix
    #[default]
    GravityMagnitude,
    /// Enhanced: jerk of the high-passed vector, geotagged events only
    HighPassJerk,
}

impl ConditionerKind {
    pub fn build(self) -> Box<dyn SignalConditioner> {
        match self {
            ConditionerKind::GravityMagnitude => Box::new(GravityMagnitudeConditioner),
            ConditionerKind::HighPassJerk => Box::new(HighPassJerkConditioner::new()),
        }
    }

    /// Whether detections need a position fix to fire
    pub fn requires_fix(self) -> bool {
        matches!(self, ConditionerKind::HighPassJerk)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionerKind::GravityMagnitude => "gravity_magnitude",
            ConditionerKind::HighPassJerk => "high_pass_jerk",
        }
    }
}

impl core::str::FromStr for ConditionerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gravity_magnitude" | "baseline" | "magnitude" => Ok(ConditionerKind::GravityMagnitude),
            "high_pass_jerk" | "enhanced" | "jerk" => Ok(ConditionerKind::HighPassJerk),
            other => Err(format!("unknown conditioner '{}'", other)),
        }
    }
}

/// Turns raw samples into conditioned signals
pub trait SignalConditioner: Send {
    fn kind(&self) -> ConditionerKind;

    fn on_sample(&mut self, sample: &AccelSample) -> ConditionedSignal;

    /// Forget all state (next sample is treated as the first)
    fn reset(&mut self);
}

/// `|‖(x, y, z)‖ − g|`
pub fn linear_magnitude(sample: &AccelSample) -> f32 {
    (sample.norm() - GRAVITY).abs()
}

/// Stateless baseline strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct GravityMagnitudeConditioner;

impl SignalConditioner for GravityMagnitudeConditioner {
    fn kind(&self) -> ConditionerKind {
        ConditionerKind::GravityMagnitude
    }

    fn on_sample(&mut self, sample: &AccelSample) -> ConditionedSignal {
        ConditionedSignal {
            timestamp_ms: sample.timestamp_ms,
            linear_magnitude: linear_magnitude(sample),
            jerk_magnitude: None,
        }
    }

    fn reset(&mut self) {}
}

/// High-pass + derivative strategy
#[derive(Debug, Clone)]
pub struct HighPassJerkConditioner {
    alpha: f32,
    prev_raw: Option<[f32; 3]>,
    filtered: [f32; 3],
    prev_timestamp_ms: u64,
}

impl HighPassJerkConditioner {
    pub fn new() -> Self {
        Self::with_alpha(HIGH_PASS_ALPHA)
    }

    pub fn with_alpha(alpha: f32) -> Self {
        Self {
            alpha,
            prev_raw: None,
            filtered: [0.0; 3],
            prev_timestamp_ms: 0,
        }
    }

    /// Current high-passed vector
    pub fn filtered(&self) -> [f32; 3] {
        self.filtered
    }
}

impl Default for HighPassJerkConditioner {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalConditioner for HighPassJerkConditioner {
    fn kind(&self) -> ConditionerKind {
        ConditionerKind::HighPassJerk
    }

    fn on_sample(&mut self, sample: &AccelSample) -> ConditionedSignal {
        let raw = sample.axes();
        let linear = linear_magnitude(sample);

        let Some(prev_raw) = self.prev_raw else {
            // First sample seeds the filter
            self.prev_raw = Some(raw);
            self.filtered = [0.0; 3];
            self.prev_timestamp_ms = sample.timestamp_ms;
            return ConditionedSignal {
                timestamp_ms: sample.timestamp_ms,
                linear_magnitude: linear,
                jerk_magnitude: Some(0.0),
            };
        };

        let prev_filtered = self.filtered;
        for axis in 0..3 {
            self.filtered[axis] = self.alpha * (self.filtered[axis] + raw[axis] - prev_raw[axis]);
        }

        let jerk = if sample.timestamp_ms > self.prev_timestamp_ms {
            let dt = (sample.timestamp_ms - self.prev_timestamp_ms) as f32 / 1000.0;
            let mut sum_sq = 0.0;
            for axis in 0..3 {
                let d = (self.filtered[axis] - prev_filtered[axis]) / dt;
                sum_sq += d * d;
            }
            sum_sq.sqrt()
        } else {
            0.0
        };

        self.prev_raw = Some(raw);
        self.prev_timestamp_ms = sample.timestamp_ms;

        ConditionedSignal {
            timestamp_ms: sample.timestamp_ms,
            linear_magnitude: linear,
            jerk_magnitude: Some(jerk),
        }
    }

    fn reset(&mut self) {
        self.prev_raw = None;
        self.filtered = [0.0; 3];
        self.prev_timestamp_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_at_rest_is_zero() {
        let mut c = GravityMagnitudeConditioner;
        let s = c.on_sample(&AccelSample::new(0.0, 0.0, GRAVITY, 0));
        assert!(s.linear_magnitude.abs() < 1e-6);
        assert_eq!(s.jerk_magnitude, None);
    }

    #[test]
    fn test_baseline_is_orientation_free_but_absolute() {
        let mut c = GravityMagnitudeConditioner;
        // Gravity on another axis still cancels
        let tilted = c.on_sample(&AccelSample::new(GRAVITY, 0.0, 0.0, 0));
        assert!(tilted.linear_magnitude.abs() < 1e-6);

        // Free fall reads as a full g of "linear" acceleration
        let free_fall = c.on_sample(&AccelSample::new(0.0, 0.0, 0.0, 10));
        assert!((free_fall.linear_magnitude - GRAVITY).abs() < 1e-6);

        let doubled = c.on_sample(&AccelSample::new(0.0, 0.0, 2.0 * GRAVITY, 20));
        assert!((doubled.linear_magnitude - GRAVITY).abs() < 1e-5);
    }

    #[test]
    fn test_jerk_first_sample_is_zero() {
        let mut c = HighPassJerkConditioner::new();
        let s = c.on_sample(&AccelSample::new(1.0, 2.0, 9.0, 100));
        assert_eq!(s.jerk_magnitude, Some(0.0));
        assert_eq!(c.filtered(), [0.0; 3]);
    }

    #[test]
    fn test_jerk_step_response() {
        let mut c = HighPassJerkConditioner::new();
        c.on_sample(&AccelSample::new(0.0, 0.0, GRAVITY, 0));

        // +5 m/s² step on x, 20 ms later: hp_x = 0.8 * 5 = 4, jerk = 4 / 0.02
        let s = c.on_sample(&AccelSample::new(5.0, 0.0, GRAVITY, 20));
        let jerk = s.jerk_magnitude.unwrap();
        assert!((jerk - 200.0).abs() < 1e-3, "got {}", jerk);

        // Held step: hp decays to 3.2, jerk = 0.8 / 0.02
        let s = c.on_sample(&AccelSample::new(5.0, 0.0, GRAVITY, 40));
        assert!((s.jerk_magnitude.unwrap() - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_jerk_constant_signal_stays_zero() {
        let mut c = HighPassJerkConditioner::new();
        for i in 0..50u64 {
            let s = c.on_sample(&AccelSample::new(0.3, -0.2, GRAVITY, i * 20));
            assert!(s.jerk_magnitude.unwrap().abs() < 1e-6);
        }
    }

    #[test]
    fn test_jerk_non_positive_dt_is_zero() {
        let mut c = HighPassJerkConditioner::new();
        c.on_sample(&AccelSample::new(0.0, 0.0, GRAVITY, 100));
        let same_time = c.on_sample(&AccelSample::new(8.0, 0.0, GRAVITY, 100));
        assert_eq!(same_time.jerk_magnitude, Some(0.0));
        // Filter still advanced
        assert!((c.filtered()[0] - 6.4).abs() < 1e-5);

        let backwards = c.on_sample(&AccelSample::new(0.0, 0.0, GRAVITY, 50));
        assert_eq!(backwards.jerk_magnitude, Some(0.0));
    }

    #[test]
    fn test_jerk_reset_returns_to_cold_state() {
        let mut c = HighPassJerkConditioner::new();
        c.on_sample(&AccelSample::new(0.0, 0.0, GRAVITY, 0));
        c.on_sample(&AccelSample::new(4.0, 0.0, GRAVITY, 20));
        c.reset();
        let s = c.on_sample(&AccelSample::new(9.0, 9.0, 9.0, 40));
        assert_eq!(s.jerk_magnitude, Some(0.0));
    }

    #[test]
    fn test_metric_selection() {
        let signal = ConditionedSignal {
            timestamp_ms: 0,
            linear_magnitude: 3.0,
            jerk_magnitude: Some(120.0),
        };
        assert_eq!(signal.metric(ConditionerKind::GravityMagnitude), 3.0);
        assert_eq!(signal.metric(ConditionerKind::HighPassJerk), 120.0);

        let no_jerk = ConditionedSignal {
            jerk_magnitude: None,
            ..signal
        };
        assert_eq!(no_jerk.metric(ConditionerKind::HighPassJerk), 0.0);
    }

    #[test]
    fn test_build_matches_kind() {
        for kind in [ConditionerKind::GravityMagnitude, ConditionerKind::HighPassJerk] {
            assert_eq!(kind.build().kind(), kind);
        }
        assert!(ConditionerKind::HighPassJerk.requires_fix());
        assert!(!ConditionerKind::GravityMagnitude.requires_fix());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("jerk".parse::<ConditionerKind>(), Ok(ConditionerKind::HighPassJerk));
        assert_eq!(
            "Gravity_Magnitude".parse::<ConditionerKind>(),
            Ok(ConditionerKind::GravityMagnitude)
        );
        assert!("fft".parse::<ConditionerKind>().is_err());
    }
}
