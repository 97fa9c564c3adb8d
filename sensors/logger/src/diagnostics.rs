//! Diagnostics for monitoring the detection session
//!
//! Reports are driven by recording time rather than wall time, so a replay
//! produces the same reports however fast it runs.

use log::info;
use roadpulse::SessionStats;
use serde::Serialize;

/// Input rates over the last interval
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensorRates {
    /// Measured accelerometer sample rate (Hz)
    pub accel_hz: f32,
    /// Measured position fix rate (Hz)
    pub fix_hz: f32,
}

/// One diagnostics snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    /// Recording time of the snapshot (ms)
    pub at_ms: u64,
    pub rates: SensorRates,
    pub stats: SessionStats,
    pub speed_kmh: f32,
    pub path_points: usize,
    pub displayed_events: usize,
    pub peers: usize,
    pub malformed_lines: usize,
}

impl DiagnosticsReport {
    pub fn log(&self) {
        info!(
            "t={:.1}s accel={:.0}Hz gps={:.1}Hz speed={:.1}km/h events={} (remote {}) segments={} path={} peers={} publish_fail={}",
            self.at_ms as f32 / 1000.0,
            self.rates.accel_hz,
            self.rates.fix_hz,
            self.speed_kmh,
            self.stats.events_detected,
            self.stats.remote_events_received,
            self.stats.segments_highlighted,
            self.path_points,
            self.peers,
            self.stats.publish_failures
        );
    }
}

/// Decides when a report is due and computes interval rates
pub struct DiagnosticsTimer {
    interval_ms: u64,
    last_at_ms: Option<u64>,
    last_stats: SessionStats,
}

impl DiagnosticsTimer {
    /// `interval_ms == 0` disables periodic reports
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_at_ms: None,
            last_stats: SessionStats::default(),
        }
    }

    /// Rates since the previous report, if one is due at `now_ms`
    pub fn tick(&mut self, now_ms: u64, stats: SessionStats) -> Option<SensorRates> {
        if self.interval_ms == 0 {
            return None;
        }
        let Some(last) = self.last_at_ms else {
            self.last_at_ms = Some(now_ms);
            self.last_stats = stats;
            return None;
        };
        let elapsed_ms = now_ms.saturating_sub(last);
        if elapsed_ms < self.interval_ms {
            return None;
        }

        let rates = rates_between(&self.last_stats, &stats, elapsed_ms);
        self.last_at_ms = Some(now_ms);
        self.last_stats = stats;
        Some(rates)
    }
}

pub fn rates_between(before: &SessionStats, after: &SessionStats, elapsed_ms: u64) -> SensorRates {
    if elapsed_ms == 0 {
        return SensorRates::default();
    }
    let secs = elapsed_ms as f32 / 1000.0;
    SensorRates {
        accel_hz: after.samples_processed.saturating_sub(before.samples_processed) as f32 / secs,
        fix_hz: after.fixes_processed.saturating_sub(before.fixes_processed) as f32 / secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(samples: u64, fixes: u64) -> SessionStats {
        SessionStats {
            samples_processed: samples,
            fixes_processed: fixes,
            ..Default::default()
        }
    }

    #[test]
    fn test_first_tick_only_anchors() {
        let mut timer = DiagnosticsTimer::new(1_000);
        assert!(timer.tick(5_000, stats(0, 0)).is_none());
        assert!(timer.tick(5_999, stats(50, 1)).is_none());
    }

    #[test]
    fn test_rates_over_interval() {
        let mut timer = DiagnosticsTimer::new(1_000);
        timer.tick(0, stats(0, 0));
        let rates = timer.tick(2_000, stats(100, 2)).unwrap();
        assert!((rates.accel_hz - 50.0).abs() < 1e-4, "accel {}", rates.accel_hz);
        assert!((rates.fix_hz - 1.0).abs() < 1e-4);

        // Next interval measured from the last report
        assert!(timer.tick(2_500, stats(125, 2)).is_none());
        let rates = timer.tick(3_000, stats(150, 3)).unwrap();
        assert!((rates.accel_hz - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_zero_interval_disables() {
        let mut timer = DiagnosticsTimer::new(0);
        timer.tick(0, stats(0, 0));
        assert!(timer.tick(1_000_000, stats(1, 1)).is_none());
    }
}
