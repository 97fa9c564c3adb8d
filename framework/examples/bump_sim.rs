//! Simulates a short drive over a few road defects to exercise the detector
//!
//! Runs both conditioner strategies over the same synthetic trace:
//! 50 Hz accelerometer, 1 Hz GPS, a straight road heading north.
//!
//! ```text
//! t (s)   0 ──── 10 ──── 20 ──── 30 ──── 40
//! speed   0 → 40 km/h    cruise   → 90 km/h
//! defects      joint(8s)  pothole(18s)  hump(33s)
//! ```
//!
//! Run with: cargo run -p roadpulse --example bump_sim

use roadpulse::conditioner::GRAVITY;
use roadpulse::geo::kmh_to_mps;
use roadpulse::sink::MemorySink;
use roadpulse::{
    AccelSample, ConditionerKind, DetectionSession, DetectorConfig, LatLon, MotionPermission,
    PositionFix,
};

const SAMPLE_DT_MS: u64 = 20;
const DURATION_MS: u64 = 40_000;

/// Simple pseudo-random noise generator (deterministic for reproducibility)
struct NoiseGen {
    state: u32,
}

impl NoiseGen {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Returns noise in range [-amplitude, +amplitude]
    fn next(&mut self, amplitude: f32) -> f32 {
        self.state = self.state.wrapping_mul(1103515245).wrapping_add(12345);
        let normalized = (self.state as f32 / u32::MAX as f32) * 2.0 - 1.0;
        normalized * amplitude
    }
}

/// Road defect: vertical kick applied over a few samples
struct Defect {
    name: &'static str,
    at_ms: u64,
    peak: f32,
}

const DEFECTS: [Defect; 3] = [
    Defect {
        name: "expansion joint",
        at_ms: 8_000,
        peak: 13.0,
    },
    Defect {
        name: "pothole",
        at_ms: 18_000,
        peak: 32.0,
    },
    Defect {
        name: "speed hump",
        at_ms: 33_000,
        peak: 19.0,
    },
];

/// Speed profile (m/s)
fn speed_at(t_ms: u64) -> f32 {
    let t = t_ms as f32 / 1000.0;
    let kmh = if t < 10.0 {
        t * 4.0
    } else if t < 30.0 {
        40.0
    } else {
        40.0 + (t - 30.0) * 5.0
    };
    kmh_to_mps(kmh)
}

fn vertical_kick(t_ms: u64) -> f32 {
    DEFECTS
        .iter()
        .filter(|d| t_ms >= d.at_ms && t_ms < d.at_ms + 3 * SAMPLE_DT_MS)
        .map(|d| d.peak * (1.0 - (t_ms - d.at_ms) as f32 / (3 * SAMPLE_DT_MS) as f32))
        .sum()
}

fn run(kind: ConditionerKind) {
    let config = DetectorConfig {
        device_id: format!("sim-{}", kind.as_str()),
        conditioner: kind,
        ..Default::default()
    };
    let mut session = DetectionSession::new(config, MemorySink::new());
    let mut noise = NoiseGen::new(42);
    let origin = LatLon::new(48.137, 11.575);

    println!("--- {} ---", kind.as_str());
    session.start(MotionPermission::Granted);

    let mut travelled_m = 0.0f64;
    let mut t_ms = 0;
    while t_ms <= DURATION_MS {
        let speed = speed_at(t_ms);
        travelled_m += f64::from(speed) * SAMPLE_DT_MS as f64 / 1000.0;

        if t_ms % 1_000 == 0 {
            let p = origin.offset_m(travelled_m, 0.0);
            session.on_fix(
                PositionFix::new(p.lat, p.lon, t_ms)
                    .with_speed(speed)
                    .with_accuracy(5.0),
            );
        }

        // Road texture grows with speed
        let texture = 0.3 + speed * 0.05;
        let sample = AccelSample::new(
            noise.next(texture),
            noise.next(texture),
            GRAVITY + noise.next(texture) + vertical_kick(t_ms),
            t_ms,
        );

        if let Some(event) = session.on_sample(&sample) {
            println!(
                "  t={:>5.2}s  speed={:>5.1} km/h  accel={:>5.2} m/s²  score={:.2}  id={}",
                t_ms as f32 / 1000.0,
                event.speed_kmh,
                event.accel_magnitude,
                event.score.unwrap_or(0.0),
                event.id
            );
        }
        t_ms += SAMPLE_DT_MS;
    }

    session.stop();

    for segment in session.segments() {
        println!(
            "  segment for {}: {} points, {:.1} m",
            segment.event_id,
            segment.points.len(),
            segment.length_m
        );
    }

    let stats = session.stats();
    println!(
        "  samples={} fixes={} events={} segments={} published={}\n",
        stats.samples_processed,
        stats.fixes_processed,
        stats.events_detected,
        stats.segments_highlighted,
        session.sink().messages().len()
    );
}

fn main() {
    println!("=== Road Anomaly Detection Simulation ===\n");
    for defect in DEFECTS.iter() {
        println!(
            "  {:<16} at {:>4.1}s, peak {:.0} m/s²",
            defect.name,
            defect.at_ms as f32 / 1000.0,
            defect.peak
        );
    }
    println!();

    run(ConditionerKind::GravityMagnitude);
    run(ConditionerKind::HighPassJerk);

    println!("=== Simulation Complete ===");
}
