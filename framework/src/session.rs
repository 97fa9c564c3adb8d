//! Detection session
//!
//! Owns every piece of mutable state in the pipeline: tracker, conditioner,
//! classifier, display list, highlighted segments and peer positions. All
//! inputs arrive through `&mut self` methods, so one owner serializes the
//! position stream, the motion stream and remote messages.
//!
//! ## Lifecycle
//!
//! 1. [`DetectionSession::new`] - construct with a config and a sink
//! 2. [`DetectionSession::start`] - subscribe to both sources (needs permission)
//! 3. feed [`on_fix`](DetectionSession::on_fix) / [`on_sample`](DetectionSession::on_sample) /
//!    [`on_remote_message`](DetectionSession::on_remote_message)
//! 4. [`DetectionSession::stop`] - unsubscribe and discard detector state
//!
//! Fixes, location errors and motion samples are only consumed between
//! `start` and `stop`. Remote messages are accepted at any time. Every
//! `start` begins cold, from Armed with a fresh conditioner; the path and
//! the display list survive a restart.

use std::collections::{HashMap, VecDeque};

use log::{debug, info, warn};
use serde::Serialize;

use crate::classifier::{BumpClassifier, GateState};
use crate::conditioner::SignalConditioner;
use crate::config::DetectorConfig;
use crate::segment::SegmentCorrelator;
use crate::sink::EventSink;
use crate::tracker::{FixOutcome, GeoTracker};
use crate::tuning::{TuningMode, TuningParams};
use crate::types::{
    AccelSample, BumpEvent, HighlightedSegment, LocationPermission, MotionPermission, Permissions,
    PositionFix,
};
use crate::wire::WireMessage;

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub samples_processed: u64,
    pub fixes_processed: u64,
    pub location_errors: u64,
    pub events_detected: u64,
    pub remote_events_received: u64,
    pub segments_highlighted: u64,
    pub publish_failures: u64,
}

pub struct DetectionSession<S: EventSink> {
    config: DetectorConfig,
    tracker: GeoTracker,
    conditioner: Box<dyn SignalConditioner>,
    classifier: BumpClassifier,
    correlator: SegmentCorrelator,
    sink: S,
    running: bool,
    events: VecDeque<BumpEvent>,
    segments: Vec<HighlightedSegment>,
    peers: HashMap<String, PositionFix>,
    stats: SessionStats,
}

impl<S: EventSink> DetectionSession<S> {
    pub fn new(config: DetectorConfig, sink: S) -> Self {
        let conditioner = config.conditioner.build();
        let classifier =
            BumpClassifier::new(config.conditioner, config.device_id.clone(), config.min_speed_kmh);
        let correlator = SegmentCorrelator::new(config.segment_backtrack_m);
        let tracker = GeoTracker::new(config.path_capacity);

        Self {
            config,
            tracker,
            conditioner,
            classifier,
            correlator,
            sink,
            running: false,
            events: VecDeque::new(),
            segments: Vec::new(),
            peers: HashMap::new(),
            stats: SessionStats::default(),
        }
    }

    /// Start consuming position fixes and motion samples
    ///
    /// Accepts a bare [`MotionPermission`] when location access is implied.
    ///
    /// # Returns
    /// * `false` if either permission was denied; detection stays stopped
    pub fn start(&mut self, permissions: impl Into<Permissions>) -> bool {
        let permissions = permissions.into();
        if !permissions.allows_detection() {
            if permissions.location == LocationPermission::Denied {
                warn!("Location permission denied, detection not started");
            } else {
                warn!("Motion permission denied, detection not started");
            }
            return false;
        }
        if permissions.motion == MotionPermission::Unsupported {
            debug!("No motion permission API, assuming granted");
        }

        self.conditioner.reset();
        self.classifier.reset();
        self.running = true;
        info!(
            "Detection started: device={}, conditioner={}, tuning={}",
            self.config.device_id,
            self.config.conditioner.as_str(),
            if self.config.tuning.is_auto() { "auto" } else { "manual" }
        );
        true
    }

    /// Stop consuming both sources and discard detector state
    pub fn stop(&mut self) {
        if self.running {
            info!(
                "Detection stopped after {} events ({} samples)",
                self.stats.events_detected, self.stats.samples_processed
            );
        }
        self.running = false;
        self.conditioner.reset();
        self.classifier.reset();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Feed a position fix from the location source
    ///
    /// Ignored while stopped. Out-of-order fixes are dropped by the tracker
    /// and not published.
    pub fn on_fix(&mut self, fix: PositionFix) -> FixOutcome {
        if !self.running {
            return FixOutcome::ignored();
        }
        self.stats.fixes_processed += 1;
        let outcome = self.tracker.on_fix(fix.clone());
        if !outcome.accepted {
            return outcome;
        }
        if let Some(kmh) = outcome.speed_kmh {
            debug!("Speed {:.1} km/h", kmh);
        }
        self.publish(WireMessage::position(self.config.device_id.clone(), fix));
        outcome
    }

    /// Location source reported an error; tracking continues on the next fix
    pub fn on_location_error(&mut self, message: &str) {
        if !self.running {
            return;
        }
        self.stats.location_errors += 1;
        warn!("Location source error: {}", message);
    }

    /// Feed an accelerometer sample
    ///
    /// # Returns
    /// * The detected event, if any (already listed and published)
    pub fn on_sample(&mut self, sample: &AccelSample) -> Option<BumpEvent> {
        if !self.running {
            return None;
        }
        self.stats.samples_processed += 1;

        let signal = self.conditioner.on_sample(sample);
        let speed_kmh = self.tracker.speed_kmh();
        let tuning = self.config.tuning.resolve(speed_kmh);

        let event = self.classifier.classify(
            &signal,
            sample.timestamp_ms,
            tuning,
            self.tracker.latest_fix(),
            speed_kmh,
        )?;
        self.stats.events_detected += 1;
        info!(
            "Bump {} at {:?}: accel={:.2} m/s², speed={:.1} km/h, score={:.2}",
            event.id,
            event.coords,
            event.accel_magnitude,
            event.speed_kmh,
            event.score.unwrap_or(0.0)
        );

        if self.is_strong(&event) {
            self.highlight(&event);
        }

        self.push_event(event.clone());
        self.publish(WireMessage::bump(event.clone()));
        Some(event)
    }

    /// Accept a message from the relay
    ///
    /// Remote bumps go to the display list unchanged; remote positions update
    /// the peer table. Local detector state is never touched.
    pub fn on_remote_message(&mut self, message: WireMessage) {
        match message {
            WireMessage::Bump { event } => self.on_remote_event(event),
            WireMessage::History { events } => {
                debug!("Relay history: {} events", events.len());
                for event in events {
                    self.on_remote_event(event);
                }
            }
            WireMessage::Position { device_id, fix } => {
                self.peers.insert(device_id, fix);
            }
        }
    }

    /// Prepend a remote event to the display list, no validation or dedup
    pub fn on_remote_event(&mut self, event: BumpEvent) {
        self.stats.remote_events_received += 1;
        self.push_event(event);
    }

    /// Switch between auto and manual tuning
    pub fn set_tuning(&mut self, mode: TuningMode) {
        self.config.tuning = mode;
    }

    /// Parameters the next sample would be classified with
    pub fn current_tuning(&self) -> TuningParams {
        self.config.tuning.resolve(self.tracker.speed_kmh())
    }

    /// Severity above the configured strong score, in either metric's units
    fn is_strong(&self, event: &BumpEvent) -> bool {
        let score = event.score.unwrap_or(0.0);
        score > self.config.strong_score.max(0.0)
    }

    fn highlight(&mut self, event: &BumpEvent) {
        let Some(coords) = event.coords else {
            return;
        };
        if let Some(segment) = self
            .correlator
            .on_strong_event(&event.id, coords, self.tracker.path())
        {
            info!(
                "Highlighted {:.1} m segment ({} points) for {}",
                segment.length_m,
                segment.points.len(),
                event.id
            );
            self.stats.segments_highlighted += 1;
            self.segments.push(segment);
        }
    }

    fn push_event(&mut self, event: BumpEvent) {
        self.events.push_front(event);
        self.events.truncate(self.config.display_capacity.max(1));
    }

    fn publish(&mut self, message: WireMessage) {
        if let Err(e) = self.sink.publish(&message) {
            self.stats.publish_failures += 1;
            debug!("Publish of {} failed: {}", message.kind(), e);
        }
    }

    /// Display list, newest first
    pub fn events(&self) -> impl Iterator<Item = &BumpEvent> {
        self.events.iter()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn segments(&self) -> &[HighlightedSegment] {
        &self.segments
    }

    pub fn peers(&self) -> &HashMap<String, PositionFix> {
        &self.peers
    }

    pub fn tracker(&self) -> &GeoTracker {
        &self.tracker
    }

    pub fn gate_state(&self) -> GateState {
        self.classifier.state()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
