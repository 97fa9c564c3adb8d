//! Replay loop
//!
//! Dispatches recorded entries to the session the way live callbacks would
//! arrive: fixes and location errors to the tracker, samples to the detector,
//! NMEA sentences through the location source first.

use log::debug;
use roadpulse::sink::EventSink;
use roadpulse::{DetectionSession, WireMessage};
use serde::Serialize;

use crate::diagnostics::{DiagnosticsReport, DiagnosticsTimer, SensorRates};
use crate::location::NmeaLocationSource;
use crate::recording::RecordEntry;

pub struct Replay<S: EventSink> {
    session: DetectionSession<S>,
    location: NmeaLocationSource,
    timer: DiagnosticsTimer,
    now_ms: u64,
    malformed_lines: usize,
}

impl<S: EventSink> Replay<S> {
    pub fn new(session: DetectionSession<S>, diagnostics_interval_ms: u64) -> Self {
        Self {
            session,
            location: NmeaLocationSource::new(),
            timer: DiagnosticsTimer::new(diagnostics_interval_ms),
            now_ms: 0,
            malformed_lines: 0,
        }
    }

    /// Process one recorded input
    ///
    /// # Returns
    /// * A diagnostics report when one fell due at this entry
    pub fn handle(&mut self, entry: RecordEntry) -> Option<DiagnosticsReport> {
        self.now_ms = self.now_ms.max(entry.timestamp_ms());

        match entry {
            RecordEntry::Accel(sample) => {
                self.session.on_sample(&sample);
            }
            RecordEntry::Fix(fix) => {
                self.session.on_fix(fix);
            }
            RecordEntry::Nmea {
                sentence,
                timestamp_ms,
            } => match self.location.feed_sentence(&sentence, timestamp_ms) {
                Some(Ok(fix)) => {
                    self.session.on_fix(fix);
                }
                Some(Err(e)) => self.session.on_location_error(&e.to_string()),
                None => debug!("Ignoring non-RMC sentence"),
            },
            RecordEntry::LocationError { message, .. } => {
                self.session.on_location_error(&message);
            }
        }

        let rates = self.timer.tick(self.now_ms, self.session.stats())?;
        Some(self.report(rates))
    }

    /// Hand relay messages to the session
    pub fn deliver(&mut self, messages: Vec<WireMessage>) {
        for message in messages {
            self.session.on_remote_message(message);
        }
    }

    pub fn set_malformed_lines(&mut self, count: usize) {
        self.malformed_lines = count;
    }

    pub fn report(&self, rates: SensorRates) -> DiagnosticsReport {
        DiagnosticsReport {
            at_ms: self.now_ms,
            rates,
            stats: self.session.stats(),
            speed_kmh: self.session.tracker().speed_kmh(),
            path_points: self.session.tracker().path().len(),
            displayed_events: self.session.event_count(),
            peers: self.session.peers().len(),
            malformed_lines: self.malformed_lines,
        }
    }

    pub fn session(&self) -> &DetectionSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DetectionSession<S> {
        &mut self.session
    }

    /// Final summary printed at exit
    pub fn summary(&self) -> ReplaySummary {
        let session = &self.session;
        ReplaySummary {
            device_id: session.config().device_id.clone(),
            conditioner: session.config().conditioner.as_str(),
            duration_ms: self.now_ms,
            stats: self.report(SensorRates::default()),
            events: session.events().cloned().collect(),
            segments: session.segments().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub device_id: String,
    pub conditioner: &'static str,
    pub duration_ms: u64,
    pub stats: DiagnosticsReport,
    /// Newest first
    pub events: Vec<roadpulse::BumpEvent>,
    pub segments: Vec<roadpulse::HighlightedSegment>,
}
