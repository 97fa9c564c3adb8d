//! Road Anomaly Detection Core
//!
//! Detects road surface anomalies (bumps, potholes) from a
//! phone-class accelerometer, geotags them with the latest position fix and
//! shares them with other devices through a best-effort relay.
//!
//! ## Features
//!
//! - **Speed-aware tuning**: Threshold and cooldown follow the current speed
//! - **Two signal strategies**: Gravity-subtracted magnitude or high-pass jerk
//! - **Path tracking**: Bounded, deduplicated history of visited points
//! - **Hot segments**: Strong events highlight the road that led up to them
//! - **Transport-agnostic**: Events leave through the [`sink::EventSink`] trait
//!
//! ## Architecture
//!
//! ```text
//!  accel samples          position fixes            relay messages
//!       │                       │                         │
//!       ▼                       ▼                         │
//! ┌─────────────┐        ┌─────────────┐                  │
//! │ Conditioner │        │ GeoTracker  │──▶ speed ──┐     │
//! └──────┬──────┘        └──────┬──────┘            │     │
//!        │ metric               │ latest fix / path │     │
//!        ▼                      ▼                   ▼     ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │ DetectionSession: BumpClassifier + SegmentCorrelator     │
//! └──────────────────────────┬───────────────────────────────┘
//!                            ▼
//!                  display list / EventSink
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use roadpulse::{AccelSample, DetectionSession, DetectorConfig, MotionPermission, PositionFix};
//! use roadpulse::sink::LogSink;
//!
//! let mut session = DetectionSession::new(DetectorConfig::default(), LogSink);
//! session.start(MotionPermission::Granted);
//!
//! session.on_fix(PositionFix::new(52.52, 13.40, 0).with_speed(8.0));
//! if let Some(event) = session.on_sample(&AccelSample::new(0.0, 0.0, 30.0, 20)) {
//!     println!("bump {} score {:?}", event.id, event.score);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`geo`] - Haversine distance and unit helpers
//! - [`types`] - Fixes, samples, events and segments
//! - [`tracker`] - Latest fix, speed estimate and path history
//! - [`tuning`] - Speed brackets and manual overrides
//! - [`conditioner`] - Raw sample to metric strategies
//! - [`classifier`] - Threshold and cooldown gate
//! - [`segment`] - Hot-segment backtracking
//! - [`wire`] - Relay JSON messages
//! - [`sink`] - Outbound publishing
//! - [`config`] - Detector configuration
//! - [`session`] - Orchestration

pub mod classifier;
pub mod conditioner;
pub mod config;
pub mod geo;
pub mod segment;
pub mod session;
pub mod sink;
pub mod tracker;
pub mod tuning;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use classifier::{BumpClassifier, GateState};
pub use conditioner::{ConditionedSignal, ConditionerKind, SignalConditioner};
pub use config::DetectorConfig;
pub use geo::LatLon;
pub use session::{DetectionSession, SessionStats};
pub use sink::{EventSink, PublishError};
pub use tracker::{GeoTracker, Path};
pub use tuning::{TuningError, TuningMode, TuningParams};
pub use types::{
    AccelSample, BumpEvent, HighlightedSegment, LocationPermission, MotionPermission, Permissions,
    PositionFix,
};
pub use wire::{WireError, WireMessage};
