//! End-to-end runs through a detection session with synthetic drives

use roadpulse::conditioner::GRAVITY;
use roadpulse::sink::MemorySink;
use roadpulse::tracker::Path;
use roadpulse::tuning::params_for;
use roadpulse::{
    AccelSample, BumpEvent, ConditionerKind, DetectionSession, DetectorConfig, GateState, LatLon,
    LocationPermission, MotionPermission, Permissions, PositionFix, SessionStats, TuningMode,
    TuningParams, WireMessage,
};

const ORIGIN: LatLon = LatLon {
    lat: 51.5,
    lon: -0.12,
};

/// Drive north at constant speed: one fix per second, 50 Hz samples,
/// vertical kicks at the given sample times
fn drive(
    session: &mut DetectionSession<MemorySink>,
    seconds: u64,
    speed_mps: f64,
    kicks: &[(u64, f32)],
) -> Vec<BumpEvent> {
    let mut events = Vec::new();
    for t_ms in (0..seconds * 1_000).step_by(20) {
        if t_ms % 1_000 == 0 {
            let p = ORIGIN.offset_m(speed_mps * t_ms as f64 / 1000.0, 0.0);
            session.on_fix(PositionFix::new(p.lat, p.lon, t_ms));
        }
        let kick = kicks
            .iter()
            .find(|(at, _)| *at == t_ms)
            .map(|(_, k)| *k)
            .unwrap_or(0.0);
        let sample = AccelSample::new(0.0, 0.0, GRAVITY + kick, t_ms);
        if let Some(event) = session.on_sample(&sample) {
            events.push(event);
        }
    }
    events
}

#[test]
fn test_city_drive_detects_each_isolated_bump() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    assert!(session.start(MotionPermission::Granted));

    // 10 m/s = 36 km/h: arterial bracket, 1200 ms cooldown, threshold 14
    let kicks = [(3_000, 16.0), (3_400, 30.0), (6_000, 13.0), (8_000, 25.0)];
    let events = drive(&mut session, 10, 10.0, &kicks);

    let times: Vec<u64> = events.iter().map(|e| e.timestamp_ms).collect();
    // 3400 falls inside the cooldown of 3000, 6000 is below threshold
    assert_eq!(times, vec![3_000, 8_000]);

    for event in &events {
        assert!((event.speed_kmh - 36.0).abs() < 0.5, "speed {}", event.speed_kmh);
        assert!(event.coords.is_some());
        assert!(event.score.unwrap() > 0.0);
    }

    // Display list is newest first and mirrors what was published
    let listed: Vec<&str> = session.events().map(|e| e.id.as_str()).collect();
    assert_eq!(listed, vec![events[1].id.as_str(), events[0].id.as_str()]);
    assert_eq!(session.sink().bumps().count(), 2);
}

#[test]
fn test_strong_bump_highlights_road_behind() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    session.start(MotionPermission::Granted);

    let events = drive(&mut session, 8, 10.0, &[(7_500, 35.0)]);
    assert_eq!(events.len(), 1);

    let segments = session.segments();
    assert_eq!(segments.len(), 1);
    let segment = &segments[0];
    assert_eq!(segment.event_id, events[0].id);
    assert!(segment.length_m >= 30.0 - 1e-6, "segment {} m", segment.length_m);
    assert_eq!(segment.points.last().copied(), events[0].coords);

    // Points are consecutive path points, oldest first
    let path: Vec<LatLon> = session.tracker().path().iter().copied().collect();
    let start = path.len() - segment.points.len();
    assert_eq!(&path[start..], segment.points.as_slice());
}

#[test]
fn test_auto_tuning_tracks_speed_brackets() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    session.start(MotionPermission::Granted);

    // Native speeds in m/s: 3.6, 7.2, 50.4 and 72 km/h
    let table = [(1.0, 2500, 10.0), (2.0, 1800, 12.0), (14.0, 1200, 14.0), (20.0, 800, 16.0)];
    for (i, &(mps, cooldown, sensitivity)) in table.iter().enumerate() {
        let fix = PositionFix::new(1.0, 1.0 + i as f64 * 0.01, i as u64 * 20_000).with_speed(mps);
        session.on_fix(fix);
        let tuning = session.current_tuning();
        assert_eq!(tuning.cooldown_ms(), cooldown, "at {} m/s", mps);
        assert!((tuning.sensitivity() - sensitivity).abs() < 1e-6, "at {} m/s", mps);
    }
    assert_eq!(session.current_tuning(), params_for(72.0));
}

#[test]
fn test_manual_tuning_is_never_mixed_with_auto() {
    let manual = TuningParams::new(500, 30.0).unwrap();
    let config = DetectorConfig {
        tuning: TuningMode::Manual(manual),
        ..Default::default()
    };
    let mut session = DetectionSession::new(config, MemorySink::new());
    session.start(MotionPermission::Granted);

    for speed in [0.5, 10.0, 30.0] {
        session.on_fix(PositionFix::new(1.0, 1.0, 0).with_speed(speed));
        assert_eq!(session.current_tuning(), manual);
    }

    // 25 m/s² would fire at any auto bracket, but not at 30
    let events = drive(&mut session, 2, 5.0, &[(500, 25.0), (1_500, 31.0)]);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].timestamp_ms, 1_500);
}

#[test]
fn test_restart_begins_cold() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    session.start(MotionPermission::Granted);
    session.on_sample(&AccelSample::new(0.0, 0.0, GRAVITY + 30.0, 0));
    assert!(matches!(session.gate_state(), GateState::Cooling { since_ms: 0 }));

    session.stop();
    assert!(!session.is_running());
    assert_eq!(session.gate_state(), GateState::Armed);

    session.start(MotionPermission::Granted);
    let event = session
        .on_sample(&AccelSample::new(0.0, 0.0, GRAVITY + 30.0, 100))
        .expect("restart should be armed");
    assert_eq!(event.timestamp_ms, 100);
    // Both detections kept in the display list
    assert_eq!(session.event_count(), 2);
}

#[test]
fn test_denied_permission_consumes_nothing() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    assert!(!session.start(MotionPermission::Denied));

    let events = drive(&mut session, 3, 10.0, &[(1_000, 40.0)]);
    assert!(events.is_empty());
    assert!(session.tracker().path().is_empty());
    assert!(session.tracker().latest_fix().is_none());
    assert!(session.sink().messages().is_empty());
    assert_eq!(session.stats(), SessionStats::default());
}

#[test]
fn test_denied_location_consumes_nothing() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    let permissions = Permissions::new(MotionPermission::Granted, LocationPermission::Denied);
    assert!(!session.start(permissions));

    let events = drive(&mut session, 3, 10.0, &[(1_000, 40.0)]);
    assert!(events.is_empty());
    assert!(session.tracker().path().is_empty());
    assert!(session.sink().messages().is_empty());
}

#[test]
fn test_stopped_session_stops_tracking() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    session.start(MotionPermission::Granted);
    drive(&mut session, 3, 10.0, &[]);
    let published = session.sink().messages().len();
    let latest = session.tracker().latest_fix().cloned();

    session.stop();
    session.on_fix(PositionFix::new(2.0, 2.0, 10_000));

    assert_eq!(session.tracker().path().len(), 3);
    assert_eq!(session.tracker().latest_fix().cloned(), latest);
    assert_eq!(session.sink().messages().len(), published);
}

#[test]
fn test_out_of_order_fix_does_not_move_geotag() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    session.start(MotionPermission::Granted);
    session.on_fix(PositionFix::new(1.0, 1.0, 5_000));
    session.on_fix(PositionFix::new(9.0, 9.0, 1_000));

    let event = session
        .on_sample(&AccelSample::new(0.0, 0.0, GRAVITY + 30.0, 5_100))
        .expect("jolt should fire");
    assert_eq!(event.coords, Some(LatLon::new(1.0, 1.0)));
    assert_eq!(session.tracker().path().len(), 1);
}

#[test]
fn test_enhanced_variant_geotags_every_event() {
    let mut session = DetectionSession::new(DetectorConfig::enhanced("car-9"), MemorySink::new());
    session.start(MotionPermission::Granted);

    // A 6 m/s² step is far below the magnitude thresholds but a sharp jerk
    let events = drive(&mut session, 4, 8.0, &[(2_000, 6.0)]);
    assert_eq!(events.len(), 1);
    assert_eq!(session.config().conditioner, ConditionerKind::HighPassJerk);
    assert!(events.iter().all(|e| e.coords.is_some()));
    assert!(events[0].id.starts_with("car-9-2000-"));
}

#[test]
fn test_remote_traffic_while_idle() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    let remote = BumpEvent {
        id: "peer-77".into(),
        device_id: "peer".into(),
        timestamp_ms: 123,
        coords: Some(LatLon::new(40.0, -3.7)),
        accel_magnitude: 18.5,
        speed_kmh: 52.0,
        score: Some(0.4),
    };

    let raw = WireMessage::bump(remote.clone()).to_bytes().unwrap();
    session.on_remote_message(WireMessage::decode(&raw).unwrap());
    session.on_remote_message(WireMessage::position("peer", PositionFix::new(40.0, -3.7, 124)));

    assert_eq!(session.events().next(), Some(&remote));
    assert_eq!(session.peers().len(), 1);
    assert_eq!(session.gate_state(), GateState::Armed);
    assert!(session.tracker().latest_fix().is_none());
    assert_eq!(session.tracker().speed_kmh(), 0.0);
    assert!(session.sink().messages().is_empty());
}

#[test]
fn test_duplicate_fix_appends_once() {
    let mut session = DetectionSession::new(DetectorConfig::default(), MemorySink::new());
    session.start(MotionPermission::Granted);
    let fix = PositionFix::new(10.0, 10.0, 1_000);
    let first = session.on_fix(fix.clone());
    let second = session.on_fix(PositionFix { timestamp_ms: 2_000, ..fix });

    assert!(first.path_appended);
    assert!(!second.path_appended);
    assert_eq!(session.tracker().path().len(), 1);
    assert_eq!(session.tracker().latest_fix().unwrap().timestamp_ms, 2_000);
    assert_eq!(session.stats().fixes_processed, 2);
}

#[test]
fn test_long_drive_path_stays_bounded() {
    let config = DetectorConfig {
        path_capacity: 50,
        ..Default::default()
    };
    let mut session = DetectionSession::new(config, MemorySink::new());
    session.start(MotionPermission::Granted);
    drive(&mut session, 120, 10.0, &[]);

    let path: &Path = session.tracker().path();
    assert_eq!(path.len(), 50);
    let points: Vec<LatLon> = path.iter().copied().collect();
    assert!(points.windows(2).all(|w| w[0] != w[1]));
}
