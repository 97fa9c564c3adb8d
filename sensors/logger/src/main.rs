mod config;
mod diagnostics;
mod location;
mod recording;
mod replay;
mod udp_stream;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use config::SystemConfig;
use log::{info, warn};
use recording::RecordingReader;
use replay::Replay;
use roadpulse::sink::{EventSink, LogSink, NullSink, PublishError};
use roadpulse::{
    ConditionerKind, DetectionSession, LocationPermission, MotionPermission, Permissions,
    WireMessage,
};
use udp_stream::UdpSink;

#[derive(Debug, Parser)]
#[command(name = "roadpulse-logger")]
#[command(about = "Replay a recorded accelerometer/GPS stream through the bump detector")]
struct Cli {
    /// Recording to replay (JSON lines), `-` for stdin
    recording: PathBuf,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Relay address (`host:port`), overrides config and environment
    #[arg(long)]
    relay: Option<String>,
    #[arg(long = "device-id")]
    device_id: Option<String>,
    /// gravity_magnitude (baseline) or high_pass_jerk (enhanced)
    #[arg(long)]
    conditioner: Option<ConditionerKind>,
    /// Log outbound messages instead of sending them
    #[arg(long)]
    dry_run: bool,
    /// Simulated motion permission outcome
    #[arg(long, value_enum, default_value_t = PermissionArg::Granted)]
    permission: PermissionArg,
    /// Simulated location permission outcome
    #[arg(long = "location-permission", value_enum, default_value_t = LocationArg::Granted)]
    location_permission: LocationArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PermissionArg {
    Granted,
    Denied,
    Unsupported,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LocationArg {
    Granted,
    Denied,
}

impl From<LocationArg> for LocationPermission {
    fn from(arg: LocationArg) -> Self {
        match arg {
            LocationArg::Granted => LocationPermission::Granted,
            LocationArg::Denied => LocationPermission::Denied,
        }
    }
}

impl From<PermissionArg> for MotionPermission {
    fn from(arg: PermissionArg) -> Self {
        match arg {
            PermissionArg::Granted => MotionPermission::Granted,
            PermissionArg::Denied => MotionPermission::Denied,
            PermissionArg::Unsupported => MotionPermission::Unsupported,
        }
    }
}

/// Outbound link selected at startup
enum RelayLink {
    Offline(NullSink),
    DryRun(LogSink),
    Udp(UdpSink),
}

impl RelayLink {
    fn poll_inbound(&mut self) -> Vec<WireMessage> {
        match self {
            RelayLink::Udp(sink) => sink.poll_inbound(),
            _ => Vec::new(),
        }
    }

    fn describe(&self) -> String {
        match self {
            RelayLink::Offline(_) => "offline".to_string(),
            RelayLink::DryRun(_) => "dry-run (log only)".to_string(),
            RelayLink::Udp(sink) => format!("udp {}", sink.server_addr()),
        }
    }
}

impl EventSink for RelayLink {
    fn publish(&mut self, message: &WireMessage) -> Result<(), PublishError> {
        match self {
            RelayLink::Offline(sink) => sink.publish(message),
            RelayLink::DryRun(sink) => sink.publish(message),
            RelayLink::Udp(sink) => sink.publish(message),
        }
    }
}

fn load_config(cli: &Cli) -> Result<SystemConfig> {
    let mut config = match &cli.config {
        Some(path) => SystemConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SystemConfig::default(),
    };
    config
        .apply_env()
        .context("invalid environment override")?;

    if let Some(relay) = &cli.relay {
        config.relay.server = Some(relay.clone());
    }
    if let Some(device_id) = &cli.device_id {
        config.detector.device_id = device_id.clone();
    }
    if let Some(kind) = cli.conditioner {
        config.detector.conditioner = kind;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn open_link(cli: &Cli, config: &SystemConfig) -> Result<RelayLink> {
    if cli.dry_run {
        return Ok(RelayLink::DryRun(LogSink));
    }
    match &config.relay.server {
        Some(server) => {
            let sink = UdpSink::connect(&config.relay.bind, server)
                .with_context(|| format!("failed to open UDP link to {}", server))?
                .with_publish_positions(config.relay.publish_positions);
            Ok(RelayLink::Udp(sink))
        }
        None => Ok(RelayLink::Offline(NullSink)),
    }
}

fn open_recording(path: &Path) -> Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file =
        File::open(path).with_context(|| format!("failed to open recording {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let link = open_link(&cli, &config)?;

    info!("=== RoadPulse Logger ===");
    info!(
        "Device: {}, conditioner: {}, relay: {}, diagnostics every {} ms",
        config.detector.device_id,
        config.detector.conditioner.as_str(),
        link.describe(),
        config.diagnostics.interval_ms
    );

    let mut session = DetectionSession::new(config.detector.clone(), link);
    let permissions = Permissions::new(cli.permission.into(), cli.location_permission.into());
    if !session.start(permissions) {
        bail!("permission denied; nothing to detect");
    }

    let mut replay = Replay::new(session, config.diagnostics.interval_ms);
    let mut reader = RecordingReader::new(open_recording(&cli.recording)?);

    while let Some(entry) = reader.next() {
        let entry = entry.context("failed to read recording")?;
        replay.set_malformed_lines(reader.skipped());

        let inbound = replay.session_mut().sink_mut().poll_inbound();
        replay.deliver(inbound);

        if let Some(report) = replay.handle(entry) {
            report.log();
        }
    }
    replay.set_malformed_lines(reader.skipped());

    // Late relay traffic (history replies, peer bumps)
    let inbound = replay.session_mut().sink_mut().poll_inbound();
    replay.deliver(inbound);
    replay.session_mut().stop();

    if let RelayLink::Udp(sink) = replay.session().sink() {
        info!("Sent {} datagrams to {}", sink.sent(), sink.server_addr());
    }

    let summary = replay.summary();
    summary.stats.log();
    if summary.stats.malformed_lines > 0 {
        warn!("Skipped {} malformed recording lines", summary.stats.malformed_lines);
    }

    serde_json::to_writer_pretty(io::stdout().lock(), &summary)
        .context("failed to write summary")?;
    println!();
    Ok(())
}
