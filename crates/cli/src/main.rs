use anyhow::Context;
use clap::Parser;
use portblink_config::{DelayKind, Manifest};
use portblink_core::bus::SystemBus;
use portblink_core::driver::BlinkDriver;
use portblink_core::metrics::BlinkMetrics;
use portblink_core::port::BusPort;
use portblink_core::snapshot::RunSnapshot;
use portblink_core::CancellationToken;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "PortBlink GPIO blink driver on a simulated H8/3067 port", long_about = None)]
struct Args {
    /// Path to the board/run manifest (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many toggles
    #[arg(short = 'n', long)]
    max_toggles: Option<u64>,

    /// Stop after this much wall-clock time
    #[arg(long)]
    wall_time_ms: Option<u64>,

    /// Delay strategy: busy, sleep or none
    #[arg(short, long)]
    delay: Option<DelayKind>,

    /// Enable per-write tracing
    #[arg(short, long)]
    trace: bool,

    /// Directory for result.json
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting PortBlink");

    let mut manifest = match &args.config {
        Some(path) => {
            info!("Loading manifest: {:?}", path);
            Manifest::from_file(path)?
        }
        None => {
            info!("Using default H8/3067 configuration");
            Manifest::default()
        }
    };

    if let Some(ms) = args.wall_time_ms {
        manifest.limits.wall_time_ms = Some(ms);
        // The built-in toggle cap only stands in for a missing limit.
        if args.config.is_none() && args.max_toggles.is_none() {
            manifest.limits.max_toggles = None;
        }
    }
    if let Some(max) = args.max_toggles {
        manifest.limits.max_toggles = Some(max);
    }
    if let Some(kind) = args.delay {
        manifest.delay.strategy = kind;
    }
    manifest.validate()?;

    let bus = SystemBus::from_config(&manifest.board)?;
    let port = BusPort::for_port(bus, &manifest.board.driver_port)
        .with_context(|| format!("Cannot drive port '{}'", manifest.board.driver_port))?;
    let delay = portblink_core::delay::from_config(&manifest.delay);
    if manifest.delay.strategy == DelayKind::Busy {
        info!("Busy-wait delay: expect a few seconds per toggle");
    }

    let mut driver = BlinkDriver::new(port, delay);
    let metrics = Arc::new(BlinkMetrics::new());
    driver.add_observer(metrics.clone());

    let cancel = CancellationToken::new();
    if let Some(ms) = manifest.limits.wall_time_ms {
        let token = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(ms));
            token.cancel();
        });
    }

    let report = match manifest.limits.max_toggles {
        Some(max) => driver.run_bounded(&cancel, max),
        None => driver.run(&cancel),
    };

    let (port, _) = driver.into_parts();
    let bus = port.into_bus();
    let snapshot = RunSnapshot::capture(report, &bus);

    if let Some(state) = snapshot.ports.get(&manifest.board.driver_port) {
        for value in &state.dr_writes {
            println!("{:#04x}", value);
        }
        if state.dr_write_count > state.dr_writes.len() as u64 {
            info!(
                "Printed the last {} of {} data writes",
                state.dr_writes.len(),
                state.dr_write_count
            );
        }
    }
    info!(
        "Toggles: {}, delay iterations: {}, {:.1} toggles/s",
        metrics.get_toggles(),
        metrics.get_delay_iterations(),
        metrics.get_toggles_per_sec()
    );

    if let Some(dir) = args.output_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output dir {:?}", dir))?;
        let path = dir.join("result.json");
        std::fs::write(&path, snapshot.to_json()?)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!("Wrote {:?}", path);
    }

    Ok(())
}
