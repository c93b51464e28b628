//! Smart vent daemon.
//!
//! Runs the control loop, the telemetry publisher and the command receiver
//! against one shared state, renders through `tracing`, and reads operator
//! commands from stdin (see [`smart_vent::OperatorCommand`]).
//!
//! # Usage
//!
//! ```sh
//! ventd                              # defaults, messaging off
//! ventd --mqtt                       # connect to the broker on start
//! ventd --config vent.toml --seed 7  # config file, reproducible sensor
//! RUST_LOG=smart_vent=debug ventd    # verbose
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smart_vent::hal::LogDisplay;
use smart_vent::services::{
    inbound_channel, CommandReceiver, ControlLoopDriver, MqttLink, Operator, TelemetryPublisher,
};
use smart_vent::{Config, MessagingLink, OperatorCommand, SensorSimulator, SharedControlState};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "ventd")]
#[command(about = "Simulated CO2 ventilation controller with MQTT telemetry")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Broker host (overrides config file)
    #[arg(long)]
    host: Option<String>,

    /// Broker port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Seed the sensor simulator for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Connect to the broker on start
    #[arg(long)]
    mqtt: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(host) = &args.host {
        config.mqtt.host = host.clone();
    }
    if let Some(port) = args.port {
        config.mqtt.port = port;
    }
    if args.mqtt {
        config.mqtt.connect_on_start = true;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(
        broker = %format!("{}:{}", config.mqtt.host, config.mqtt.port),
        target = config.control.target,
        band = config.control.band,
        interval_secs = config.telemetry.interval_secs,
        "starting smart vent"
    );

    let state = Arc::new(SharedControlState::from_config(&config.control));
    let display = Arc::new(LogDisplay::new());
    let (inbound_tx, inbound_rx) = inbound_channel();
    let link = Arc::new(MqttLink::new(
        config.mqtt.clone(),
        config.mqtt.update_topic(),
        inbound_tx,
    ));

    // Control loop
    let simulator = args
        .seed
        .map_or_else(SensorSimulator::new, SensorSimulator::seeded);
    let mut control = ControlLoopDriver::with_simulator(
        Arc::clone(&state),
        Arc::clone(&display),
        &config.control,
        simulator,
    );
    control.start()?;

    // Remote commands
    let receiver = CommandReceiver::new(Arc::clone(&state), Arc::clone(&display)).spawn(inbound_rx);

    // Telemetry
    let mut telemetry = TelemetryPublisher::spawn(
        Arc::clone(&state),
        Arc::clone(&link),
        config.mqtt.air_quality_topic(),
        config.telemetry.interval_secs,
    )?;

    let operator = Operator::new(
        Arc::clone(&state),
        Arc::clone(&link),
        Arc::clone(&display),
        telemetry.handle(),
    );
    if config.mqtt.connect_on_start {
        if let Err(e) = operator.apply(OperatorCommand::Messaging(true)).await {
            warn!(error = %e, "messaging link not available at start");
        }
    }

    // Operator console, until Ctrl-C
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received"),
            Err(e) => warn!(error = %e, "cannot listen for interrupt, shutting down"),
        }
    };
    operator
        .run_console(BufReader::new(tokio::io::stdin()), interrupt)
        .await;

    // Shutdown: telemetry first so nothing publishes on a closing link
    telemetry.stop().await;
    if let Err(e) = link.disconnect().await {
        warn!(error = %e, "unclean mqtt disconnect");
    }
    control.stop().await;

    // Dropping the last sender closes the inbound channel
    drop(operator);
    drop(link);
    if let Err(e) = receiver.await {
        warn!(error = %e, "command receiver ended abnormally");
    }
    info!("smart vent stopped");
    Ok(())
}
