//! Companion console for the smart vent.
//!
//! Subscribes to the air-quality topic and logs every reading it receives.
//! Each line typed on stdin is published verbatim to the update topic, so
//! `mode_manual`, `fan_on`, `fan_off` and `mode_auto` drive the vent remotely.
//!
//! # Usage
//!
//! ```sh
//! vent-console
//! vent-console --host localhost --port 1883 --prefix myvent
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use smart_vent::services::{connect_with_retry, inbound_channel, MqttLink, RetryPolicy};
use smart_vent::{Config, InboundCommand, MessagingLink};

#[derive(Parser, Debug)]
#[command(name = "vent-console")]
#[command(about = "Watch smart vent telemetry and send it commands")]
struct Args {
    /// Path to a TOML configuration file (only the [mqtt] table is used)
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Broker host (overrides config file)
    #[arg(long)]
    host: Option<String>,

    /// Broker port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Topic prefix (overrides config file)
    #[arg(long)]
    prefix: Option<String>,

    /// Client ID
    #[arg(long, default_value = "smart-vent-console")]
    client_id: String,

    /// Connect attempts before giving up
    #[arg(long, default_value_t = 10)]
    attempts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut mqtt = match &args.config {
        Some(path) => {
            Config::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?
                .mqtt
        }
        None => Config::default().mqtt,
    };
    if let Some(host) = &args.host {
        mqtt.host = host.clone();
    }
    if let Some(port) = args.port {
        mqtt.port = port;
    }
    if let Some(prefix) = &args.prefix {
        mqtt = mqtt.with_topic_prefix(prefix.as_str());
    }
    mqtt = mqtt.with_client_id(args.client_id.as_str());

    let update_topic = mqtt.update_topic();
    let (tx, mut rx) = inbound_channel();
    let link = Arc::new(MqttLink::new(mqtt.clone(), mqtt.air_quality_topic(), tx));

    let policy = RetryPolicy::default().with_attempts(args.attempts);
    connect_with_retry(&*link, policy)
        .await
        .with_context(|| format!("connecting to {}:{}", mqtt.host, mqtt.port))?;

    // Incoming readings
    let watcher = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            info!(
                topic = %message.topic,
                payload = %String::from_utf8_lossy(&message.payload),
                "received air quality"
            );
        }
    });

    // Outgoing commands
    let sender = {
        let link = Arc::clone(&link);
        let topic = update_topic.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if InboundCommand::from(line.as_str()).as_token().is_none() {
                            warn!(payload = %line, "not a vent command, sending anyway");
                        }
                        match link.publish(&topic, line.into_bytes()).await {
                            Ok(()) => info!(topic = %topic, "sent update"),
                            Err(e) => warn!(error = %e, "error sending update"),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        })
    };

    info!(
        listening = %mqtt.air_quality_topic(),
        sending = %update_topic,
        "console ready, Ctrl-C to quit"
    );
    tokio::signal::ctrl_c()
        .await
        .context("waiting for interrupt")?;

    sender.abort();
    if let Err(e) = link.disconnect().await {
        warn!(error = %e, "unclean mqtt disconnect");
    }
    drop(link);
    watcher.abort();
    info!("console stopped");
    Ok(())
}
