//! Services running together against mock collaborators, on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use smart_vent::hal::{MockDisplay, MockLink};
use smart_vent::services::{
    inbound_channel, CommandReceiver, ControlLoopDriver, Operator, TelemetryPublisher,
};
use smart_vent::{
    ControlConfig, FanState, InboundMessage, OperatorCommand, SensorSimulator, SharedControlState,
};

const AIR_QUALITY: &str = "ghisjlgoc/air_quality";
const UPDATE: &str = "ghisjlgoc/update";

async fn at(start: Instant, millis: u64) {
    time::sleep_until(start + Duration::from_millis(millis)).await;
}

// ============================================================================
// Telemetry Across Link Outages
// ============================================================================

#[tokio::test(start_paused = true)]
async fn publish_resumes_after_reconnect() {
    let state = Arc::new(SharedControlState::new(1050));
    let link = Arc::new(MockLink::disconnected());
    let start = Instant::now();
    let mut telemetry =
        TelemetryPublisher::spawn(Arc::clone(&state), Arc::clone(&link), AIR_QUALITY, 10).unwrap();

    at(start, 25_000).await;
    assert!(link.published().is_empty());

    link.set_connected(true);
    state.set_reading(1337);

    at(start, 30_500).await;
    assert_eq!(link.published_to(AIR_QUALITY), vec!["1337"]);

    telemetry.stop().await;
}

#[tokio::test(start_paused = true)]
async fn operator_drives_link_and_interval() {
    let state = Arc::new(SharedControlState::new(1050));
    let link = Arc::new(MockLink::disconnected());
    let display = Arc::new(MockDisplay::new());
    let start = Instant::now();
    let mut telemetry =
        TelemetryPublisher::spawn(Arc::clone(&state), Arc::clone(&link), AIR_QUALITY, 10).unwrap();
    let operator = Operator::new(
        Arc::clone(&state),
        Arc::clone(&link),
        Arc::clone(&display),
        telemetry.handle(),
    );

    operator.apply(OperatorCommand::Messaging(true)).await.unwrap();
    operator.apply(OperatorCommand::SetInterval(2)).await.unwrap();

    // Fires at 2s, 4s, 6s
    at(start, 6_500).await;
    assert_eq!(link.published().len(), 3);

    operator.apply(OperatorCommand::Messaging(false)).await.unwrap();
    at(start, 20_000).await;
    assert_eq!(link.published().len(), 3);

    telemetry.stop().await;
}

// ============================================================================
// Full Wiring
// ============================================================================

#[tokio::test(start_paused = true)]
async fn services_share_one_state() {
    let config = ControlConfig::default();
    let state = Arc::new(SharedControlState::from_config(&config));
    let display = Arc::new(MockDisplay::new());
    let link = Arc::new(MockLink::new());
    let (inbound_tx, inbound_rx) = inbound_channel();
    let start = Instant::now();

    let mut control = ControlLoopDriver::with_simulator(
        Arc::clone(&state),
        Arc::clone(&display),
        &config,
        SensorSimulator::seeded(2024),
    );
    control.start().unwrap();
    let receiver = CommandReceiver::new(Arc::clone(&state), Arc::clone(&display)).spawn(inbound_rx);
    let mut telemetry =
        TelemetryPublisher::spawn(Arc::clone(&state), Arc::clone(&link), AIR_QUALITY, 10).unwrap();

    at(start, 10_500).await;
    let published = link.published_to(AIR_QUALITY);
    assert_eq!(published.len(), 1);
    assert!(published[0].parse::<i64>().is_ok());

    // Remote peer takes the fan
    for payload in ["mode_manual", "fan_on"] {
        inbound_tx
            .send(InboundMessage::new(UPDATE, payload))
            .await
            .unwrap();
    }
    at(start, 11_000).await;
    assert!(state.manual_fan());
    assert_eq!(state.fan_state(), FanState::On);

    // The control loop keeps ticking but leaves the fan alone
    at(start, 30_500).await;
    assert_eq!(state.fan_state(), FanState::On);
    assert_eq!(link.published_to(AIR_QUALITY).len(), 3);

    // Shutdown order: telemetry, control, then close the inbound channel
    telemetry.stop().await;
    control.stop().await;
    drop(inbound_tx);
    receiver.await.unwrap();

    let published = link.published().len();
    let refreshes = display.refresh_count();
    at(start, 120_000).await;
    assert_eq!(link.published().len(), published);
    assert_eq!(display.refresh_count(), refreshes);
}

#[tokio::test(start_paused = true)]
async fn manual_sensor_feeds_control_loop() {
    let config = ControlConfig::default();
    let state = Arc::new(SharedControlState::from_config(&config));
    let display = Arc::new(MockDisplay::new());
    let link = Arc::new(MockLink::new());
    let start = Instant::now();
    let mut telemetry =
        TelemetryPublisher::spawn(Arc::clone(&state), Arc::clone(&link), AIR_QUALITY, 10).unwrap();
    let operator = Operator::new(
        Arc::clone(&state),
        Arc::clone(&link),
        Arc::clone(&display),
        telemetry.handle(),
    );

    operator.apply(OperatorCommand::ManualSensor(true)).await.unwrap();
    operator.apply(OperatorCommand::SetReading(1500)).await.unwrap();

    let mut control = ControlLoopDriver::with_simulator(
        Arc::clone(&state),
        Arc::clone(&display),
        &config,
        SensorSimulator::seeded(1),
    );
    control.start().unwrap();

    at(start, 2_500).await;
    assert_eq!(state.reading(), 1500);
    assert_eq!(state.fan_state(), FanState::On);

    operator.apply(OperatorCommand::SetReading(800)).await.unwrap();
    at(start, 4_500).await;
    assert_eq!(state.fan_state(), FanState::Off);

    at(start, 10_500).await;
    assert_eq!(link.published_to(AIR_QUALITY), vec!["800"]);

    control.stop().await;
    telemetry.stop().await;
}
