use garage_sense::agent::{Agent, DEFAULT_SAMPLE_INTERVAL, Hardware, Timing, Topics};
use garage_sense::clock::{Clock, ManualClock};
use garage_sense::door::{Calibration, Distance, DistanceModel, DoorState};
use garage_sense::error::AppError;
use garage_sense::identity::DeviceIdentity;
use garage_sense::link::mock::MockChannel;
use garage_sense::link::{
    ClientIdGenerator, ConnectionPhase, ConnectionSupervisor, DEFAULT_RECONNECT_BACKOFF,
};
use garage_sense::sensor::mock::{
    MockAnalogSensor, MockClimateBehavior, MockClimateSensor, MockIndicators,
};
use garage_sense::state::AgentState;
use garage_sense::telemetry::DEFAULT_TELEMETRY_INTERVAL;
use std::sync::{Arc, RwLock};
use std::time::Duration;

type MockAgent =
    Agent<MockAnalogSensor, MockClimateSensor, MockIndicators, MockChannel, ManualClock>;

fn build_agent(samples: &[u16], channel: MockChannel, clock: &ManualClock) -> MockAgent {
    build_agent_with_model(samples, channel, clock, DistanceModel::with_defaults())
}

fn build_agent_with_model(
    samples: &[u16],
    channel: MockChannel,
    clock: &ManualClock,
    model: DistanceModel,
) -> MockAgent {
    let supervisor = ConnectionSupervisor::new(
        channel,
        clock.clone(),
        DeviceIdentity::new("b8:27:eb:00:00:01"),
        ClientIdGenerator::with_seed("DistanceSenso", 7),
        "garagedoor",
        DEFAULT_RECONNECT_BACKOFF,
    );
    Agent::new(
        Hardware {
            adc: MockAnalogSensor::with_samples(samples.iter().copied()),
            climate: MockClimateSensor::new(MockClimateBehavior::ok(45.0, 18.5)),
            indicators: MockIndicators::default(),
        },
        model,
        supervisor,
        clock.clone(),
        Topics::default(),
        Timing {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            telemetry_interval: DEFAULT_TELEMETRY_INTERVAL,
        },
    )
}

fn pairs(published: &[(String, String)]) -> Vec<(&str, &str)> {
    published
        .iter()
        .map(|(topic, payload)| (topic.as_str(), payload.as_str()))
        .collect()
}

#[test]
fn opening_publishes_exactly_one_transition() {
    let clock = ManualClock::starting_at(0);
    let mut agent = build_agent(&[600, 500], MockChannel::connected(), &clock);

    for _ in 0..5 {
        agent.tick();
        clock.advance(DEFAULT_SAMPLE_INTERVAL);
    }

    let channel = agent.supervisor().channel();
    assert_eq!(channel.payloads_on("garagedoor"), vec!["garage_opened"]);
    assert_eq!(
        agent.hardware().indicators.shown(),
        &[DoorState::Closed, DoorState::Open]
    );
}

#[test]
fn hysteresis_band_holds_an_open_door() {
    let clock = ManualClock::starting_at(0);
    let model = DistanceModel::new(Calibration::default(), 20.0, 5.0);
    let mut agent = build_agent_with_model(&[500, 600], MockChannel::connected(), &clock, model);

    let baseline = agent.tick();
    let inside_band = agent.tick();

    assert_eq!(
        baseline.classification.map(|c| c.state),
        Some(DoorState::Open)
    );
    let classification = inside_band.classification.expect("sample classified");
    assert_eq!(classification.distance, Distance::Centimeters(17.0));
    assert_eq!(classification.state, DoorState::Open);
    assert!(
        agent
            .supervisor()
            .channel()
            .payloads_on("garagedoor")
            .is_empty()
    );

    agent.hardware_mut().adc.push(1023);
    agent.tick();
    assert_eq!(
        agent.supervisor().channel().payloads_on("garagedoor"),
        vec!["garage_closed"]
    );
}

#[test]
fn out_of_range_samples_classify_closed() {
    let clock = ManualClock::starting_at(0);
    let mut agent = build_agent(&[0], MockChannel::connected(), &clock);

    let outcome = agent.tick();
    let classification = outcome.classification.expect("sample classified");
    assert_eq!(classification.state, DoorState::Closed);
    assert_eq!(classification.distance, Distance::OutOfRange);

    agent.hardware_mut().adc.push(500);
    let outcome = agent.tick();
    assert_eq!(
        outcome.classification.map(|c| c.state),
        Some(DoorState::Open)
    );

    agent.hardware_mut().adc.push(2000);
    let outcome = agent.tick();
    let classification = outcome.classification.expect("sample classified");
    assert!(classification.distance.is_out_of_range());
    assert_eq!(classification.state, DoorState::Closed);

    assert_eq!(
        agent.supervisor().channel().payloads_on("garagedoor"),
        vec!["garage_opened", "garage_closed"]
    );
}

#[test]
fn humidity_failure_still_reports_ping_and_both_topics() {
    let clock = ManualClock::starting_at(0);
    let mut agent = build_agent(&[600], MockChannel::connected(), &clock);
    agent
        .hardware_mut()
        .climate
        .set_behavior(MockClimateBehavior::fail_humidity(18.5));

    agent.tick();
    assert!(agent.supervisor().channel().published().is_empty());

    clock.advance(DEFAULT_TELEMETRY_INTERVAL);
    let outcome = agent.tick();

    assert!(outcome.telemetry.is_some());
    assert_eq!(
        pairs(agent.supervisor().channel().published()),
        vec![
            ("pong", "ping"),
            ("garage_temp", "18.50"),
            ("garage_humi", "unavailable"),
        ]
    );
    assert_eq!(agent.hardware().climate.reads(), 2);
}

#[test]
fn total_climate_failure_keeps_the_schedule() {
    let clock = ManualClock::starting_at(0);
    let mut agent = build_agent(&[600], MockChannel::connected(), &clock);
    agent
        .hardware_mut()
        .climate
        .set_behavior(MockClimateBehavior::fail_all());

    clock.advance(DEFAULT_TELEMETRY_INTERVAL);
    agent.tick();
    clock.advance(Duration::from_secs(5));
    agent.tick();

    let channel = agent.supervisor().channel();
    assert_eq!(channel.payloads_on("pong"), vec!["ping"]);
    assert_eq!(channel.payloads_on("garage_temp"), vec!["unavailable"]);
    assert_eq!(channel.payloads_on("garage_humi"), vec!["unavailable"]);
}

#[test]
fn reconnect_announces_once_after_repeated_failures() {
    let clock = ManualClock::starting_at(0);
    let mut agent = build_agent(&[600], MockChannel::failing_then_connecting(3), &clock);

    agent.tick();

    assert_eq!(clock.sleeps(), vec![DEFAULT_RECONNECT_BACKOFF; 3]);
    let channel = agent.supervisor().channel();
    assert_eq!(channel.connect_attempts().len(), 4);
    assert!(
        channel
            .connect_attempts()
            .iter()
            .all(|id| id.starts_with("DistanceSenso-"))
    );
    // Fifteen seconds of backoff made the telemetry due as well.
    assert_eq!(
        pairs(channel.published()),
        vec![
            ("garagedoor", "sensor_online"),
            ("pong", "ping"),
            ("garage_temp", "18.50"),
            ("garage_humi", "45.00"),
        ]
    );
    assert_eq!(agent.supervisor().connections(), 1);
    assert_eq!(agent.supervisor().attempts(), 0);
}

#[test]
fn broker_loss_mid_run_reconnects_before_publishing() {
    let clock = ManualClock::starting_at(0);
    let mut agent = build_agent(&[600, 600, 500], MockChannel::connected(), &clock);

    agent.tick();
    agent.tick();
    let polls_before = agent.supervisor().channel().polls();
    agent.supervisor_mut().channel_mut().go_offline(1);
    agent.supervisor_mut().channel_mut().clear_published();

    agent.tick();

    let channel = agent.supervisor().channel();
    assert!(channel.polls() > polls_before);
    assert_eq!(
        pairs(channel.published()),
        vec![
            ("garagedoor", "sensor_online"),
            ("garagedoor", "garage_opened"),
        ]
    );
    assert_eq!(clock.sleeps(), vec![DEFAULT_RECONNECT_BACKOFF]);
    assert_eq!(agent.supervisor().connections(), 1);
}

#[test]
fn failed_publish_is_dropped_without_reconnecting() {
    let clock = ManualClock::starting_at(0);
    let mut agent = build_agent(&[600, 500, 600], MockChannel::connected(), &clock);

    agent.tick();
    agent.supervisor_mut().channel_mut().set_fail_publish(true);
    let outcome = agent.tick();

    assert!(outcome.edge.is_some());
    assert_eq!(agent.supervisor().phase(), ConnectionPhase::Disconnected);
    assert!(agent.supervisor().channel().published().is_empty());

    agent.supervisor_mut().channel_mut().set_fail_publish(false);
    agent.tick();

    let channel = agent.supervisor().channel();
    assert!(channel.connect_attempts().is_empty());
    assert_eq!(channel.payloads_on("garagedoor"), vec!["garage_closed"]);
    assert_eq!(agent.supervisor().phase(), ConnectionPhase::Connected);
}

#[test]
fn shared_state_follows_the_loop() -> Result<(), AppError> {
    let clock = ManualClock::starting_at(0);
    let state = Arc::new(RwLock::new(AgentState::new(DeviceIdentity::new(
        "b8:27:eb:00:00:01",
    ))));
    let mut agent = build_agent(&[600, 500], MockChannel::disconnected(), &clock)
        .with_shared_state(Arc::clone(&state));
    let door_rx = state
        .read()
        .map_err(|_| AppError::StateLock)?
        .subscribe_door();

    agent.tick();
    clock.advance(DEFAULT_TELEMETRY_INTERVAL);
    agent.tick();

    let guard = state.read().map_err(|_| AppError::StateLock)?;
    let door = guard.door().ok_or(AppError::StateLock)?;
    assert_eq!(door.state, DoorState::Open);
    assert_eq!(door.since, door.observed_at);
    assert_eq!(
        door_rx.borrow().as_ref().map(|snapshot| snapshot.state),
        Some(DoorState::Open)
    );

    let telemetry = guard.telemetry().ok_or(AppError::StateLock)?;
    assert_eq!(telemetry.temperature_celsius, Some(18.5));
    assert_eq!(telemetry.humidity_percent, Some(45.0));

    assert!(guard.link().connected);
    assert_eq!(guard.link().connections, 1);
    assert_eq!(clock.now().0, 10_000);
    Ok(())
}
