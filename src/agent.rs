//! The agent loop: supervise the broker link, service telemetry, sample the
//! door sensor, publish edges, then idle until the next tick.

use crate::clock::Clock;
use crate::door::{Classification, DistanceModel, DoorState, EdgeEvent, StateTracker};
use crate::link::{ConnectionPhase, ConnectionSupervisor, PublishChannel, Session};
use crate::sensor::{AnalogSensor, ClimateSensor, IndicatorSink};
use crate::state::{AgentState, DoorSnapshot, LinkSnapshot, TelemetrySnapshot};
use crate::telemetry::{PING_PAYLOAD, TelemetryBatch, TelemetryScheduler};
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(900);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Topics {
    /// Door transitions and the online announcement.
    pub door: String,
    pub liveness: String,
    pub temperature: String,
    pub humidity: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            door: "garagedoor".to_string(),
            liveness: "pong".to_string(),
            temperature: "garage_temp".to_string(),
            humidity: "garage_humi".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub sample_interval: Duration,
    pub telemetry_interval: Duration,
}

pub struct Hardware<A, H, I> {
    pub adc: A,
    pub climate: H,
    pub indicators: I,
}

#[derive(Debug, Default)]
pub struct TickOutcome {
    /// `None` when the ADC could not be read this tick.
    pub classification: Option<Classification>,
    pub edge: Option<EdgeEvent>,
    pub telemetry: Option<TelemetryBatch>,
}

pub struct Agent<A, H, I, P, K> {
    hardware: Hardware<A, H, I>,
    model: DistanceModel,
    tracker: StateTracker,
    scheduler: TelemetryScheduler,
    supervisor: ConnectionSupervisor<P, K>,
    clock: K,
    topics: Topics,
    sample_interval: Duration,
    shared: Option<Arc<RwLock<AgentState>>>,
    last_connected_at: Option<SystemTime>,
    seen_connections: u32,
}

impl<A, H, I, P, K> Agent<A, H, I, P, K>
where
    A: AnalogSensor,
    H: ClimateSensor,
    I: IndicatorSink,
    P: PublishChannel,
    K: Clock,
{
    pub fn new(
        hardware: Hardware<A, H, I>,
        model: DistanceModel,
        supervisor: ConnectionSupervisor<P, K>,
        clock: K,
        topics: Topics,
        timing: Timing,
    ) -> Self {
        let scheduler = TelemetryScheduler::new(timing.telemetry_interval, clock.now());
        Self {
            hardware,
            model,
            tracker: StateTracker::new(),
            scheduler,
            supervisor,
            clock,
            topics,
            sample_interval: timing.sample_interval,
            shared: None,
            last_connected_at: None,
            seen_connections: 0,
        }
    }

    /// Mirror every tick into `state` for readers on other threads.
    pub fn with_shared_state(mut self, state: Arc<RwLock<AgentState>>) -> Self {
        self.shared = Some(state);
        self
    }

    pub fn hardware(&self) -> &Hardware<A, H, I> {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut Hardware<A, H, I> {
        &mut self.hardware
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor<P, K> {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut ConnectionSupervisor<P, K> {
        &mut self.supervisor
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    /// One full iteration, without the trailing idle wait.
    pub fn tick(&mut self) -> TickOutcome {
        let mut session = self.supervisor.ensure();

        let telemetry = self
            .scheduler
            .maybe_run(self.clock.now(), &mut self.hardware.climate);
        if let Some(batch) = &telemetry {
            publish_logged(&mut session, &self.topics.liveness, PING_PAYLOAD);
            publish_logged(
                &mut session,
                &self.topics.temperature,
                &batch.temperature_payload(),
            );
            publish_logged(&mut session, &self.topics.humidity, &batch.humidity_payload());
        }

        let mut outcome = TickOutcome {
            telemetry,
            ..TickOutcome::default()
        };

        match self.hardware.adc.read_raw() {
            Ok(raw) => {
                let classification = self.model.classify(raw, self.tracker.previous_state());
                let baseline = !self.tracker.is_initialized();
                let edge = self
                    .tracker
                    .update(classification.distance, classification.state);

                if let Some(edge) = edge {
                    match edge.to {
                        DoorState::Open => info!(distance = %classification.distance, "Door opened"),
                        DoorState::Closed => info!(distance = %classification.distance, "Door closed"),
                    }
                    publish_logged(&mut session, &self.topics.door, edge.to.transition_payload());
                    show_indicator(&mut self.hardware.indicators, edge.to);
                } else if baseline {
                    info!(state = %classification.state, distance = %classification.distance, "Initial door state");
                    show_indicator(&mut self.hardware.indicators, classification.state);
                }

                outcome.classification = Some(classification);
                outcome.edge = edge;
            }
            Err(err) => warn!(error = %err, "Failed to sample distance sensor"),
        }

        session.flush();
        self.record(&outcome);
        outcome
    }

    /// Tick forever; the process ends only when it is killed.
    pub fn run(mut self) {
        info!(
            sample_interval_ms = self.sample_interval.as_millis() as u64,
            threshold_cm = self.model.threshold_cm(),
            "Agent loop started"
        );
        loop {
            self.tick();
            self.clock.sleep(self.sample_interval);
        }
    }

    fn record(&mut self, outcome: &TickOutcome) {
        let Some(shared) = self.shared.clone() else {
            return;
        };
        let now = SystemTime::now();
        if self.supervisor.connections() != self.seen_connections {
            self.seen_connections = self.supervisor.connections();
            self.last_connected_at = Some(now);
        }

        let Ok(mut guard) = shared.write() else {
            warn!("State lock poisoned while recording tick");
            return;
        };

        if let Some(classification) = outcome.classification {
            let since = match guard.door() {
                Some(previous) if previous.state == classification.state => previous.since,
                _ => now,
            };
            guard.set_door(DoorSnapshot {
                state: classification.state,
                distance: classification.distance,
                since,
                observed_at: now,
            });
        }

        if let Some(batch) = &outcome.telemetry {
            guard.set_telemetry(TelemetrySnapshot {
                temperature_celsius: batch.temperature.as_ref().ok().copied(),
                humidity_percent: batch.humidity.as_ref().ok().copied(),
                timestamp: now,
            });
        }

        guard.set_link(LinkSnapshot {
            connected: self.supervisor.phase() == ConnectionPhase::Connected,
            connections: self.supervisor.connections(),
            failed_attempts: self.supervisor.attempts(),
            last_connected_at: self.last_connected_at,
        });
    }
}

fn publish_logged<P, K>(session: &mut Session<'_, P, K>, topic: &str, payload: &str)
where
    P: PublishChannel,
    K: Clock,
{
    if let Err(err) = session.publish(topic, payload) {
        warn!(topic, payload, error = %err, "Publish dropped");
    }
}

fn show_indicator<I: IndicatorSink>(indicators: &mut I, state: DoorState) {
    if let Err(err) = indicators.show(state) {
        warn!(state = %state, error = %err, "Failed to drive indicator");
    }
}

/// Run `agent` on a dedicated thread for the lifetime of the process.
pub fn spawn_agent_thread<A, H, I, P, K>(agent: Agent<A, H, I, P, K>) -> std::thread::JoinHandle<()>
where
    A: AnalogSensor + Send + 'static,
    H: ClimateSensor + Send + 'static,
    I: IndicatorSink + Send + 'static,
    P: PublishChannel + Send + 'static,
    K: Clock + Send + 'static,
{
    std::thread::spawn(move || agent.run())
}
