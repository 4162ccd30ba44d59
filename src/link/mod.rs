//! Broker link supervision.
//!
//! [`ConnectionSupervisor::ensure`] is the only way to obtain a [`Session`],
//! and a `Session` is the only way to publish, so nothing can be published
//! before the channel has been brought up in the current tick.

use crate::clock::Clock;
use crate::identity::DeviceIdentity;
use nanorand::{Rng, WyRand};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod mock;
pub mod mqtt;

pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "DistanceSenso";
pub const ONLINE_PAYLOAD: &str = "sensor_online";

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("broker refused connection: {0}")]
    Refused(String),
    #[error("timed out waiting for broker acknowledgement")]
    ConnectTimeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("channel disconnected")]
    Disconnected,
}

/// Publish-only message channel to the broker.
pub trait PublishChannel {
    /// Live connectivity predicate, refreshed by [`PublishChannel::poll`].
    fn is_connected(&self) -> bool;
    /// Replace any existing session with a new one under `client_id`.
    fn connect(&mut self, client_id: &str) -> Result<(), LinkError>;
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError>;
    /// Drive pending network I/O without blocking for long.
    fn poll(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Disconnected,
    Connecting,
    Connected,
}

/// Result of a single connection attempt.
#[derive(Debug)]
pub enum ConnectStep {
    AlreadyConnected,
    Connected { client_id: String },
    Failed { client_id: String, error: LinkError },
}

pub struct ClientIdGenerator {
    prefix: String,
    rng: WyRand,
}

impl ClientIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            rng: WyRand::new(),
        }
    }

    pub fn with_seed(prefix: impl Into<String>, seed: u64) -> Self {
        Self {
            prefix: prefix.into(),
            rng: WyRand::new_seed(seed),
        }
    }

    /// `<prefix>-<random 16-bit hex>`
    pub fn next_id(&mut self) -> String {
        let suffix: u32 = self.rng.generate_range(0_u32..0x1_0000);
        format!("{}-{suffix:x}", self.prefix)
    }
}

pub struct ConnectionSupervisor<P, K> {
    channel: P,
    clock: K,
    identity: DeviceIdentity,
    ids: ClientIdGenerator,
    announce_topic: String,
    backoff: Duration,
    phase: ConnectionPhase,
    attempts: u32,
    connections: u32,
    /// Set when a connect succeeded but its announcement did not go out.
    announce_pending: bool,
}

impl<P, K> ConnectionSupervisor<P, K>
where
    P: PublishChannel,
    K: Clock,
{
    pub fn new(
        channel: P,
        clock: K,
        identity: DeviceIdentity,
        ids: ClientIdGenerator,
        announce_topic: impl Into<String>,
        backoff: Duration,
    ) -> Self {
        let phase = if channel.is_connected() {
            ConnectionPhase::Connected
        } else {
            ConnectionPhase::Disconnected
        };
        Self {
            channel,
            clock,
            identity,
            ids,
            announce_topic: announce_topic.into(),
            backoff,
            phase,
            attempts: 0,
            connections: 0,
            announce_pending: false,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Failed attempts since the channel was last connected.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Successful connections since start.
    pub fn connections(&self) -> u32 {
        self.connections
    }

    pub fn channel(&self) -> &P {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut P {
        &mut self.channel
    }

    /// Block until the channel is connected, retrying forever with a fixed backoff.
    pub fn ensure(&mut self) -> Session<'_, P, K> {
        loop {
            match self.step() {
                ConnectStep::AlreadyConnected | ConnectStep::Connected { .. } => break,
                ConnectStep::Failed { .. } => self.clock.sleep(self.backoff),
            }
        }
        Session { supervisor: self }
    }

    /// One iteration of the reconnect state machine, without the backoff wait.
    pub fn step(&mut self) -> ConnectStep {
        self.channel.poll();
        if self.channel.is_connected() && !self.announce_pending {
            self.phase = ConnectionPhase::Connected;
            return ConnectStep::AlreadyConnected;
        }

        if self.phase == ConnectionPhase::Connected {
            warn!("Broker connection lost");
        }
        self.phase = ConnectionPhase::Connecting;
        let client_id = self.ids.next_id();
        info!(
            client_id = %client_id,
            attempt = self.attempts + 1,
            "Attempting broker connection"
        );

        let result = self
            .channel
            .connect(&client_id)
            .and_then(|()| self.channel.publish(&self.announce_topic, ONLINE_PAYLOAD));
        match result {
            Ok(()) => {
                self.phase = ConnectionPhase::Connected;
                self.attempts = 0;
                self.connections += 1;
                self.announce_pending = false;
                info!(
                    client_id = %client_id,
                    device_id = %self.identity,
                    "Broker connected"
                );
                ConnectStep::Connected { client_id }
            }
            Err(error) => {
                // A session that never announced itself is replaced, not reused.
                self.announce_pending = self.channel.is_connected();
                self.attempts += 1;
                warn!(
                    client_id = %client_id,
                    attempt = self.attempts,
                    error = %error,
                    backoff_ms = self.backoff.as_millis() as u64,
                    "Broker connection failed, retrying"
                );
                ConnectStep::Failed { client_id, error }
            }
        }
    }

    fn mark_disconnected(&mut self) {
        if self.phase == ConnectionPhase::Connected {
            debug!("Marking broker link disconnected");
        }
        self.phase = ConnectionPhase::Disconnected;
    }
}

/// Publish handle valid for the remainder of the tick that called `ensure()`.
pub struct Session<'a, P, K> {
    supervisor: &'a mut ConnectionSupervisor<P, K>,
}

impl<P, K> Session<'_, P, K>
where
    P: PublishChannel,
    K: Clock,
{
    /// Publish, failing fast once the link has dropped during this tick.
    pub fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError> {
        if self.supervisor.phase != ConnectionPhase::Connected
            || !self.supervisor.channel.is_connected()
        {
            self.supervisor.mark_disconnected();
            return Err(LinkError::Disconnected);
        }
        let result = self.supervisor.channel.publish(topic, payload);
        if result.is_err() {
            self.supervisor.mark_disconnected();
        }
        result
    }

    /// Push queued publishes out and refresh connectivity.
    pub fn flush(&mut self) {
        self.supervisor.channel.poll();
    }
}
