//! MQTT 3.1.1 publish channel on top of the blocking `rumqttc` client.
//!
//! Every `connect` builds a brand new client/connection pair so each attempt
//! presents the broker with a fresh client identifier. The connection's event
//! loop only runs while this channel is connecting or being polled.

use crate::link::{LinkError, PublishChannel};
use rumqttc::{
    Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet, QoS, RecvTimeoutError,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_BROKER_PORT: u16 = 1883;
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

const REQUEST_CAPACITY: usize = 16;
const POLL_BUDGET: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

struct MqttSession {
    client: Client,
    connection: Connection,
}

pub struct MqttChannel {
    settings: MqttSettings,
    session: Option<MqttSession>,
    connected: bool,
}

impl MqttChannel {
    pub fn new(settings: MqttSettings) -> Self {
        Self {
            settings,
            session: None,
            connected: false,
        }
    }

    fn options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, &self.settings.host, self.settings.port);
        options.set_keep_alive(self.settings.keep_alive);
        options.set_clean_session(true);
        options
    }
}

impl PublishChannel for MqttChannel {
    fn is_connected(&self) -> bool {
        self.connected && self.session.is_some()
    }

    fn connect(&mut self, client_id: &str) -> Result<(), LinkError> {
        self.connected = false;
        self.session = None;

        let (client, mut connection) = Client::new(self.options(client_id), REQUEST_CAPACITY);
        let deadline = Instant::now() + self.settings.connect_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(LinkError::ConnectTimeout);
            }
            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(LinkError::Refused(format!("{:?}", ack.code)));
                    }
                    self.session = Some(MqttSession { client, connection });
                    self.connected = true;
                    return Ok(());
                }
                Ok(Ok(event)) => debug!(?event, "MQTT event while connecting"),
                Ok(Err(err)) => return Err(LinkError::Transport(err.to_string())),
                Err(RecvTimeoutError::Timeout) => return Err(LinkError::ConnectTimeout),
                Err(RecvTimeoutError::Disconnected) => return Err(LinkError::Disconnected),
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), LinkError> {
        let session = match (&self.session, self.connected) {
            (Some(session), true) => session,
            _ => return Err(LinkError::Disconnected),
        };
        session
            .client
            .try_publish(topic, QoS::AtMostOnce, false, payload.as_bytes().to_vec())
            .map_err(|err| LinkError::Publish(err.to_string()))
    }

    fn poll(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        loop {
            match session.connection.recv_timeout(POLL_BUDGET) {
                Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                    warn!("Broker sent disconnect");
                    self.connected = false;
                    break;
                }
                Ok(Ok(event)) => debug!(?event, "MQTT event"),
                Ok(Err(err)) => {
                    warn!(error = %err, "MQTT connection error");
                    self.connected = false;
                    break;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.connected = false;
                    break;
                }
            }
        }
        if !self.connected {
            self.session = None;
        }
    }
}
