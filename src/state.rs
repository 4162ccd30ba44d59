use crate::door::{Distance, DoorState};
use crate::identity::DeviceIdentity;
use std::time::SystemTime;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq)]
pub struct DoorSnapshot {
    pub state: DoorState,
    pub distance: Distance,
    /// When the door last entered `state`; the boot baseline counts as an entry.
    pub since: SystemTime,
    pub observed_at: SystemTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySnapshot {
    pub temperature_celsius: Option<f32>,
    pub humidity_percent: Option<f32>,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkSnapshot {
    pub connected: bool,
    pub connections: u32,
    pub failed_attempts: u32,
    pub last_connected_at: Option<SystemTime>,
}

/// Latest view of the agent, written by the loop thread and read by the API.
#[derive(Debug)]
pub struct AgentState {
    device: DeviceIdentity,
    door: Option<DoorSnapshot>,
    door_tx: watch::Sender<Option<DoorSnapshot>>,
    telemetry: Option<TelemetrySnapshot>,
    telemetry_tx: watch::Sender<Option<TelemetrySnapshot>>,
    link: LinkSnapshot,
}

impl AgentState {
    pub fn new(device: DeviceIdentity) -> Self {
        let (door_tx, _door_rx) = watch::channel(None);
        let (telemetry_tx, _telemetry_rx) = watch::channel(None);
        Self {
            device,
            door: None,
            door_tx,
            telemetry: None,
            telemetry_tx,
            link: LinkSnapshot::default(),
        }
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    pub fn door(&self) -> Option<&DoorSnapshot> {
        self.door.as_ref()
    }

    pub fn subscribe_door(&self) -> watch::Receiver<Option<DoorSnapshot>> {
        self.door_tx.subscribe()
    }

    /// Store and fan out, whether or not anyone is subscribed.
    pub fn set_door(&mut self, door: DoorSnapshot) {
        self.door = Some(door.clone());
        self.door_tx.send_replace(Some(door));
    }

    pub fn telemetry(&self) -> Option<&TelemetrySnapshot> {
        self.telemetry.as_ref()
    }

    pub fn subscribe_telemetry(&self) -> watch::Receiver<Option<TelemetrySnapshot>> {
        self.telemetry_tx.subscribe()
    }

    pub fn set_telemetry(&mut self, telemetry: TelemetrySnapshot) {
        self.telemetry = Some(telemetry.clone());
        self.telemetry_tx.send_replace(Some(telemetry));
    }

    pub fn link(&self) -> &LinkSnapshot {
        &self.link
    }

    pub fn set_link(&mut self, link: LinkSnapshot) {
        self.link = link;
    }
}
