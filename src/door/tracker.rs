use crate::door::{Distance, DoorState};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub from: DoorState,
    pub to: DoorState,
}

#[derive(Debug, Clone, Copy)]
struct TrackerState {
    previous_distance: Distance,
    previous_state: DoorState,
}

/// Edge detector over consecutive door classifications.
///
/// The first observation becomes the baseline and never produces an edge, so
/// a door that is already open at boot does not announce itself as opened.
#[derive(Debug, Default)]
pub struct StateTracker {
    state: Option<TrackerState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self { state: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn previous_state(&self) -> Option<DoorState> {
        self.state.map(|state| state.previous_state)
    }

    pub fn previous_distance(&self) -> Option<Distance> {
        self.state.map(|state| state.previous_distance)
    }

    /// True when `distance` differs from the last observed distance.
    pub fn distance_changed(&self, distance: Distance) -> bool {
        self.previous_distance() != Some(distance)
    }

    pub fn update(&mut self, distance: Distance, door: DoorState) -> Option<EdgeEvent> {
        if self.distance_changed(distance) {
            info!(distance = %distance, "New distance");
        }

        let edge = match self.state {
            Some(previous) if previous.previous_state != door => Some(EdgeEvent {
                from: previous.previous_state,
                to: door,
            }),
            _ => None,
        };

        self.state = Some(TrackerState {
            previous_distance: distance,
            previous_state: door,
        });
        edge
    }
}
