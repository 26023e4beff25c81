//! Per-tick state snapshots as delivered by the simulator.
//!
//! A snapshot is the complete system state at one tick. It is immutable
//! once it has been stored in the buffer.
//!
//! Two producers emit slightly different shapes: the live controller sends
//! floor queues, the recorder only sends queue lengths. Both deserialize
//! into the same types here; absent collections default to empty.

use crate::{
    event::EventRecord,
    types::{ElevatorId, FloorNumber, PassengerId, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub tick: Tick,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub elevators: Vec<ElevatorState>,
    #[serde(default)]
    pub floors: Vec<FloorState>,
    /// Keyed by the passenger id as it appears on the wire (a JSON object key).
    #[serde(default)]
    pub passengers: BTreeMap<String, PassengerState>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
    #[serde(default)]
    pub metrics: Metrics,
}

impl Snapshot {
    /// The synthetic tick-0 state built from an `init` message:
    /// every elevator parked at the ground floor, every queue empty.
    pub fn zero_state(elevators_count: usize, floors_count: usize) -> Self {
        Self {
            tick: 0,
            timestamp: None,
            elevators: (0..elevators_count)
                .map(|i| ElevatorState::parked(i as ElevatorId))
                .collect(),
            floors: (0..floors_count)
                .map(|i| FloorState::empty(i as FloorNumber))
                .collect(),
            passengers: BTreeMap::new(),
            events: Vec::new(),
            metrics: Metrics::default(),
        }
    }

    pub fn passenger(&self, id: PassengerId) -> Option<&PassengerState> {
        self.passengers.get(&id.to_string())
    }

    pub fn floor(&self, floor: FloorNumber) -> Option<&FloorState> {
        self.floors.iter().find(|f| f.floor == floor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevatorState {
    pub id: ElevatorId,
    #[serde(default)]
    pub current_floor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_floor_float: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_floor: Option<FloorNumber>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub passengers: Vec<PassengerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<usize>,
}

impl ElevatorState {
    pub fn parked(id: ElevatorId) -> Self {
        Self {
            id,
            current_floor: 0.0,
            current_floor_float: None,
            target_floor: None,
            direction: Direction::Stopped,
            status: None,
            passengers: Vec::new(),
            load: None,
        }
    }

    /// Position in floors. The fractional position wins when the producer sent one.
    pub fn position(&self) -> f64 {
        self.current_floor_float.unwrap_or(self.current_floor)
    }

    /// The floor row the car is drawn in.
    pub fn display_floor(&self) -> FloorNumber {
        self.position().floor().max(0.0) as FloorNumber
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Stopped,
    #[serde(other)]
    Unknown,
}

impl Direction {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Up      => "↑",
            Self::Down    => "↓",
            Self::Stopped => "◆",
            Self::Unknown => "•",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorState {
    pub floor: FloorNumber,
    #[serde(default)]
    pub up_queue: Vec<PassengerId>,
    #[serde(default)]
    pub down_queue: Vec<PassengerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_waiting: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_waiting: Option<usize>,
}

impl FloorState {
    pub fn empty(floor: FloorNumber) -> Self {
        Self {
            floor,
            up_queue: Vec::new(),
            down_queue: Vec::new(),
            up_waiting: None,
            down_waiting: None,
        }
    }

    pub fn up_count(&self) -> usize {
        self.up_waiting.unwrap_or(self.up_queue.len())
    }

    pub fn down_count(&self) -> usize {
        self.down_waiting.unwrap_or(self.down_queue.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassengerState {
    #[serde(default)]
    pub status: PassengerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<FloorNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrive_tick: Option<Tick>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassengerStatus {
    #[default]
    Waiting,
    InElevator,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Aggregate counters. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub completed_passengers: Option<u64>,
    pub total_passengers:     Option<u64>,
    pub average_wait_time:    Option<f64>,
    pub p95_wait_time:        Option<f64>,
    pub average_system_time:  Option<f64>,
    pub p95_system_time:      Option<f64>,
}

/// Label used for a floor in the log and the building view.
pub fn floor_label(floor: FloorNumber) -> String {
    if floor == 0 {
        "G".to_string()
    } else {
        format!("{floor}F")
    }
}
