//! Typed event records carried inside each snapshot.
//!
//! Events describe transitions that happened *during* the tick that
//! produced the snapshot, not the snapshot's resting state.
//! Variants mirror the simulator's event enumeration. Never reorder.

use crate::{
    snapshot::floor_label,
    types::{ElevatorId, FloorNumber, PassengerId},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub data: EventData,
}

impl EventRecord {
    pub fn new(kind: EventKind, data: EventData) -> Self {
        Self { kind, data }
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Human-readable line for the event log. `None` for event types the
    /// log does not know how to describe.
    pub fn describe(&self) -> Option<String> {
        let d = &self.data;
        let description = match self.kind {
            EventKind::UpButtonPressed => {
                format!("乘客P{}在{}按下上行按钮", id(d.passenger), floor(d.floor))
            }
            EventKind::DownButtonPressed => {
                format!("乘客P{}在{}按下下行按钮", id(d.passenger), floor(d.floor))
            }
            EventKind::PassengerBoard => {
                format!("乘客P{}登上电梯E{}", id(d.passenger), id(d.elevator))
            }
            EventKind::PassengerAlight => format!(
                "乘客P{}从电梯E{}下车，到达{}",
                id(d.passenger),
                id(d.elevator),
                floor(d.floor)
            ),
            EventKind::StoppedAtFloor => {
                format!("电梯E{}停靠在{}", id(d.elevator), floor(d.floor))
            }
            EventKind::Idle => format!("电梯E{}进入空闲状态", id(d.elevator)),
            // Not logged by the browser viewer; described here so the car's path is visible.
            EventKind::PassingFloor => {
                format!("电梯E{}经过{}", id(d.elevator), floor(d.floor))
            }
            // Likewise absent from the browser viewer's log.
            EventKind::ElevatorApproaching => {
                format!("电梯E{}即将到达{}", id(d.elevator), floor(d.floor))
            }
            EventKind::Unknown => return None,
        };
        Some(description)
    }
}

fn id<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

fn floor(value: Option<FloorNumber>) -> String {
    value.map_or_else(|| "?".to_string(), floor_label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    UpButtonPressed,
    DownButtonPressed,
    PassengerBoard,
    PassengerAlight,
    StoppedAtFloor,
    Idle,
    PassingFloor,
    ElevatorApproaching,
    #[serde(other)]
    Unknown,
}

impl EventKind {
    pub fn category(self) -> Category {
        match self {
            Self::UpButtonPressed
            | Self::DownButtonPressed
            | Self::PassengerBoard
            | Self::PassengerAlight => Category::Passenger,
            Self::StoppedAtFloor
            | Self::Idle
            | Self::PassingFloor
            | Self::ElevatorApproaching => Category::Elevator,
            Self::Unknown => Category::System,
        }
    }
}

/// Payload of an event. Which fields are present depends on the kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevator: Option<ElevatorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passenger: Option<PassengerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<FloorNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

impl EventData {
    pub fn elevator(elevator: ElevatorId) -> Self {
        Self { elevator: Some(elevator), ..Self::default() }
    }

    pub fn passenger_at(passenger: PassengerId, floor: FloorNumber) -> Self {
        Self { passenger: Some(passenger), floor: Some(floor), ..Self::default() }
    }

    pub fn elevator_at(elevator: ElevatorId, floor: FloorNumber) -> Self {
        Self { elevator: Some(elevator), floor: Some(floor), ..Self::default() }
    }

    pub fn with_passenger(mut self, passenger: PassengerId) -> Self {
        self.passenger = Some(passenger);
        self
    }
}

/// Log category. Also the unit the display filter selects on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Passenger,
    Elevator,
    System,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passenger => "passenger",
            Self::Elevator  => "elevator",
            Self::System    => "system",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passenger" => Ok(Self::Passenger),
            "elevator"  => Ok(Self::Elevator),
            "system"    => Ok(Self::System),
            other       => Err(format!("unknown category '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ground_floor_is_labelled_g() {
        let event = EventRecord::new(EventKind::UpButtonPressed, EventData::passenger_at(7, 0));
        assert_eq!(event.describe().as_deref(), Some("乘客P7在G按下上行按钮"));

        let event = EventRecord::new(EventKind::StoppedAtFloor, EventData::elevator_at(1, 4));
        assert_eq!(event.describe().as_deref(), Some("电梯E1停靠在4F"));
    }

    #[test]
    fn alight_names_passenger_elevator_and_floor() {
        let event = EventRecord::new(
            EventKind::PassengerAlight,
            EventData::elevator_at(2, 3).with_passenger(11),
        );
        assert_eq!(event.describe().as_deref(), Some("乘客P11从电梯E2下车，到达3F"));
        assert_eq!(event.category(), Category::Passenger);
    }

    #[test]
    fn missing_fields_render_as_question_marks() {
        let event = EventRecord::new(EventKind::PassengerBoard, EventData::default());
        assert_eq!(event.describe().as_deref(), Some("乘客P?登上电梯E?"));
    }

    #[test]
    fn unknown_event_types_deserialize_but_are_not_described() {
        let event: EventRecord =
            serde_json::from_str(r#"{"type":"door_jammed","data":{"elevator":0}}"#).unwrap();
        assert_eq!(event.kind, EventKind::Unknown);
        assert_eq!(event.category(), Category::System);
        assert!(event.describe().is_none());
    }

    #[test]
    fn wire_names_are_snake_case() {
        let event: EventRecord =
            serde_json::from_str(r#"{"type":"elevator_approaching","data":{"elevator":3,"floor":5,"direction":"up"}}"#)
                .unwrap();
        assert_eq!(event.kind, EventKind::ElevatorApproaching);
        assert_eq!(event.category(), Category::Elevator);
        assert_eq!(event.data.direction.as_deref(), Some("up"));
    }
}
