//! Shared primitive types used across the replay engine.

/// A simulation tick. One tick = one discrete simulation step.
pub type Tick = u64;

/// Elevator identifier as emitted by the simulator (`E0`, `E1`, ...).
pub type ElevatorId = u32;

/// Passenger identifier as emitted by the simulator (`P0`, `P1`, ...).
pub type PassengerId = u64;

/// Floor number. Floor 0 is the ground floor.
pub type FloorNumber = u32;

/// Index into the snapshot buffer.
pub type FrameIndex = usize;
