use serde::{Deserialize, Serialize};

use crate::models::{ControlMode, CoverId, PositionObservation, RoomId};

/// Which coordinators a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum Target {
    Cover(CoverId),
    Room(RoomId),
    All,
}

/// Something that happened outside the engine. Routed by
/// [`CoordinatorRegistry::dispatch`](crate::registry::CoordinatorRegistry::dispatch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Periodic tick, the sun has moved
    SunTick,
    RoomSensorsChanged { room: RoomId },
    CoverSensorsChanged { cover: CoverId },
    PositionObserved {
        cover: CoverId,
        observation: PositionObservation,
    },
    ResetOverride { cover: CoverId },
    ForceUpdate { target: Target },
    SetMode { target: Target, mode: ControlMode },
    SetControlEnabled { target: Target, enabled: bool },
    /// Local day changed
    Midnight,
}
