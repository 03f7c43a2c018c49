use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{ClimateSnapshot, ComfortLevel, CoverId, ExposureWindow, RoomId, SunSample};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Follow the sun geometry only
    #[default]
    Normal,
    /// Follow the sun geometry gated by temperature, weather and presence
    Climate,
    /// Never actuate
    Off,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    #[default]
    Idle,
    Controlling,
    ManualOverride,
    Resetting,
}

/// Position report coming back from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionObservation {
    /// Observed position in percent
    pub position: u8,
    /// Device reports it is still travelling
    #[serde(default)]
    pub moving: bool,
}

impl PositionObservation {
    pub fn settled(position: u8) -> Self {
        Self {
            position,
            moving: false,
        }
    }

    pub fn moving(position: u8) -> Self {
        Self {
            position,
            moving: true,
        }
    }
}

/// Runtime state of one cover. Positions are percent; tilt covers use percent of their max tilt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverState {
    /// Last position reported by the device
    pub current_position: Option<u8>,
    /// Last position this coordinator asked for
    pub commanded_position: Option<u8>,
    pub mode: ControlMode,
    pub control_enabled: bool,
    pub manual_override: bool,
    pub control_state: ControlState,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_actuation_time: Option<OffsetDateTime>,
    /// Inputs were missing or stale at the last tick
    pub degraded: bool,
}

impl Default for CoverState {
    fn default() -> Self {
        Self {
            current_position: None,
            commanded_position: None,
            mode: ControlMode::default(),
            control_enabled: true,
            manual_override: false,
            control_state: ControlState::default(),
            last_actuation_time: None,
            degraded: false,
        }
    }
}

/// Published result of one cover recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverSnapshot {
    pub cover: CoverId,
    pub name: String,
    pub room: Option<RoomId>,
    pub state: CoverState,
    /// Final position the policy asked for, after limits and mapping
    pub target_position: Option<u8>,
    /// Sun is geometrically in front of the window
    pub direct_sun: bool,
    /// The selected target differs from the default because sun is being blocked
    pub blocking: bool,
    pub sun: Option<SunSample>,
    pub climate: ClimateSnapshot,
    pub exposure: Option<ExposureWindow>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl CoverSnapshot {
    pub fn empty(cover: CoverId, name: impl Into<String>) -> Self {
        Self {
            cover,
            name: name.into(),
            room: None,
            state: CoverState::default(),
            target_position: None,
            direct_sun: false,
            blocking: false,
            sun: None,
            climate: ClimateSnapshot::default(),
            exposure: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RoomState {
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_sun_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_sun_time: Option<OffsetDateTime>,
    /// Some member is blocking the sun under climate mode
    pub comfort_status: bool,
    pub comfort_level: Option<ComfortLevel>,
    pub shared_climate_snapshot: ClimateSnapshot,
    pub members: Vec<CoverId>,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSnapshot {
    pub room: RoomId,
    pub name: String,
    pub mode: ControlMode,
    pub control_enabled: bool,
    pub state: RoomState,
}
