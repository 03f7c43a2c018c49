use crate::models::{CoverId, RoomId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid window geometry: {0}")]
    InvalidGeometry(String),

    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Actuation failed: {0}")]
    ActuationFailure(String),

    #[error("Solar position unavailable: {0}")]
    Ephemeris(String),

    #[error("Cover {0} not found")]
    CoverNotFound(CoverId),

    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Cover {cover} already belongs to room {room}")]
    AlreadyInRoom { cover: CoverId, room: RoomId },

    #[error("Coordinator has been shut down")]
    ShutDown,
}

impl Error {
    /// Soft failures leave the coordinator running and are retried on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::SensorUnavailable(_) | Error::ActuationFailure(_) | Error::Ephemeris(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, Error>;
