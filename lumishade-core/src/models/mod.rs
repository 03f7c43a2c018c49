mod climate;
mod geometry;
mod policy;
mod state;
mod sun;

pub use climate::*;
pub use geometry::*;
pub use policy::*;
pub use state::*;
pub use sun::*;

use serde::{Deserialize, Serialize};
use time::UtcOffset;

pub type CoverId = i32;
pub type RoomId = i32;

/// Where the building stands; fed to the ephemeris.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude in degrees, north positive
    pub latitude: f64,
    /// Longitude in degrees, east positive
    pub longitude: f64,
    /// Height above sea level in meters
    #[serde(default)]
    pub elevation_m: f64,
    /// Local offset from UTC used to delimit calendar days
    #[serde(default)]
    pub utc_offset_minutes: i16,
}

impl GeoLocation {
    pub fn utc_offset(&self) -> UtcOffset {
        let seconds = i32::from(self.utc_offset_minutes) * 60;
        UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
    }
}

/// Serde adapter storing a [`time::Duration`] as whole seconds.
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.whole_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        i64::deserialize(deserializer).map(Duration::seconds)
    }
}
