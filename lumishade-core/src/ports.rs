//! Boundaries to the outside world: sun position, sensors, motors and time.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::Result;
use crate::models::{ClimateReadings, GeoLocation};

/// Astronomical source of sun directions.
pub trait Ephemeris: Send + Sync {
    /// Returns `(azimuth, elevation)` in degrees for the given place and instant.
    fn solar_position(&self, location: &GeoLocation, timestamp: OffsetDateTime) -> Result<(f64, f64)>;
}

/// Indoor and outdoor sensors relevant for climate decisions.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Fails with `SensorUnavailable` when the source as a whole cannot be read.
    async fn read_climate(&self) -> Result<ClimateReadings>;
}

/// Motorised cover driver.
#[async_trait]
pub trait ActuationSink: Send + Sync {
    /// Position in percent, 100 being fully open.
    async fn set_cover_position(&self, device: &str, position: u8) -> Result<()>;

    /// Slat angle in degrees.
    async fn set_cover_tilt(&self, device: &str, degrees: f64) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
