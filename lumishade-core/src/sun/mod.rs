use time::{Date, Duration, OffsetDateTime, UtcOffset};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ExposureWindow, GeoLocation, SunSample};
use crate::ports::Ephemeris;

/// Sampling step used when a caller has no preference.
pub const DEFAULT_STEP: Duration = Duration::minutes(5);

/// Sun directions for one local calendar day, sampled at a fixed step.
#[derive(Debug, Clone, PartialEq)]
pub struct SunSeries {
    date: Date,
    offset: UtcOffset,
    samples: Vec<SunSample>,
}

impl SunSeries {
    /// Samples from local midnight up to, but excluding, the next midnight.
    pub fn for_day(
        ephemeris: &dyn Ephemeris,
        location: &GeoLocation,
        date: Date,
        step: Duration,
    ) -> Result<Self> {
        if !step.is_positive() {
            return Err(Error::Ephemeris("sampling step must be positive".to_string()));
        }

        let offset = location.utc_offset();
        let start = date.midnight().assume_offset(offset);
        let end = start + Duration::days(1);

        let mut samples = Vec::with_capacity((Duration::days(1) / step).ceil() as usize);
        let mut timestamp = start;
        while timestamp < end {
            let (azimuth, elevation) = ephemeris.solar_position(location, timestamp)?;
            samples.push(SunSample::new(timestamp, azimuth, elevation));
            timestamp += step;
        }

        debug!(
            "Sampled {} sun positions for {} at ({:.3}, {:.3})",
            samples.len(),
            date,
            location.latitude,
            location.longitude
        );

        Ok(Self {
            date,
            offset,
            samples,
        })
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn samples(&self) -> &[SunSample] {
        &self.samples
    }

    /// Whether `timestamp` falls on the local day this series describes.
    pub fn covers(&self, timestamp: OffsetDateTime) -> bool {
        timestamp.to_offset(self.offset).date() == self.date
    }

    /// First sample with the sun above the horizon.
    pub fn sunrise(&self) -> Option<OffsetDateTime> {
        self.samples
            .iter()
            .find(|sample| sample.is_above_horizon())
            .map(|sample| sample.timestamp)
    }

    /// Last sample with the sun above the horizon.
    pub fn sunset(&self) -> Option<OffsetDateTime> {
        self.samples
            .iter()
            .rev()
            .find(|sample| sample.is_above_horizon())
            .map(|sample| sample.timestamp)
    }

    /// Span between the first and the last sample satisfying `predicate`.
    pub fn exposure_window<F>(&self, predicate: F) -> Option<ExposureWindow>
    where
        F: Fn(&SunSample) -> bool,
    {
        let start = self.samples.iter().find(|sample| predicate(sample))?;
        let end = self.samples.iter().rev().find(|sample| predicate(sample))?;

        Some(ExposureWindow {
            start: start.timestamp,
            end: end.timestamp,
        })
    }
}
