use serde::Serialize;
use time::OffsetDateTime;

/// One sun direction at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SunSample {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Compass bearing in degrees clockwise from north, in [0, 360)
    pub azimuth: f64,
    /// Angle above the horizon in degrees, in [-90, 90]
    pub elevation: f64,
}

impl SunSample {
    pub fn new(timestamp: OffsetDateTime, azimuth: f64, elevation: f64) -> Self {
        Self {
            timestamp,
            azimuth: azimuth.rem_euclid(360.0),
            elevation: elevation.clamp(-90.0, 90.0),
        }
    }

    pub fn is_above_horizon(&self) -> bool {
        self.elevation > 0.0
    }
}

/// Interval of one day during which the sun shines on a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExposureWindow {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl ExposureWindow {
    pub fn contains(&self, timestamp: OffsetDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Smallest window covering both.
    pub fn union(&self, other: &ExposureWindow) -> ExposureWindow {
        ExposureWindow {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_sun_sample_normalizes_domain() {
        let sample = SunSample::new(datetime!(2024-06-21 12:00 UTC), -30.0, 120.0);

        assert_eq!(sample.azimuth, 330.0);
        assert_eq!(sample.elevation, 90.0);

        let sample = SunSample::new(datetime!(2024-06-21 12:00 UTC), 720.0, -95.0);
        assert_eq!(sample.azimuth, 0.0);
        assert_eq!(sample.elevation, -90.0);
        assert!(!sample.is_above_horizon());
    }

    #[test]
    fn test_exposure_window_union() {
        let morning = ExposureWindow {
            start: datetime!(2024-06-21 09:30 UTC),
            end: datetime!(2024-06-21 12:00 UTC),
        };
        let noon = ExposureWindow {
            start: datetime!(2024-06-21 10:00 UTC),
            end: datetime!(2024-06-21 15:00 UTC),
        };

        let union = morning.union(&noon);
        assert_eq!(union.start, datetime!(2024-06-21 09:30 UTC));
        assert_eq!(union.end, datetime!(2024-06-21 15:00 UTC));
        assert!(union.contains(datetime!(2024-06-21 15:00 UTC)));
        assert!(!union.contains(datetime!(2024-06-21 15:05 UTC)));
    }
}
