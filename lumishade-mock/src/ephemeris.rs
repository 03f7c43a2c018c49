use lumishade_core::Result;
use lumishade_core::models::GeoLocation;
use lumishade_core::ports::Ephemeris;
use time::{OffsetDateTime, UtcOffset};

const EARTH_AXIAL_TILT: f64 = 23.45;
const DEGREES_PER_HOUR: f64 = 15.0;

/// Low precision sun position from declination, equation of time and hour
/// angle. Good to about a degree, which is plenty for a simulation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleEphemeris;

impl Ephemeris for SimpleEphemeris {
    fn solar_position(&self, location: &GeoLocation, timestamp: OffsetDateTime) -> Result<(f64, f64)> {
        let utc = timestamp.to_offset(UtcOffset::UTC);
        let hours = utc.hour() as f64 + utc.minute() as f64 / 60.0 + utc.second() as f64 / 3600.0;
        let day = i32::from(utc.ordinal());

        let declination = EARTH_AXIAL_TILT * (360.0 * (284 + day) as f64 / 365.0).to_radians().sin();
        let correction = (4.0 * location.longitude + equation_of_time(day)) / 60.0;
        let solar_time = (hours + correction).rem_euclid(24.0);
        let hour_angle = DEGREES_PER_HOUR * (solar_time - 12.0);

        let lat = location.latitude.to_radians();
        let dec = declination.to_radians();
        let ha = hour_angle.to_radians();

        let cos_zenith = lat.sin() * dec.sin() + lat.cos() * dec.cos() * ha.cos();
        let elevation = 90.0 - cos_zenith.clamp(-1.0, 1.0).acos().to_degrees();

        let sin_az = -dec.cos() * ha.sin();
        let cos_az = dec.sin() * lat.cos() - dec.cos() * lat.sin() * ha.cos();
        let azimuth = sin_az.atan2(cos_az).to_degrees().rem_euclid(360.0);

        Ok((azimuth, elevation))
    }
}

/// Minutes the apparent solar time runs ahead of mean solar time.
fn equation_of_time(day: i32) -> f64 {
    let b = ((day - 1) as f64 * 360.0 / 365.0).to_radians();

    229.18
        * (0.000075 + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.040849 * (2.0 * b).sin())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn vienna() -> GeoLocation {
        GeoLocation {
            latitude: 48.21,
            longitude: 16.37,
            elevation_m: 0.0,
            utc_offset_minutes: 120,
        }
    }

    #[test]
    fn test_solar_noon_is_south_and_high() {
        // Solar noon in Vienna is around 10:56 UTC at midsummer
        let (azimuth, elevation) = SimpleEphemeris
            .solar_position(&vienna(), datetime!(2024-06-21 10:56 UTC))
            .unwrap();

        assert!((azimuth - 180.0).abs() < 3.0, "azimuth {azimuth}");
        assert!((elevation - 65.2).abs() < 1.0, "elevation {elevation}");
    }

    #[test]
    fn test_morning_sun_is_east_and_night_is_below_horizon() {
        let (azimuth, elevation) = SimpleEphemeris
            .solar_position(&vienna(), datetime!(2024-06-21 06:00 +02:00))
            .unwrap();
        assert!((45.0..90.0).contains(&azimuth), "azimuth {azimuth}");
        assert!(elevation > 0.0 && elevation < 15.0, "elevation {elevation}");

        let (_, elevation) = SimpleEphemeris
            .solar_position(&vienna(), datetime!(2024-06-21 23:30 +02:00))
            .unwrap();
        assert!(elevation < 0.0);
    }
}
