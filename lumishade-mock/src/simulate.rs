use std::f64::consts::{PI, TAU};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use lumishade_core::Result;
use lumishade_core::event::Event;
use lumishade_core::models::{ClimateReadings, CoverId, PositionObservation, Reading};
use lumishade_core::ports::{ActuationSink, Clock, SensorSource};
use rand::Rng;
use time::{Duration, OffsetDateTime, UtcOffset};
use tokio::sync::mpsc::UnboundedSender;

/// Clock running `speed` times faster than the wall clock from `start`.
pub struct SimulatedClock {
    start: OffsetDateTime,
    started: Instant,
    speed: f64,
}

impl SimulatedClock {
    pub fn new(start: OffsetDateTime, speed: f64) -> Self {
        Self {
            start,
            started: Instant::now(),
            speed,
        }
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> OffsetDateTime {
        self.start + Duration::seconds_f64(self.started.elapsed().as_secs_f64() * self.speed)
    }
}

/// Position of the local time within the day, 0 at midnight and 0.5 at noon.
pub fn day_fraction(now: OffsetDateTime, offset: UtcOffset) -> f64 {
    let local = now.to_offset(offset);
    let seconds = u32::from(local.hour()) * 3600 + u32::from(local.minute()) * 60 + u32::from(local.second());

    seconds as f64 / 86400.0
}

pub fn simulation_lux(day_fraction: f64) -> f64 {
    let radians = day_fraction * TAU;

    const MAX_SUNLIGHT_LUX: f64 = 60000.0;
    const MAX_MOONLIGHT_LUX: f64 = 5.0;

    const SUNRISE_START: f64 = 0.23;
    const SUNRISE_END: f64 = 0.25;
    const SUNSET_START: f64 = 0.83;
    const SUNSET_END: f64 = 0.85;

    if (SUNRISE_START..=SUNSET_END).contains(&day_fraction) {
        if day_fraction <= SUNRISE_END {
            let sunrise_radians = ((day_fraction - SUNRISE_START) / (SUNRISE_END - SUNRISE_START)) * PI / 2.0;
            sunrise_radians.sin() * MAX_SUNLIGHT_LUX
        } else if day_fraction >= SUNSET_START {
            let sunset_radians = ((day_fraction - SUNSET_START) / (SUNSET_END - SUNSET_START)) * PI / 2.0;
            sunset_radians.cos() * MAX_SUNLIGHT_LUX
        } else {
            MAX_SUNLIGHT_LUX
        }
    } else {
        // Moonlight peaking at midnight
        (radians + PI).cos().max(0.0) * (MAX_MOONLIGHT_LUX - 0.01) + 0.01
    }
}

/// Indoor temperature peaking mid afternoon.
pub fn simulated_temperature(day_fraction: f64) -> f64 {
    ((day_fraction - 0.375) * TAU).sin().max(0.0) * 12.0 + 17.0
}

/// Room sensors following the simulated day with some noise.
pub struct SimulatedSensors {
    clock: Arc<dyn Clock>,
    offset: UtcOffset,
}

impl SimulatedSensors {
    pub fn new(clock: Arc<dyn Clock>, offset: UtcOffset) -> Self {
        Self { clock, offset }
    }
}

#[async_trait]
impl SensorSource for SimulatedSensors {
    async fn read_climate(&self) -> Result<ClimateReadings> {
        let fraction = day_fraction(self.clock.now(), self.offset);
        let mut rng = rand::rng();

        let lux = simulation_lux(fraction);
        let cloud_coverage: f64 = rng.random_range(0.0..60.0);
        let weather = match (lux > 1000.0, cloud_coverage > 40.0) {
            (true, false) => "sunny",
            (true, true) => "partlycloudy",
            (false, false) => "clear-night",
            (false, true) => "cloudy",
        };

        let readings = ClimateReadings {
            temperature: Reading::Value(simulated_temperature(fraction) + rng.random_range(-0.5..0.5)),
            presence: Reading::Value(rng.random_bool(0.7)),
            weather: Reading::Value(weather.to_string()),
            lux: Reading::Value(lux * (1.0 - cloud_coverage / 150.0)),
            irradiance: Reading::Value(lux / 120.0),
            cloud_coverage: Reading::Value(cloud_coverage),
        };
        tracing::debug!("Simulated climate: {:?}", readings);

        Ok(readings)
    }
}

/// Motor that reaches its target at once and reports the new position back.
pub struct SimulatedMotor {
    cover: CoverId,
    max_tilt: Option<f64>,
    feedback: UnboundedSender<Event>,
}

impl SimulatedMotor {
    pub fn new(cover: CoverId, max_tilt: Option<f64>, feedback: UnboundedSender<Event>) -> Self {
        Self {
            cover,
            max_tilt,
            feedback,
        }
    }

    fn report(&self, position: u8) {
        let event = Event::PositionObserved {
            cover: self.cover,
            observation: PositionObservation::settled(position),
        };
        if self.feedback.send(event).is_err() {
            tracing::debug!("Feedback of cover {} dropped, runner stopped", self.cover);
        }
    }
}

#[async_trait]
impl ActuationSink for SimulatedMotor {
    async fn set_cover_position(&self, device: &str, position: u8) -> Result<()> {
        tracing::info!("{} -> {}%", device, position);
        self.report(position);
        Ok(())
    }

    async fn set_cover_tilt(&self, device: &str, degrees: f64) -> Result<()> {
        tracing::info!("{} -> {:.1}°", device, degrees);
        let percent = self.max_tilt.map_or(degrees, |max| degrees / max * 100.0);
        self.report(percent.round().clamp(0.0, 100.0) as u8);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn test_day_fraction_uses_local_time() {
        let offset = UtcOffset::from_hms(2, 0, 0).unwrap();

        assert_eq!(day_fraction(datetime!(2024-06-21 10:00 UTC), offset), 0.5);
        assert_eq!(day_fraction(datetime!(2024-06-21 22:00 UTC), UtcOffset::UTC), 22.0 / 24.0);
    }

    #[test]
    fn test_lux_follows_the_day() {
        assert_eq!(simulation_lux(0.5), 60000.0);
        assert!(simulation_lux(0.0) <= 5.0);
        assert!(simulation_lux(0.24) > 0.0 && simulation_lux(0.24) < 60000.0);
    }

    #[tokio::test]
    async fn test_motor_reports_tilt_in_percent() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let motor = SimulatedMotor::new(3, Some(90.0), tx);

        motor.set_cover_tilt("office-east", 45.0).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(Event::PositionObserved {
                cover: 3,
                observation: PositionObservation::settled(50),
            })
        );
    }
}
