use serde::Serialize;
use tracing::{debug, warn};

use crate::calculation::window::SunRelation;
use crate::calculation::{self, ShadeCalculator, TargetValue};
use crate::models::{ClimateSnapshot, ClimateThresholds, ControlMode, SensorToggles, SunSample, WindowGeometry};

/// Everything a strategy looks at for one decision.
pub struct PolicyInputs<'a> {
    pub climate: &'a ClimateSnapshot,
    pub thresholds: &'a ClimateThresholds,
    pub toggles: &'a SensorToggles,
    /// Geometry with the default position already adjusted for the time of day
    pub geometry: &'a WindowGeometry,
    pub sun: &'a SunSample,
    pub calculator: &'a dyn ShadeCalculator,
    /// Between sunset (plus offset) and sunrise (plus offset)
    pub night: bool,
}

impl PolicyInputs<'_> {
    fn direct_sun(&self) -> bool {
        if let Err(err) = self.geometry.validate() {
            warn!("Ignoring sun for invalid geometry: {}", err);
            return false;
        }

        !self.night && calculation::is_direct_sun(self.geometry, self.sun)
    }
}

/// Chosen target and whether it is actively keeping sun out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Selection {
    pub target: TargetValue,
    pub blocking: bool,
    pub direct_sun: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStrategy {
    Normal,
    Climate,
    Off,
}

impl From<ControlMode> for ControlStrategy {
    fn from(mode: ControlMode) -> Self {
        match mode {
            ControlMode::Normal => ControlStrategy::Normal,
            ControlMode::Climate => ControlStrategy::Climate,
            ControlMode::Off => ControlStrategy::Off,
        }
    }
}

impl ControlStrategy {
    /// `None` means the cover must not be moved.
    pub fn select_target(&self, inputs: &PolicyInputs) -> Option<Selection> {
        let direct_sun = inputs.direct_sun();

        match self {
            ControlStrategy::Off => None,
            ControlStrategy::Normal => Some(geometric(inputs, direct_sun)),
            ControlStrategy::Climate => Some(climate(inputs, direct_sun)),
        }
    }
}

fn geometric(inputs: &PolicyInputs, direct_sun: bool) -> Selection {
    if !direct_sun {
        return fallback(inputs, direct_sun);
    }

    let relation = SunRelation::new(inputs.geometry, inputs.sun);
    let target = inputs.calculator.blocking_target(inputs.geometry, &relation);

    Selection {
        target: calculation::apply_limits(inputs.geometry, target, true),
        blocking: true,
        direct_sun,
    }
}

fn fallback(inputs: &PolicyInputs, direct_sun: bool) -> Selection {
    let target = calculation::default_target(inputs.geometry);

    Selection {
        target: calculation::apply_limits(inputs.geometry, target, direct_sun),
        blocking: false,
        direct_sun,
    }
}

fn climate(inputs: &PolicyInputs, direct_sun: bool) -> Selection {
    let climate = inputs.climate;
    let thresholds = inputs.thresholds;
    let temperature = climate.temperature.value().copied();

    if !has_actual_sun(inputs, direct_sun) {
        debug!("No actual sun on the window, using default");
        return fallback(inputs, direct_sun);
    }

    if let (Some(temperature), Some(low)) = (temperature, thresholds.temp_low) {
        if temperature < low {
            debug!("Temperature {:.1} below {:.1}, letting the sun in", temperature, low);
            return fallback(inputs, direct_sun);
        }
    }

    if thresholds.presence_required && !climate.is_occupied() {
        let too_hot = matches!((temperature, thresholds.temp_high), (Some(t), Some(high)) if t > high);
        if too_hot {
            debug!("Unoccupied and too hot, closing");
            let closed = inputs.geometry.max_tilt().map_or(TargetValue::Position(0.0), |_| TargetValue::Tilt(0.0));
            return Selection {
                target: calculation::apply_limits(inputs.geometry, closed, true),
                blocking: true,
                direct_sun,
            };
        }

        debug!("Unoccupied, no benefit in shading");
        return fallback(inputs, direct_sun);
    }

    geometric(inputs, direct_sun)
}

/// Sun geometrically on the window and not hidden by weather, darkness or clouds.
fn has_actual_sun(inputs: &PolicyInputs, direct_sun: bool) -> bool {
    if !direct_sun {
        return false;
    }

    let climate = inputs.climate;
    let thresholds = inputs.thresholds;
    let toggles = inputs.toggles;

    if toggles.weather && climate.weather.is_configured() {
        let sunny = climate
            .weather
            .value()
            .is_some_and(|weather| thresholds.allows_weather(weather));
        if !sunny {
            return false;
        }
    }

    let below = |enabled: bool, value: Option<&f64>, threshold: Option<f64>| {
        enabled && matches!((value, threshold), (Some(v), Some(t)) if *v < t)
    };

    if below(toggles.lux, climate.lux.value(), thresholds.lux_threshold) {
        return false;
    }
    if below(toggles.irradiance, climate.irradiance.value(), thresholds.irradiance_threshold) {
        return false;
    }

    let cloudy = toggles.cloud
        && matches!(
            (climate.cloud_coverage.value(), thresholds.cloud_threshold),
            (Some(coverage), Some(limit)) if *coverage > limit
        );

    !cloudy
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::calculation::FlatWindowCalculator;
    use crate::models::{CoverKind, Observed, PositionLimits, VerticalBlind};

    fn geometry() -> WindowGeometry {
        WindowGeometry {
            facing_azimuth: 180.0,
            fov_left: 90.0,
            fov_right: 90.0,
            default_position: 100,
            sunset_position: None,
            sunset_offset_minutes: 0,
            sunrise_offset_minutes: 0,
            min_elevation: None,
            max_elevation: None,
            blind_spot: None,
            limits: PositionLimits::default(),
            cover: CoverKind::Vertical(VerticalBlind {
                window_height: 2.1,
                distance: 0.5,
                cover_bottom: 0.0,
                shaded_area_height: 0.0,
            }),
        }
    }

    fn thresholds() -> ClimateThresholds {
        ClimateThresholds {
            temp_low: Some(20.0),
            temp_high: Some(26.0),
            ..Default::default()
        }
    }

    fn select(strategy: ControlStrategy, climate: &ClimateSnapshot, thresholds: &ClimateThresholds) -> Option<Selection> {
        let geometry = geometry();
        let sun = SunSample::new(datetime!(2024-06-21 12:00 UTC), 180.0, 45.0);
        let inputs = PolicyInputs {
            climate,
            thresholds,
            toggles: &SensorToggles::default(),
            geometry: &geometry,
            sun: &sun,
            calculator: &FlatWindowCalculator,
            night: false,
        };

        strategy.select_target(&inputs)
    }

    fn with_temperature(temperature: f64) -> ClimateSnapshot {
        ClimateSnapshot {
            temperature: Observed::Live(temperature),
            ..Default::default()
        }
    }

    #[test]
    fn test_off_never_selects() {
        assert_eq!(select(ControlStrategy::Off, &ClimateSnapshot::default(), &thresholds()), None);
    }

    #[test]
    fn test_normal_follows_geometry() {
        let selection = select(ControlStrategy::Normal, &with_temperature(10.0), &thresholds()).unwrap();

        assert!(selection.blocking);
        assert!(selection.target.value() < 100.0);
    }

    #[test]
    fn test_climate_cold_room_lets_sun_in() {
        let selection = select(ControlStrategy::Climate, &with_temperature(18.0), &thresholds()).unwrap();

        assert_eq!(selection.target, TargetValue::Position(100.0));
        assert!(!selection.blocking);
        assert!(selection.direct_sun);
    }

    #[test]
    fn test_climate_comfortable_room_blocks_glare() {
        let selection = select(ControlStrategy::Climate, &with_temperature(23.0), &thresholds()).unwrap();

        assert!(selection.blocking);
        assert!(selection.target.value() < 100.0);
    }

    #[test]
    fn test_climate_unoccupied_room() {
        let thresholds = ClimateThresholds {
            presence_required: true,
            ..thresholds()
        };

        let mut hot = with_temperature(28.0);
        hot.presence = Observed::Live(false);
        let selection = select(ControlStrategy::Climate, &hot, &thresholds).unwrap();
        assert_eq!(selection.target, TargetValue::Position(0.0));
        assert!(selection.blocking);

        let mut mild = with_temperature(23.0);
        mild.presence = Observed::Live(false);
        let selection = select(ControlStrategy::Climate, &mild, &thresholds).unwrap();
        assert_eq!(selection.target, TargetValue::Position(100.0));

        // Unknown presence counts as occupied
        let mut unknown = with_temperature(23.0);
        unknown.presence = Observed::Unknown;
        let selection = select(ControlStrategy::Climate, &unknown, &thresholds).unwrap();
        assert!(selection.blocking);
    }

    #[test]
    fn test_climate_requires_actual_sun() {
        let thresholds = ClimateThresholds {
            lux_threshold: Some(5000.0),
            cloud_threshold: Some(70.0),
            ..thresholds()
        };

        let mut rainy = with_temperature(23.0);
        rainy.weather = Observed::Live("rainy".to_string());
        assert!(!select(ControlStrategy::Climate, &rainy, &thresholds).unwrap().blocking);

        let mut unknown_weather = with_temperature(23.0);
        unknown_weather.weather = Observed::Unknown;
        assert!(!select(ControlStrategy::Climate, &unknown_weather, &thresholds).unwrap().blocking);

        let mut dim = with_temperature(23.0);
        dim.lux = Observed::Stale(1200.0);
        assert!(!select(ControlStrategy::Climate, &dim, &thresholds).unwrap().blocking);

        let mut overcast = with_temperature(23.0);
        overcast.cloud_coverage = Observed::Live(90.0);
        assert!(!select(ControlStrategy::Climate, &overcast, &thresholds).unwrap().blocking);

        let mut sunny = with_temperature(23.0);
        sunny.weather = Observed::Live("sunny".to_string());
        sunny.lux = Observed::Live(30000.0);
        sunny.cloud_coverage = Observed::Live(10.0);
        assert!(select(ControlStrategy::Climate, &sunny, &thresholds).unwrap().blocking);
    }

    #[test]
    fn test_toggles_disable_sensor_checks() {
        let geometry = geometry();
        let sun = SunSample::new(datetime!(2024-06-21 12:00 UTC), 180.0, 45.0);
        let mut climate = with_temperature(23.0);
        climate.weather = Observed::Live("rainy".to_string());
        let toggles = SensorToggles {
            weather: false,
            ..Default::default()
        };

        let inputs = PolicyInputs {
            climate: &climate,
            thresholds: &thresholds(),
            toggles: &toggles,
            geometry: &geometry,
            sun: &sun,
            calculator: &FlatWindowCalculator,
            night: false,
        };

        assert!(ControlStrategy::Climate.select_target(&inputs).unwrap().blocking);
    }

    #[test]
    fn test_night_uses_default() {
        let geometry = geometry().with_default_position(0);
        let sun = SunSample::new(datetime!(2024-06-21 21:00 UTC), 180.0, 5.0);
        let inputs = PolicyInputs {
            climate: &ClimateSnapshot::default(),
            thresholds: &thresholds(),
            toggles: &SensorToggles::default(),
            geometry: &geometry,
            sun: &sun,
            calculator: &FlatWindowCalculator,
            night: true,
        };

        let selection = ControlStrategy::Normal.select_target(&inputs).unwrap();
        assert_eq!(selection.target, TargetValue::Position(0.0));
        assert!(!selection.direct_sun);
    }
}
