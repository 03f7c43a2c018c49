use std::error::Error;

use lumishade_core::coordinator::{CoverConfig, RoomConfig};
use lumishade_core::models::GeoLocation;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Simulated instant at start-up, defaults to now
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start: Option<OffsetDateTime>,
    /// Simulated seconds per wall clock second
    #[serde(default = "real_time")]
    pub speed: f64,
    /// Wall clock seconds between sun ticks
    pub tick_seconds: u64,
    /// Chance per tick that someone moves a cover by hand
    #[serde(default)]
    pub manual_change_chance: f64,
}

fn real_time() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub location: GeoLocation,
    pub simulation: Simulation,
    #[serde(default)]
    pub rooms: Vec<RoomConfig>,
    #[serde(default)]
    pub covers: Vec<CoverConfig>,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::parse(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../",
            "configs/default.toml"
        )))
    }

    pub fn parse(raw: &str) -> Result<Self, Box<dyn Error>> {
        let settings: Settings = toml::from_str(raw)?;

        for cover in &settings.covers {
            cover.geometry.validate()?;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use lumishade_core::models::CoverKind;

    use super::*;

    #[test]
    fn test_default_settings_load() {
        let settings = Settings::new().unwrap();

        assert!(!settings.rooms.is_empty());
        assert!(!settings.covers.is_empty());
        assert!(settings.simulation.tick_seconds > 0);
    }

    #[test]
    fn test_invalid_geometry_is_rejected() {
        let raw = r#"
            [logger]
            level = "info"

            [location]
            latitude = 48.2
            longitude = 16.4

            [simulation]
            tick_seconds = 1

            [[covers]]
            id = 1
            name = "broken"
            geometry = { facing_azimuth = 180.0, fov_left = 90.0, fov_right = 90.0, cover = { type = "vertical", window_height = 0.0, distance = 0.5 } }
        "#;

        assert!(Settings::parse(raw).is_err());

        let fixed = raw.replace("window_height = 0.0", "window_height = 2.0");
        let settings = Settings::parse(&fixed).unwrap();
        assert!(matches!(settings.covers[0].geometry.cover, CoverKind::Vertical(_)));
        assert_eq!(settings.simulation.speed, 1.0);
    }
}
