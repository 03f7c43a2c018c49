use serde::{Deserialize, Serialize};

/// Weather conditions that let the sun through when no explicit set is configured.
pub const DEFAULT_WEATHER_STATES: [&str; 6] = [
    "sunny",
    "partlycloudy",
    "clear-night",
    "windy",
    "windy-variant",
    "snowy",
];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateThresholds {
    /// Below this indoor temperature solar heat is welcome
    pub temp_low: Option<f64>,
    /// Above this indoor temperature the room is too warm
    pub temp_high: Option<f64>,
    /// Weather states counted as sunny; empty means [`DEFAULT_WEATHER_STATES`]
    pub weather_allow_set: Vec<String>,
    /// Only shade for comfort when somebody is in the room
    pub presence_required: bool,
    pub lux_threshold: Option<f64>,
    pub irradiance_threshold: Option<f64>,
    /// Cloud coverage percentage above which the sun is considered hidden
    pub cloud_threshold: Option<f64>,
}

impl ClimateThresholds {
    pub fn allows_weather(&self, weather: &str) -> bool {
        if self.weather_allow_set.is_empty() {
            DEFAULT_WEATHER_STATES.contains(&weather)
        } else {
            self.weather_allow_set.iter().any(|state| state == weather)
        }
    }
}

/// Switches deciding which optional sensors take part in the sun check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorToggles {
    pub weather: bool,
    pub lux: bool,
    pub irradiance: bool,
    pub cloud: bool,
}

impl Default for SensorToggles {
    fn default() -> Self {
        Self {
            weather: true,
            lux: true,
            irradiance: true,
            cloud: true,
        }
    }
}

/// Raw answer of a sensor for one read.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Reading<T> {
    #[default]
    NotConfigured,
    Unavailable,
    Value(T),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClimateReadings {
    pub temperature: Reading<f64>,
    pub presence: Reading<bool>,
    pub weather: Reading<String>,
    pub lux: Reading<f64>,
    pub irradiance: Reading<f64>,
    pub cloud_coverage: Reading<f64>,
}

/// A sensor value as the control logic sees it.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Observed<T> {
    #[default]
    NotConfigured,
    /// Configured but never reported a value
    Unknown,
    Live(T),
    /// Last known value kept while the sensor is unavailable
    Stale(T),
}

impl<T> Observed<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Observed::Live(value) | Observed::Stale(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Observed::Stale(_))
    }

    pub fn is_configured(&self) -> bool {
        !matches!(self, Observed::NotConfigured)
    }

    fn advance(&self, reading: Reading<T>) -> Self
    where
        T: Clone,
    {
        match reading {
            Reading::NotConfigured => Observed::NotConfigured,
            Reading::Value(value) => Observed::Live(value),
            Reading::Unavailable => match self {
                Observed::Live(value) | Observed::Stale(value) => Observed::Stale(value.clone()),
                _ => Observed::Unknown,
            },
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ClimateSnapshot {
    pub temperature: Observed<f64>,
    pub presence: Observed<bool>,
    pub weather: Observed<String>,
    pub lux: Observed<f64>,
    pub irradiance: Observed<f64>,
    pub cloud_coverage: Observed<f64>,
}

impl ClimateSnapshot {
    /// True when any value is a last known value rather than a live one.
    pub fn is_degraded(&self) -> bool {
        self.temperature.is_stale()
            || self.presence.is_stale()
            || self.weather.is_stale()
            || self.lux.is_stale()
            || self.irradiance.is_stale()
            || self.cloud_coverage.is_stale()
    }

    /// Unknown presence counts as occupied.
    pub fn is_occupied(&self) -> bool {
        self.presence.value().copied().unwrap_or(true)
    }
}

/// Folds successive readings into a snapshot, keeping last known values.
#[derive(Debug, Default, Clone)]
pub struct ClimateTracker {
    last: ClimateSnapshot,
}

impl ClimateTracker {
    pub fn update(&mut self, readings: ClimateReadings) -> ClimateSnapshot {
        let last = &self.last;
        let next = ClimateSnapshot {
            temperature: last.temperature.advance(readings.temperature),
            presence: last.presence.advance(readings.presence),
            weather: last.weather.advance(readings.weather),
            lux: last.lux.advance(readings.lux),
            irradiance: last.irradiance.advance(readings.irradiance),
            cloud_coverage: last.cloud_coverage.advance(readings.cloud_coverage),
        };
        self.last = next.clone();
        next
    }

    pub fn last(&self) -> &ClimateSnapshot {
        &self.last
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComfortLevel {
    Comfortable,
    TooHot,
    TooCold,
}

impl ComfortLevel {
    /// `None` while no temperature is known.
    pub fn assess(climate: &ClimateSnapshot, thresholds: &ClimateThresholds) -> Option<Self> {
        let temperature = *climate.temperature.value()?;

        if thresholds.temp_high.is_some_and(|high| temperature > high) {
            Some(ComfortLevel::TooHot)
        } else if thresholds.temp_low.is_some_and(|low| temperature < low) {
            Some(ComfortLevel::TooCold)
        } else {
            Some(ComfortLevel::Comfortable)
        }
    }
}
