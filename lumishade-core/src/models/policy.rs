use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Duration, Time};

use super::duration_secs;

/// Hysteresis and override rules of one cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationPolicy {
    /// Smallest position change (percent) worth moving the motor for
    pub min_delta_position: u8,
    /// Smallest time between two actuations
    #[serde(with = "duration_secs")]
    pub min_delta_time: Duration,
    /// Deviation from the commanded position tolerated before assuming a manual change
    pub override_tolerance: u8,
    pub override_reset_triggers: Vec<ResetTrigger>,
    /// How long after a command observed positions still count as travel towards it
    #[serde(with = "duration_secs")]
    pub settle_time: Duration,
    /// Skip observations reported while the cover is moving
    pub ignore_intermediate: bool,
    /// Local time of day outside which the cover is left alone
    pub active_window: Option<ActiveWindow>,
}

impl Default for AutomationPolicy {
    fn default() -> Self {
        Self {
            min_delta_position: 1,
            min_delta_time: Duration::minutes(2),
            override_tolerance: 2,
            override_reset_triggers: vec![ResetTrigger::Explicit],
            settle_time: Duration::minutes(1),
            ignore_intermediate: false,
            active_window: None,
        }
    }
}

impl AutomationPolicy {
    pub fn resets_on(&self, trigger: ResetTrigger) -> bool {
        self.override_reset_triggers.contains(&trigger)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetTrigger {
    /// Device observed at 100
    FullyOpen,
    /// Device observed at 0
    FullyClosed,
    /// Reset action issued by a user or an automation
    Explicit,
}

/// Daily time range in local time; `start > end` spans midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    #[serde(with = "clock_time")]
    pub start: Time,
    #[serde(with = "clock_time")]
    pub end: Time,
}

impl ActiveWindow {
    pub fn contains(&self, time: Time) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// `"HH:MM"` or `"HH:MM:SS"` serde adapter for [`Time`].
mod clock_time {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Time, serializer: S) -> Result<S::Ok, S::Error> {
        let (hour, minute, second) = value.as_hms();
        serializer.serialize_str(&format!("{hour:02}:{minute:02}:{second:02}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time of day: {raw}")))
    }

    fn parse(raw: &str) -> Option<Time> {
        let mut parts = raw.trim().split(':').map(|part| part.parse::<u8>().ok());
        let hour = parts.next()??;
        let minute = parts.next()??;
        let second = parts.next().unwrap_or(Some(0))?;
        if parts.next().is_some() {
            return None;
        }
        Time::from_hms(hour, minute, second).ok()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::time;

    use super::*;

    #[test]
    fn test_active_window_contains() {
        let day = ActiveWindow {
            start: time!(08:00),
            end: time!(20:00),
        };
        assert!(day.contains(time!(12:00)));
        assert!(!day.contains(time!(20:00)));
        assert!(!day.contains(time!(07:59)));

        let night = ActiveWindow {
            start: time!(22:00),
            end: time!(06:00),
        };
        assert!(night.contains(time!(23:30)));
        assert!(night.contains(time!(05:00)));
        assert!(!night.contains(time!(12:00)));
    }

    #[test]
    fn test_policy_deserializes_seconds_and_clock_times() {
        let policy: AutomationPolicy = serde_json::from_str(
            r#"{
                "min_delta_position": 5,
                "min_delta_time": 300,
                "override_reset_triggers": ["fully_open", "explicit"],
                "active_window": { "start": "07:30", "end": "21:00:00" }
            }"#,
        )
        .unwrap();

        assert_eq!(policy.min_delta_position, 5);
        assert_eq!(policy.min_delta_time, Duration::minutes(5));
        assert_eq!(policy.settle_time, Duration::minutes(1));
        assert!(policy.resets_on(ResetTrigger::FullyOpen));
        assert!(!policy.resets_on(ResetTrigger::FullyClosed));
        assert_eq!(policy.active_window.map(|w| w.start), Some(time!(07:30)));

        let invalid = serde_json::from_str::<AutomationPolicy>(
            r#"{ "active_window": { "start": "25:00", "end": "21:00" } }"#,
        );
        assert!(invalid.is_err());
    }
}
