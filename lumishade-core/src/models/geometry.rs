use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Physical description of one window and the covering in front of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowGeometry {
    /// Compass bearing the window faces, degrees clockwise from north
    pub facing_azimuth: f64,
    /// Angle left of the facing direction within which sun can reach the window
    pub fov_left: f64,
    /// Angle right of the facing direction within which sun can reach the window
    pub fov_right: f64,
    /// Position (percent) used when no blocking is required
    #[serde(default = "default_position")]
    pub default_position: u8,
    /// Position (percent) used between sunset and sunrise
    #[serde(default)]
    pub sunset_position: Option<u8>,
    /// Minutes after sunset before the sunset position applies
    #[serde(default)]
    pub sunset_offset_minutes: i64,
    /// Minutes after sunrise until which the sunset position still applies
    #[serde(default)]
    pub sunrise_offset_minutes: i64,
    #[serde(default)]
    pub min_elevation: Option<f64>,
    #[serde(default)]
    pub max_elevation: Option<f64>,
    #[serde(default)]
    pub blind_spot: Option<BlindSpot>,
    #[serde(default)]
    pub limits: PositionLimits,
    pub cover: CoverKind,
}

fn default_position() -> u8 {
    100
}

/// The covering hardware and its dimensions (meters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CoverKind {
    Vertical(VerticalBlind),
    Awning(Awning),
    Tilt(TiltBlind),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerticalBlind {
    /// Height from the floor to the top of the cover
    pub window_height: f64,
    /// Depth of the floor area that has to stay out of the sun
    pub distance: f64,
    /// Height from the floor to the bottom of the fully extended cover
    #[serde(default)]
    pub cover_bottom: f64,
    /// Height of the area that has to stay out of the sun
    #[serde(default)]
    pub shaded_area_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Awning {
    pub window_height: f64,
    pub distance: f64,
    #[serde(default)]
    pub cover_bottom: f64,
    #[serde(default)]
    pub shaded_area_height: f64,
    /// Fully extended awning length
    pub length: f64,
    /// Awning inclination from horizontal in degrees
    #[serde(default)]
    pub angle: f64,
}

impl Awning {
    pub fn as_vertical(&self) -> VerticalBlind {
        VerticalBlind {
            window_height: self.window_height,
            distance: self.distance,
            cover_bottom: self.cover_bottom,
            shaded_area_height: self.shaded_area_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiltBlind {
    /// Vertical distance between two slats
    pub slat_distance: f64,
    /// Slat width
    pub slat_depth: f64,
    #[serde(default)]
    pub mode: TiltMode,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiltMode {
    /// 0° closed, 90° open
    #[default]
    SingleDirection,
    /// 0° closed, 90° open, 180° closed the other way
    Bidirectional,
}

impl TiltMode {
    pub fn max_tilt(&self) -> f64 {
        match self {
            TiltMode::SingleDirection => 90.0,
            TiltMode::Bidirectional => 180.0,
        }
    }
}

/// Angular section (relative to the left FOV edge) where an obstacle already shades the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlindSpot {
    pub left: f64,
    pub right: f64,
    #[serde(default)]
    pub max_elevation: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionLimits {
    pub min: Option<u8>,
    pub max: Option<u8>,
    /// Only enforce `min` while the sun shines on the window
    #[serde(default)]
    pub min_only_in_sun: bool,
    /// Only enforce `max` while the sun shines on the window
    #[serde(default)]
    pub max_only_in_sun: bool,
}

impl WindowGeometry {
    pub fn max_tilt(&self) -> Option<f64> {
        match &self.cover {
            CoverKind::Tilt(tilt) => Some(tilt.mode.max_tilt()),
            _ => None,
        }
    }

    pub fn is_tilt(&self) -> bool {
        matches!(self.cover, CoverKind::Tilt(_))
    }

    /// Copy of this geometry whose default position is replaced, used after sunset.
    pub fn with_default_position(&self, position: u8) -> Self {
        Self {
            default_position: position,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(Error::InvalidGeometry(reason.to_string()));

        if !(0.0..360.0).contains(&self.facing_azimuth) {
            return invalid("facing azimuth must lie in [0, 360)");
        }
        if !(0.0..=180.0).contains(&self.fov_left) || !(0.0..=180.0).contains(&self.fov_right) {
            return invalid("field of view must lie in [0, 180]");
        }
        if self.default_position > 100 || self.sunset_position.is_some_and(|p| p > 100) {
            return invalid("positions must lie in [0, 100]");
        }
        if let (Some(min), Some(max)) = (self.min_elevation, self.max_elevation) {
            if min > max {
                return invalid("minimum elevation exceeds maximum elevation");
            }
        }
        if let (Some(min), Some(max)) = (self.limits.min, self.limits.max) {
            if min > max || max > 100 {
                return invalid("position limits out of order");
            }
        }

        match &self.cover {
            CoverKind::Vertical(blind) => validate_vertical(blind),
            CoverKind::Awning(awning) => {
                validate_vertical(&awning.as_vertical())?;
                if !(awning.length > 0.0) {
                    return invalid("awning length must be positive");
                }
                if !(0.0..90.0).contains(&awning.angle) {
                    return invalid("awning angle must lie in [0, 90)");
                }
                Ok(())
            }
            CoverKind::Tilt(tilt) => {
                if !(tilt.slat_distance > 0.0) || !(tilt.slat_depth > 0.0) {
                    return invalid("slat distance and depth must be positive");
                }
                Ok(())
            }
        }
    }
}

fn validate_vertical(blind: &VerticalBlind) -> Result<()> {
    if !(blind.window_height > blind.cover_bottom) {
        return Err(Error::InvalidGeometry(
            "window height must exceed cover bottom".to_string(),
        ));
    }
    if !(blind.distance >= 0.0) || !(blind.shaded_area_height >= 0.0) {
        return Err(Error::InvalidGeometry(
            "distance and shaded area height must not be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blind() -> WindowGeometry {
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

    #[test]
    fn test_validate_accepts_sane_geometry() {
        assert!(blind().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_domain_values() {
        let mut geometry = blind();
        geometry.facing_azimuth = 360.0;
        assert!(matches!(geometry.validate(), Err(Error::InvalidGeometry(_))));

        let mut geometry = blind();
        geometry.cover = CoverKind::Vertical(VerticalBlind {
            window_height: 0.0,
            distance: 0.5,
            cover_bottom: 0.0,
            shaded_area_height: 0.0,
        });
        assert!(matches!(geometry.validate(), Err(Error::InvalidGeometry(_))));

        let mut geometry = blind();
        geometry.cover = CoverKind::Tilt(TiltBlind {
            slat_distance: f64::NAN,
            slat_depth: 0.02,
            mode: TiltMode::SingleDirection,
        });
        assert!(matches!(geometry.validate(), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_geometry_deserializes_with_defaults() {
        let geometry: WindowGeometry = serde_json::from_str(
            r#"{
                "facing_azimuth": 200.0,
                "fov_left": 45.0,
                "fov_right": 60.0,
                "cover": { "type": "tilt", "slat_distance": 0.02, "slat_depth": 0.025 }
            }"#,
        )
        .unwrap();

        assert_eq!(geometry.default_position, 100);
        assert_eq!(geometry.max_tilt(), Some(90.0));
        assert_eq!(geometry.limits, PositionLimits::default());
    }
}
