//! Sun geometry to cover target.
//!
//! Every function here is pure. A sun that does not shine on the window, a
//! sun below the horizon and an invalid geometry all yield the default target.

pub mod horizontal;
pub mod tilt;
pub mod vertical;
pub mod window;

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{CoverKind, SunSample, WindowGeometry};
use window::SunRelation;

/// What a cover should do: an open percentage or a slat angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TargetValue {
    Position(f64),
    Tilt(f64),
}

impl TargetValue {
    pub fn value(&self) -> f64 {
        match self {
            TargetValue::Position(value) | TargetValue::Tilt(value) => *value,
        }
    }

    /// Target as a percentage; tilt angles are scaled by `max_tilt`.
    pub fn as_percent(&self, max_tilt: f64) -> f64 {
        match self {
            TargetValue::Position(percent) => *percent,
            TargetValue::Tilt(degrees) => degrees / max_tilt * 100.0,
        }
    }

    /// Inverse of [`TargetValue::as_percent`] keeping the variant.
    pub fn with_percent(&self, percent: f64, max_tilt: f64) -> TargetValue {
        match self {
            TargetValue::Position(_) => TargetValue::Position(percent),
            TargetValue::Tilt(_) => TargetValue::Tilt(percent / 100.0 * max_tilt),
        }
    }
}

/// Projection of the sun onto a cover. The default model treats the window as
/// a flat plane hit by a single ray; other models can be swapped in.
pub trait ShadeCalculator: Send + Sync {
    /// Target for a sun known to shine on the window.
    fn blocking_target(&self, geometry: &WindowGeometry, relation: &SunRelation) -> TargetValue;

    fn compute(&self, geometry: &WindowGeometry, sun: &SunSample) -> TargetValue {
        if let Err(err) = geometry.validate() {
            warn!("Falling back to default target: {}", err);
            return default_target(geometry);
        }

        let direct_sun = is_direct_sun(geometry, sun);
        let target = if direct_sun {
            self.blocking_target(geometry, &SunRelation::new(geometry, sun))
        } else {
            default_target(geometry)
        };

        debug!(
            "Sun at {:.1}/{:.1}, direct sun: {}, target: {:?}",
            sun.azimuth, sun.elevation, direct_sun, target
        );

        apply_limits(geometry, target, direct_sun)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FlatWindowCalculator;

impl ShadeCalculator for FlatWindowCalculator {
    fn blocking_target(&self, geometry: &WindowGeometry, relation: &SunRelation) -> TargetValue {
        match &geometry.cover {
            CoverKind::Vertical(blind) => TargetValue::Position(vertical::position(blind, relation)),
            CoverKind::Awning(awning) => TargetValue::Position(horizontal::position(awning, relation)),
            CoverKind::Tilt(blind) => TargetValue::Tilt(tilt::slat_angle(blind, relation)),
        }
    }
}

/// Target computed with [`FlatWindowCalculator`].
pub fn compute(geometry: &WindowGeometry, sun: &SunSample) -> TargetValue {
    FlatWindowCalculator.compute(geometry, sun)
}

/// Sun is in front of the window, high enough and not hidden by a known obstacle.
pub fn is_direct_sun(geometry: &WindowGeometry, sun: &SunSample) -> bool {
    let relation = SunRelation::new(geometry, sun);

    window::in_field_of_view(geometry, &relation)
        && window::valid_elevation(geometry, relation.elevation)
        && !window::in_blind_spot(geometry, &relation)
}

pub fn default_target(geometry: &WindowGeometry) -> TargetValue {
    let percent = f64::from(geometry.default_position.min(100));

    match geometry.max_tilt() {
        Some(max_tilt) => TargetValue::Tilt(percent / 100.0 * max_tilt),
        None => TargetValue::Position(percent),
    }
}

/// Applies the configured min/max positions. Limits flagged as sun-only are
/// skipped while the sun is not shining on the window.
pub fn apply_limits(geometry: &WindowGeometry, target: TargetValue, direct_sun: bool) -> TargetValue {
    let limits = &geometry.limits;
    let max_tilt = geometry.max_tilt().unwrap_or(100.0);
    let mut percent = target.as_percent(max_tilt).clamp(0.0, 100.0);

    if let Some(max) = limits.max.filter(|_| direct_sun || !limits.max_only_in_sun) {
        percent = percent.min(f64::from(max));
    }
    if let Some(min) = limits.min.filter(|_| direct_sun || !limits.min_only_in_sun) {
        percent = percent.max(f64::from(min));
    }

    target.with_percent(percent, max_tilt)
}
