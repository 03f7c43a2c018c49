use crate::models::{BlindSpot, SunSample, WindowGeometry};

/// Elevations are clamped below this to keep tangents finite.
pub const MAX_ELEVATION: f64 = 89.99;

/// Cosines are clamped above this to keep projections finite near the FOV edge.
pub const MIN_COSINE: f64 = 1e-3;

/// Sun direction expressed relative to a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunRelation {
    /// Signed horizontal angle between the window normal and the sun, positive to the left
    pub gamma: f64,
    pub elevation: f64,
}

impl SunRelation {
    pub fn new(geometry: &WindowGeometry, sun: &SunSample) -> Self {
        Self {
            gamma: surface_azimuth(geometry.facing_azimuth, sun.azimuth),
            elevation: sun.elevation,
        }
    }

    pub fn clamped_elevation(&self) -> f64 {
        self.elevation.min(MAX_ELEVATION)
    }

    pub fn cos_gamma(&self) -> f64 {
        self.gamma.to_radians().cos().max(MIN_COSINE)
    }
}

/// Signed difference `facing - azimuth` folded into [-180, 180).
pub fn surface_azimuth(facing_azimuth: f64, sun_azimuth: f64) -> f64 {
    (facing_azimuth - sun_azimuth + 180.0).rem_euclid(360.0) - 180.0
}

pub fn in_field_of_view(geometry: &WindowGeometry, relation: &SunRelation) -> bool {
    let left = geometry.fov_left.min(90.0);
    let right = geometry.fov_right.min(90.0);

    relation.gamma < left && relation.gamma > -right
}

pub fn valid_elevation(geometry: &WindowGeometry, elevation: f64) -> bool {
    if elevation <= 0.0 {
        return false;
    }

    geometry.min_elevation.is_none_or(|min| elevation >= min)
        && geometry.max_elevation.is_none_or(|max| elevation <= max)
}

pub fn in_blind_spot(geometry: &WindowGeometry, relation: &SunRelation) -> bool {
    let Some(BlindSpot {
        left,
        right,
        max_elevation,
    }) = geometry.blind_spot
    else {
        return false;
    };

    let left_edge = geometry.fov_left - left;
    let right_edge = geometry.fov_left - right;

    relation.gamma <= left_edge
        && relation.gamma >= right_edge
        && max_elevation.is_none_or(|max| relation.elevation <= max)
}
