use super::window::SunRelation;
use crate::models::TiltBlind;

/// Profile angle of the sun seen in the plane perpendicular to the slats.
pub fn profile_angle(relation: &SunRelation) -> f64 {
    (relation.clamped_elevation().to_radians().tan() / relation.cos_gamma()).atan()
}

/// Slat angle in degrees (0 closed, 90 horizontal) at which the lower slat
/// edge just meets the ray grazing the upper slat, clamped to the mode's range.
pub fn slat_angle(blind: &TiltBlind, relation: &SunRelation) -> f64 {
    let ratio = blind.slat_distance / blind.slat_depth;
    let tan_beta = profile_angle(relation).tan();
    let radicand = (tan_beta * tan_beta - ratio * ratio + 1.0).max(0.0);

    let angle = 2.0 * ((tan_beta + radicand.sqrt()) / (1.0 + ratio)).atan();
    angle.to_degrees().clamp(0.0, blind.mode.max_tilt())
}
