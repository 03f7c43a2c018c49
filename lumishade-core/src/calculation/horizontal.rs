use super::vertical;
use super::window::{MIN_COSINE, SunRelation};
use crate::models::Awning;

/// Awning extension (meters) casting the same shadow edge as a vertical
/// blind would, found with the sine rule in the triangle formed by the
/// window, the awning and the sun ray.
pub fn extension(awning: &Awning, relation: &SunRelation) -> f64 {
    let edge = vertical::blocking_height(&awning.as_vertical(), relation);
    let elevation = relation.clamped_elevation();

    let ray_angle = (90.0 - elevation).to_radians();
    let opposite_angle = (awning.angle + elevation).to_radians();

    let length = (awning.window_height - edge) * ray_angle.sin() / opposite_angle.sin().max(MIN_COSINE);
    length.clamp(0.0, awning.length)
}

/// Extension as a percentage of the awning length.
pub fn position(awning: &Awning, relation: &SunRelation) -> f64 {
    (extension(awning, relation) / awning.length * 100.0).clamp(0.0, 100.0)
}
