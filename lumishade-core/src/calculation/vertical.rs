use super::window::SunRelation;
use crate::models::VerticalBlind;

/// Height above the floor the blind's bottom edge has to reach so that the
/// ray passing under it lands no deeper than `distance` into the room.
pub fn blocking_height(blind: &VerticalBlind, relation: &SunRelation) -> f64 {
    let effective_distance = blind.distance / relation.cos_gamma();
    let height = blind.shaded_area_height
        + effective_distance * relation.clamped_elevation().to_radians().tan();

    height.clamp(blind.cover_bottom, blind.window_height)
}

/// Open percentage matching [`blocking_height`].
pub fn position(blind: &VerticalBlind, relation: &SunRelation) -> f64 {
    let span = blind.window_height - blind.cover_bottom;
    let percent = (blocking_height(blind, relation) - blind.cover_bottom) / span * 100.0;

    percent.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blind() -> VerticalBlind {
        VerticalBlind {
            window_height: 2.0,
            distance: 0.5,
            cover_bottom: 0.0,
            shaded_area_height: 0.0,
        }
    }

    fn relation(gamma: f64, elevation: f64) -> SunRelation {
        SunRelation { gamma, elevation }
    }

    #[test]
    fn test_head_on_sun_at_45_degrees() {
        // tan(45°) = 1, so the edge sits at the protected distance
        let height = blocking_height(&blind(), &relation(0.0, 45.0));
        assert!((height - 0.5).abs() < 1e-9);
        assert!((position(&blind(), &relation(0.0, 45.0)) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_oblique_sun_raises_the_edge() {
        let head_on = position(&blind(), &relation(0.0, 30.0));
        let oblique = position(&blind(), &relation(60.0, 30.0));

        assert!(oblique > head_on);
        assert!((oblique - 2.0 * head_on).abs() < 1e-9);
    }

    #[test]
    fn test_clipped_to_cover_range() {
        let raised = VerticalBlind {
            cover_bottom: 0.4,
            ..blind()
        };

        assert_eq!(position(&raised, &relation(0.0, 1.0)), 0.0);
        assert_eq!(position(&raised, &relation(0.0, 90.0)), 100.0);
        assert_eq!(position(&blind(), &relation(89.999, 10.0)), 100.0);
    }

    #[test]
    fn test_shaded_area_height_offsets_the_edge() {
        let desk = VerticalBlind {
            shaded_area_height: 0.8,
            ..blind()
        };

        let height = blocking_height(&desk, &relation(0.0, 45.0));
        assert!((height - 1.3).abs() < 1e-9);
    }
}
