use serde::{Deserialize, Serialize};
use tracing::debug;

/// Translation from the computed percentage to what the device expects.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionMapping {
    /// Device reports 0 as open and 100 as closed
    pub inverse: bool,
    /// Takes precedence over `inverse`; order `to` from high to low to invert
    pub interpolation: Option<Interpolation>,
}

/// Piecewise-linear curve through `(from[i], to[i])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolation {
    #[serde(default = "full_range")]
    pub from: Vec<f64>,
    pub to: Vec<f64>,
}

fn full_range() -> Vec<f64> {
    vec![0.0, 100.0]
}

impl Interpolation {
    /// Maps 0..100 linearly onto `start..end`.
    pub fn range(start: f64, end: f64) -> Self {
        Self {
            from: full_range(),
            to: vec![start, end],
        }
    }

    fn is_usable(&self) -> bool {
        self.from.len() >= 2
            && self.from.len() == self.to.len()
            && self.from.windows(2).all(|pair| pair[0] < pair[1])
    }

    /// Values outside `from` are held at the nearest end of `to`.
    pub fn interpolate(&self, value: f64) -> f64 {
        if !self.is_usable() {
            return value;
        }

        let last = self.from.len() - 1;
        if value <= self.from[0] {
            return self.to[0];
        }
        if value >= self.from[last] {
            return self.to[last];
        }

        let segment = self
            .from
            .windows(2)
            .position(|pair| value <= pair[1])
            .unwrap_or(last - 1);
        let (x0, x1) = (self.from[segment], self.from[segment + 1]);
        let (y0, y1) = (self.to[segment], self.to[segment + 1]);

        y0 + (value - x0) * (y1 - y0) / (x1 - x0)
    }
}

impl PositionMapping {
    pub fn apply(&self, percent: f64) -> f64 {
        let mapped = match &self.interpolation {
            Some(curve) => {
                let value = curve.interpolate(percent);
                // Ends of the curve snap to the device's real extremes
                match (curve.to.first(), curve.to.last()) {
                    (Some(first), _) if (value - first).abs() < f64::EPSILON => 0.0,
                    (_, Some(last)) if (value - last).abs() < f64::EPSILON => 100.0,
                    _ => value,
                }
            }
            None if self.inverse => 100.0 - percent,
            None => percent,
        };

        if mapped != percent {
            debug!("Mapped position {:.1} to {:.1}", percent, mapped);
        }

        mapped.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_and_inverse() {
        let mapping = PositionMapping::default();
        assert_eq!(mapping.apply(30.0), 30.0);

        let mapping = PositionMapping {
            inverse: true,
            interpolation: None,
        };
        assert_eq!(mapping.apply(30.0), 70.0);
    }

    #[test]
    fn test_range_interpolation_snaps_ends() {
        let mapping = PositionMapping {
            inverse: false,
            interpolation: Some(Interpolation::range(10.0, 90.0)),
        };

        assert_eq!(mapping.apply(50.0), 50.0);
        assert_eq!(mapping.apply(25.0), 30.0);
        assert_eq!(mapping.apply(0.0), 0.0);
        assert_eq!(mapping.apply(100.0), 100.0);
    }

    #[test]
    fn test_piecewise_curve_ignores_inverse() {
        let mapping = PositionMapping {
            inverse: true,
            interpolation: Some(Interpolation {
                from: vec![0.0, 50.0, 100.0],
                to: vec![5.0, 20.0, 95.0],
            }),
        };

        assert_eq!(mapping.apply(25.0), 12.5);
        assert_eq!(mapping.apply(75.0), 57.5);
    }

    #[test]
    fn test_malformed_curve_is_identity() {
        let curve = Interpolation {
            from: vec![0.0, 100.0, 50.0],
            to: vec![0.0, 10.0, 20.0],
        };

        assert_eq!(curve.interpolate(42.0), 42.0);
    }
}
