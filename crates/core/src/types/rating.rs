//! Product rating value for star widgets.

use serde::{Deserialize, Deserializer, Serialize};

/// Average review rating on a 0-5 scale.
///
/// Values outside the scale (or NaN) are clamped when constructed or
/// deserialized, so star widgets can always render five slots.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Default)]
#[serde(transparent)]
pub struct Rating(f64);

impl Rating {
    /// Maximum number of stars.
    pub const MAX: f64 = 5.0;

    /// Create a rating, clamping into `0.0..=5.0`.
    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, Self::MAX))
    }

    /// The numeric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Value rounded to the nearest half star.
    fn halves(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let halves = (self.0 * 2.0).round() as u32;
        halves
    }

    /// Number of fully filled stars.
    #[must_use]
    pub fn full_stars(&self) -> u32 {
        self.halves() / 2
    }

    /// Whether a half star follows the full stars.
    #[must_use]
    pub fn has_half_star(&self) -> bool {
        self.halves() % 2 == 1
    }

    /// Number of empty star slots.
    #[must_use]
    pub fn empty_stars(&self) -> u32 {
        5 - self.full_stars() - u32::from(self.has_half_star())
    }

    /// One-decimal display, e.g. `4.5`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:.1}", self.0)
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<f64>::deserialize(deserializer)?;
        Ok(Self::new(value.unwrap_or_default()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps_out_of_range() {
        assert!((Rating::new(7.2).value() - 5.0).abs() < f64::EPSILON);
        assert!(Rating::new(-1.0).value().abs() < f64::EPSILON);
        assert!(Rating::new(f64::NAN).value().abs() < f64::EPSILON);
    }

    #[test]
    fn test_star_breakdown() {
        let rating = Rating::new(4.5);
        assert_eq!(rating.full_stars(), 4);
        assert!(rating.has_half_star());
        assert_eq!(rating.empty_stars(), 0);

        let rating = Rating::new(3.2);
        assert_eq!(rating.full_stars(), 3);
        assert!(!rating.has_half_star());
        assert_eq!(rating.empty_stars(), 2);

        let rating = Rating::new(0.0);
        assert_eq!(rating.empty_stars(), 5);
    }

    #[test]
    fn test_deserialize_null_and_large() {
        let rating: Rating = serde_json::from_str("null").unwrap();
        assert_eq!(rating.full_stars(), 0);
        let rating: Rating = serde_json::from_str("9").unwrap();
        assert_eq!(rating.full_stars(), 5);
        assert_eq!(rating.display(), "5.0");
    }
}
