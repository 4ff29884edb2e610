//! Data quality indicators graded on the pedigree-matrix scale.
//!
//! Each dimension is graded 1 (best) to 5 (worst). The weighted score keeps
//! the same scale, so a perfect indicator scores 1.00.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GhgError;

pub const WEIGHT_TECHNOLOGICAL: f64 = 0.25;
pub const WEIGHT_TEMPORAL: f64 = 0.20;
pub const WEIGHT_GEOGRAPHICAL: f64 = 0.20;
pub const WEIGHT_COMPLETENESS: f64 = 0.20;
pub const WEIGHT_RELIABILITY: f64 = 0.15;

// Basic uncertainty factors per grade, index 0 = grade 1.
const UNCERTAINTY_RELIABILITY: [f64; 5] = [1.00, 1.54, 1.61, 1.69, 1.69];
const UNCERTAINTY_COMPLETENESS: [f64; 5] = [1.00, 1.03, 1.04, 1.08, 1.08];
const UNCERTAINTY_TEMPORAL: [f64; 5] = [1.00, 1.03, 1.10, 1.19, 1.29];
const UNCERTAINTY_GEOGRAPHICAL: [f64; 5] = [1.00, 1.04, 1.08, 1.11, 1.11];
const UNCERTAINTY_TECHNOLOGICAL: [f64; 5] = [1.00, 1.18, 1.65, 2.08, 2.80];

/// A single pedigree grade, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Grade(u8);

impl Grade {
    pub const BEST: Grade = Grade(1);
    pub const WORST: Grade = Grade(5);

    pub fn new(value: u8) -> Result<Self, GhgError> {
        if (1..=5).contains(&value) {
            Ok(Grade(value))
        } else {
            Err(GhgError::Validation(format!(
                "DQI grade must be between 1 and 5, got {}",
                value
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for Grade {
    type Error = GhgError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Grade::new(value)
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> u8 {
        grade.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityIndicator {
    pub technological: Grade,
    pub temporal: Grade,
    pub geographical: Grade,
    pub completeness: Grade,
    pub reliability: Grade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRating {
    High,
    Medium,
    Low,
    Estimated,
}

impl QualityRating {
    pub fn as_str(self) -> &'static str {
        match self {
            QualityRating::High => "high",
            QualityRating::Medium => "medium",
            QualityRating::Low => "low",
            QualityRating::Estimated => "estimated",
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined pedigree uncertainty of one indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uncertainty {
    /// Root-sum-square of the per-dimension contributions, as a fraction.
    pub combined: f64,
}

impl Uncertainty {
    pub fn percent(&self) -> f64 {
        round2(self.combined * 100.0)
    }
}

impl DataQualityIndicator {
    /// Build from raw grades ordered technological, temporal, geographical,
    /// completeness, reliability.
    pub fn from_grades(grades: [u8; 5]) -> Result<Self, GhgError> {
        Ok(Self {
            technological: Grade::new(grades[0])?,
            temporal: Grade::new(grades[1])?,
            geographical: Grade::new(grades[2])?,
            completeness: Grade::new(grades[3])?,
            reliability: Grade::new(grades[4])?,
        })
    }

    pub fn uniform(grade: Grade) -> Self {
        Self {
            technological: grade,
            temporal: grade,
            geographical: grade,
            completeness: grade,
            reliability: grade,
        }
    }

    /// Weighted score on the 1..=5 scale, rounded to 2 decimals.
    pub fn score(&self) -> f64 {
        let raw = WEIGHT_TECHNOLOGICAL * f64::from(self.technological.value())
            + WEIGHT_TEMPORAL * f64::from(self.temporal.value())
            + WEIGHT_GEOGRAPHICAL * f64::from(self.geographical.value())
            + WEIGHT_COMPLETENESS * f64::from(self.completeness.value())
            + WEIGHT_RELIABILITY * f64::from(self.reliability.value());
        round2(raw)
    }

    pub fn rating(&self) -> QualityRating {
        rating(self.score())
    }

    pub fn uncertainty(&self) -> Uncertainty {
        let multipliers = [
            UNCERTAINTY_TECHNOLOGICAL[self.technological.index()],
            UNCERTAINTY_TEMPORAL[self.temporal.index()],
            UNCERTAINTY_GEOGRAPHICAL[self.geographical.index()],
            UNCERTAINTY_COMPLETENESS[self.completeness.index()],
            UNCERTAINTY_RELIABILITY[self.reliability.index()],
        ];
        let sum_sq: f64 = multipliers.iter().map(|u| (u - 1.0).powi(2)).sum();
        Uncertainty {
            combined: sum_sq.sqrt(),
        }
    }
}

pub fn rating(score: f64) -> QualityRating {
    if score <= 1.5 {
        QualityRating::High
    } else if score <= 2.5 {
        QualityRating::Medium
    } else if score <= 3.5 {
        QualityRating::Low
    } else {
        QualityRating::Estimated
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let sum = WEIGHT_TECHNOLOGICAL
            + WEIGHT_TEMPORAL
            + WEIGHT_GEOGRAPHICAL
            + WEIGHT_COMPLETENESS
            + WEIGHT_RELIABILITY;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn uniform_grades_score_their_grade() {
        assert_eq!(DataQualityIndicator::uniform(Grade::BEST).score(), 1.00);
        assert_eq!(DataQualityIndicator::uniform(Grade::WORST).score(), 5.00);
    }

    #[test]
    fn mixed_grades_use_fixed_weights() {
        // 0.25*1 + 0.2*2 + 0.2*3 + 0.2*4 + 0.15*5 = 2.80
        let dqi = DataQualityIndicator::from_grades([1, 2, 3, 4, 5]).unwrap();
        assert_eq!(dqi.score(), 2.8);
        assert_eq!(dqi.rating(), QualityRating::Low);
    }

    #[test]
    fn rating_thresholds_are_inclusive() {
        assert_eq!(rating(1.5), QualityRating::High);
        assert_eq!(rating(1.51), QualityRating::Medium);
        assert_eq!(rating(2.5), QualityRating::Medium);
        assert_eq!(rating(3.5), QualityRating::Low);
        assert_eq!(rating(3.51), QualityRating::Estimated);
    }

    #[test]
    fn grades_outside_scale_are_rejected() {
        assert!(Grade::new(0).is_err());
        assert!(Grade::new(6).is_err());
        assert!(DataQualityIndicator::from_grades([1, 1, 1, 1, 9]).is_err());
        let parsed: Result<Grade, _> = serde_json::from_str("7");
        assert!(parsed.is_err());
    }

    #[test]
    fn best_grades_carry_no_uncertainty() {
        let u = DataQualityIndicator::uniform(Grade::BEST).uncertainty();
        assert_eq!(u.combined, 0.0);
        assert_eq!(u.percent(), 0.0);
    }

    #[test]
    fn worst_grades_root_sum_square() {
        let u = DataQualityIndicator::uniform(Grade::WORST).uncertainty();
        let expected = (1.8f64.powi(2) + 0.29f64.powi(2) + 0.11f64.powi(2)
            + 0.08f64.powi(2)
            + 0.69f64.powi(2))
        .sqrt();
        assert!((u.combined - expected).abs() < 1e-9);
    }
}
