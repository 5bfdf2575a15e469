//! Star awards and the derived user rating.
//!
//! A rating is never stored: it is recomputed on demand from the aggregate
//! of a user's recorded quiz attempts via a fixed weighting formula.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stars a rating can draw on before the contribution saturates.
const STARS_CAP: u32 = 100;
/// Attempts a rating can draw on before the contribution saturates.
const ATTEMPTS_CAP: u32 = 50;

/// Stars earned for one completed quiz, from its score percentage (0..=100).
///
/// Scale: 90+ five stars, 80+ four, 70+ three, 60+ two, otherwise one.
/// A quiz with no gradable points still earns the single participation star.
pub fn stars_for_score(score_percentage: f64) -> u32 {
    if score_percentage >= 90.0 {
        5
    } else if score_percentage >= 80.0 {
        4
    } else if score_percentage >= 70.0 {
        3
    } else if score_percentage >= 60.0 {
        2
    } else {
        1
    }
}

/// The five ordered rating tiers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RatingTier {
    Beginner,
    EmergingScholar,
    ProficientStudent,
    ExpertLearner,
    MasterScholar,
}

impl RatingTier {
    /// Numeric level, 1 (Beginner) through 5 (Master Scholar).
    pub fn level(&self) -> u8 {
        match self {
            RatingTier::Beginner => 1,
            RatingTier::EmergingScholar => 2,
            RatingTier::ProficientStudent => 3,
            RatingTier::ExpertLearner => 4,
            RatingTier::MasterScholar => 5,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RatingTier::Beginner => "Beginner",
            RatingTier::EmergingScholar => "Emerging Scholar",
            RatingTier::ProficientStudent => "Proficient Student",
            RatingTier::ExpertLearner => "Expert Learner",
            RatingTier::MasterScholar => "Master Scholar",
        }
    }
}

impl fmt::Display for RatingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Aggregated attempt history a rating is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatingInputs {
    /// Mean attempt score as a fraction in `[0, 1]`.
    pub accuracy: f64,
    pub total_stars: u32,
    pub total_attempts: u32,
}

/// A derived rating: tier plus the weighted score that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub tier: RatingTier,
    pub score: f64,
}

/// Weighted rating score in `[0, 1]`:
/// `0.50 * accuracy + 0.30 * normalized_stars + 0.20 * normalized_attempts`,
/// with stars capped at 100 and attempts at 50 before normalization.
pub fn weighted_score(inputs: &RatingInputs) -> f64 {
    let accuracy = inputs.accuracy.clamp(0.0, 1.0);
    let stars = inputs.total_stars.min(STARS_CAP) as f64 / STARS_CAP as f64;
    let attempts = inputs.total_attempts.min(ATTEMPTS_CAP) as f64 / ATTEMPTS_CAP as f64;
    0.50 * accuracy + 0.30 * stars + 0.20 * attempts
}

/// Compute the rating for a user's aggregate history.
///
/// Pure function of the inputs; thresholds are fixed ascending policy
/// (`>= 0.80` Master Scholar down to Beginner below `0.20`).
pub fn compute_rating(inputs: &RatingInputs) -> Rating {
    let score = weighted_score(inputs);
    let tier = if score >= 0.80 {
        RatingTier::MasterScholar
    } else if score >= 0.60 {
        RatingTier::ExpertLearner
    } else if score >= 0.40 {
        RatingTier::ProficientStudent
    } else if score >= 0.20 {
        RatingTier::EmergingScholar
    } else {
        RatingTier::Beginner
    };
    Rating { tier, score }
}
