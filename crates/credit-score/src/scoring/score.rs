use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_CREDIT_SCORE: i32 = 300;
pub const MAX_CREDIT_SCORE: i32 = 850;

/// Guards the odds ratio against division by zero at `p = 0`.
pub const SCORE_EPSILON: f64 = 1e-12;

/// Map a probability of default onto the 300-850 scale.
///
/// `score = 300 + 50 * log10((1 - p) / (p + ε))`, clamped then truncated.
/// Non-increasing in `p`; inputs outside [0, 1] are clamped first.
pub fn calculate_credit_score(prob_default: f64) -> i32 {
    let p = if prob_default.is_nan() {
        1.0
    } else {
        prob_default.clamp(0.0, 1.0)
    };

    let odds = (1.0 - p) / (p + SCORE_EPSILON);
    let score = f64::from(MIN_CREDIT_SCORE) + 50.0 * odds.log10();
    score.clamp(f64::from(MIN_CREDIT_SCORE), f64::from(MAX_CREDIT_SCORE)) as i32
}

/// Qualitative band derived from the credit score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl RiskLevel {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::VeryLow,
            Self::Low,
            Self::Medium,
            Self::High,
            Self::VeryHigh,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thresholds are inclusive lower bounds of each band.
pub fn determine_risk_level(score: i32) -> RiskLevel {
    if score >= 750 {
        RiskLevel::VeryLow
    } else if score >= 650 {
        RiskLevel::Low
    } else if score >= 550 {
        RiskLevel::Medium
    } else if score >= 450 {
        RiskLevel::High
    } else {
        RiskLevel::VeryHigh
    }
}
