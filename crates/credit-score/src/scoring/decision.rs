use std::fmt;

use serde::{Deserialize, Serialize};

use super::application::CreditApplication;

const APPROVAL_THRESHOLD: i32 = 650;
const CONDITIONAL_THRESHOLD: i32 = 550;

const HIGH_INCOME: f64 = 100_000.0;
const LONG_TENURE_MONTHS: i32 = 24;
const FREQUENT_LATE_DAYS: i32 = 15;
const MULTIPLE_LATE_PAYMENTS: i32 = 3;
const HIGH_DEBT_RATIO: f64 = 0.35;

/// Lending decision derived from the credit score alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    #[serde(rename = "Approved with conditions")]
    ApprovedWithConditions,
    Declined,
}

impl Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::ApprovedWithConditions => "Approved with conditions",
            Decision::Declined => "Declined",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            Decision::Approved,
            Decision::ApprovedWithConditions,
            Decision::Declined,
        ]
        .into_iter()
        .find(|decision| decision.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn decide(score: i32) -> Decision {
    if score >= APPROVAL_THRESHOLD {
        Decision::Approved
    } else if score >= CONDITIONAL_THRESHOLD {
        Decision::ApprovedWithConditions
    } else {
        Decision::Declined
    }
}

/// Heuristic explanation attached to a decision. Not a model explanation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFactors {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

impl KeyFactors {
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }
}

pub fn key_factors(application: &CreditApplication) -> KeyFactors {
    let mut factors = KeyFactors::default();

    if application.income > HIGH_INCOME {
        factors.positive.push("High income".to_string());
    }
    if application.customer_tenure > LONG_TENURE_MONTHS {
        factors.positive.push("Long customer tenure".to_string());
    }

    if application.avg_days_late_current > FREQUENT_LATE_DAYS {
        factors.negative.push("Frequent late payments".to_string());
    }
    if application.num_late_payments_current > MULTIPLE_LATE_PAYMENTS {
        factors.negative.push("Multiple late payments".to_string());
    }

    let debt_ratio = application.loan_amount / application.income.max(1.0);
    if debt_ratio > HIGH_DEBT_RATIO {
        factors
            .negative
            .push(format!("High debt ratio ({:.0}%)", debt_ratio * 100.0));
    }

    factors
}
