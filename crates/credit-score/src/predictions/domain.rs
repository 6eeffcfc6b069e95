use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::UserId;
use crate::scoring::{CreditApplication, Decision, RiskLevel, ScoreResult};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Identifier wrapper for stored predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionId(pub i64);

/// Prediction ready for persistence; the repository assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub client_name: String,
    pub credit_score: i32,
    pub risk_level: RiskLevel,
    pub decision: Decision,
    pub income: f64,
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub employment: String,
    pub loan_purpose: String,
    pub user_id: Option<UserId>,
}

impl NewPrediction {
    pub fn from_result(
        application: &CreditApplication,
        result: &ScoreResult,
        user_id: Option<UserId>,
    ) -> Self {
        Self {
            client_name: result.client.clone(),
            credit_score: result.credit_score,
            risk_level: result.risk_level,
            decision: result.decision,
            income: application.income,
            loan_amount: application.loan_amount,
            interest_rate: application.interest_rate,
            employment: application.employment.clone(),
            loan_purpose: application.loan_purpose.clone(),
            user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: PredictionId,
    pub client_name: String,
    pub credit_score: i32,
    pub risk_level: RiskLevel,
    pub decision: Decision,
    pub income: f64,
    pub loan_amount: f64,
    pub interest_rate: f64,
    pub employment: String,
    pub loan_purpose: String,
    pub user_id: Option<UserId>,
    pub timestamp: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn from_new(id: PredictionId, prediction: NewPrediction, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            client_name: prediction.client_name,
            credit_score: prediction.credit_score,
            risk_level: prediction.risk_level,
            decision: prediction.decision,
            income: prediction.income,
            loan_amount: prediction.loan_amount,
            interest_rate: prediction.interest_rate,
            employment: prediction.employment,
            loan_purpose: prediction.loan_purpose,
            user_id: prediction.user_id,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Timestamp,
    CreditScore,
    ClientName,
    Income,
    LoanAmount,
    InterestRate,
    Id,
}

impl SortField {
    /// Unknown names sort by timestamp.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "credit_score" => SortField::CreditScore,
            "client_name" => SortField::ClientName,
            "income" => SortField::Income,
            "loan_amount" => SortField::LoanAmount,
            "interest_rate" => SortField::InterestRate,
            "id" => SortField::Id,
            _ => SortField::Timestamp,
        }
    }

    /// Column name, shared with the SQL adapter.
    pub const fn column(self) -> &'static str {
        match self {
            SortField::Timestamp => "timestamp",
            SortField::CreditScore => "credit_score",
            SortField::ClientName => "client_name",
            SortField::Income => "income",
            SortField::LoanAmount => "loan_amount",
            SortField::InterestRate => "interest_rate",
            SortField::Id => "id",
        }
    }

    fn compare(self, left: &PredictionRecord, right: &PredictionRecord) -> Ordering {
        match self {
            SortField::Timestamp => left.timestamp.cmp(&right.timestamp),
            SortField::CreditScore => left.credit_score.cmp(&right.credit_score),
            SortField::ClientName => left.client_name.cmp(&right.client_name),
            SortField::Income => left.income.total_cmp(&right.income),
            SortField::LoanAmount => left.loan_amount.total_cmp(&right.loan_amount),
            SortField::InterestRate => left.interest_rate.total_cmp(&right.interest_rate),
            SortField::Id => left.id.cmp(&right.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// `desc` in any case is descending; anything else ascends.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Paging and ordering for a user's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionQuery {
    pub skip: usize,
    pub limit: usize,
    pub order_by: SortField,
    pub direction: SortDirection,
}

impl Default for PredictionQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_PAGE_SIZE,
            order_by: SortField::Timestamp,
            direction: SortDirection::Descending,
        }
    }
}

impl PredictionQuery {
    /// Sort then page an in-memory collection. Ties break on id so pages are stable.
    pub fn apply(&self, mut records: Vec<PredictionRecord>) -> Vec<PredictionRecord> {
        records.sort_by(|left, right| {
            let ordering = self
                .order_by
                .compare(left, right)
                .then_with(|| left.id.cmp(&right.id));
            match self.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        records
            .into_iter()
            .skip(self.skip)
            .take(self.limit)
            .collect()
    }
}

/// Raw query-string parameters for `GET /predictions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionQueryParams {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
}

impl From<PredictionQueryParams> for PredictionQuery {
    fn from(params: PredictionQueryParams) -> Self {
        Self {
            skip: params.skip.unwrap_or(0),
            limit: params
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
            order_by: params
                .order_by
                .as_deref()
                .map(SortField::parse)
                .unwrap_or(SortField::Timestamp),
            direction: params
                .order_direction
                .as_deref()
                .map(SortDirection::parse)
                .unwrap_or(SortDirection::Descending),
        }
    }
}
