use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_client_name() -> String {
    "Applicant".to_string()
}

/// Credit application as submitted by the client form.
///
/// Wire names follow the form (`loanAmount`, `avgDaysLateCurrent`, ...) with the
/// exception of `client_name`, which the form posts in snake case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditApplication {
    #[serde(rename = "client_name", default = "default_client_name")]
    pub client_name: String,
    pub age: i32,
    pub income: f64,
    pub employment: String,
    pub loan_amount: f64,
    pub loan_purpose: String,
    pub location: String,
    pub phone_usage: String,
    pub utility_payments: String,
    pub interest_rate: f64,
    pub turnover: f64,
    pub customer_tenure: i32,
    pub avg_days_late_current: i32,
    pub num_late_payments_current: i32,
    pub unpaid_amount: f64,
    pub industry_sector: String,
    pub credit_type: String,
    pub has_guarantee: String,
    pub guarantee_type: String,
    pub repayment_frequency: String,
}

/// Malformed or out-of-range application input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be {constraint} (found {found})")]
    OutOfRange {
        field: &'static str,
        constraint: &'static str,
        found: String,
    },
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },
    #[error("field '{field}' must be numeric (found {found})")]
    NotNumeric { field: String, found: String },
    #[error("application could not be flattened: {0}")]
    Malformed(String),
}

fn out_of_range(
    field: &'static str,
    constraint: &'static str,
    found: impl ToString,
) -> ValidationError {
    ValidationError::OutOfRange {
        field,
        constraint,
        found: found.to_string(),
    }
}

fn check_amount(
    field: &'static str,
    value: f64,
    constraint: &'static str,
    accept: impl Fn(f64) -> bool,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if !accept(value) {
        return Err(out_of_range(field, constraint, value));
    }
    Ok(())
}

impl CreditApplication {
    /// Boundary validation; nothing out of range reaches the pipeline.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.age <= 18 || self.age >= 100 {
            return Err(out_of_range("age", "greater than 18 and less than 100", self.age));
        }
        check_amount("income", self.income, "greater than 0", |v| v > 0.0)?;
        check_amount("loanAmount", self.loan_amount, "greater than 0", |v| v > 0.0)?;
        check_amount(
            "interestRate",
            self.interest_rate,
            "greater than 0 and at most 30",
            |v| v > 0.0 && v <= 30.0,
        )?;
        check_amount("turnover", self.turnover, "greater than 0", |v| v > 0.0)?;
        check_amount("unpaidAmount", self.unpaid_amount, "at least 0", |v| v >= 0.0)?;

        for (field, value) in [
            ("customerTenure", self.customer_tenure),
            ("avgDaysLateCurrent", self.avg_days_late_current),
            ("numLatePaymentsCurrent", self.num_late_payments_current),
        ] {
            if value < 0 {
                return Err(out_of_range(field, "at least 0", value));
            }
        }

        Ok(())
    }

    /// Flatten into the external field record consumed by the feature mapper.
    pub fn to_raw_record(&self) -> Result<Map<String, Value>, ValidationError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ValidationError::Malformed(format!(
                "expected an object, found {other}"
            ))),
            Err(err) => Err(ValidationError::Malformed(err.to_string())),
        }
    }
}
