use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::application::ValidationError;

/// Form field name to model feature name.
///
/// Form fields without an entry (employment, loan purpose, location, ...) are
/// kept for history records but never reach the model.
pub const FEATURE_MAPPING: [(&str, &str); 14] = [
    ("age", "age"),
    ("income", "income"),
    ("loanAmount", "loan_amount"),
    ("interestRate", "interest_rate"),
    ("turnover", "turnover"),
    ("customerTenure", "customer_tenure"),
    ("avgDaysLateCurrent", "avg_days_late_current"),
    ("numLatePaymentsCurrent", "num_late_payments_current"),
    ("unpaidAmount", "unpaid_amount"),
    ("industrySector", "industry_sector"),
    ("creditType", "credit_type"),
    ("hasGuarantee", "has_guarantee"),
    ("guaranteeType", "guarantee_type"),
    ("repaymentFrequency", "repayment_frequency"),
];

/// Internal name of the boolean-like guarantee field.
pub const GUARANTEE_FLAG: &str = "has_guarantee";

const TRUTHY: [&str; 3] = ["yes", "true", "1"];

/// Normalized value of a single model feature before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Flag(u8),
    /// `None` when the form sent null; encoded as the `missing` token.
    Category(Option<String>),
}

/// Single-row record keyed by internal feature names.
pub type FeatureRecord = BTreeMap<String, FeatureValue>;

/// Translate external form fields into internal features.
///
/// Fields absent from `raw` are omitted; alignment fills them later.
pub fn map_features(
    raw: &Map<String, Value>,
    numeric_features: &BTreeSet<String>,
) -> Result<FeatureRecord, ValidationError> {
    let mut record = FeatureRecord::new();

    for (form_field, feature) in FEATURE_MAPPING {
        let Some(value) = raw.get(form_field) else {
            continue;
        };

        let mapped = if numeric_features.contains(feature) {
            FeatureValue::Numeric(coerce_numeric(form_field, value)?)
        } else if feature == GUARANTEE_FLAG {
            FeatureValue::Flag(guarantee_flag(value))
        } else {
            FeatureValue::Category(category_value(value))
        };

        record.insert(feature.to_string(), mapped);
    }

    Ok(record)
}

fn coerce_numeric(field: &str, value: &Value) -> Result<f64, ValidationError> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(number) if number.is_finite() => Ok(number),
        _ => Err(ValidationError::NotNumeric {
            field: field.to_string(),
            found: value.to_string(),
        }),
    }
}

fn guarantee_flag(value: &Value) -> u8 {
    let text = match value {
        Value::String(text) => text.to_lowercase(),
        other => other.to_string().to_lowercase(),
    };
    u8::from(TRUTHY.contains(&text.as_str()))
}

fn category_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
