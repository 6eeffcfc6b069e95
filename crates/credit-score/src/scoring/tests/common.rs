use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::scoring::{
    load_context, AlignedFeatures, CreditApplication, CreditModel, FeatureSchema, InferenceError,
    ScoringContext,
};

pub(crate) const NUMERIC_FEATURES: [&str; 9] = [
    "age",
    "income",
    "loan_amount",
    "interest_rate",
    "turnover",
    "customer_tenure",
    "avg_days_late_current",
    "num_late_payments_current",
    "unpaid_amount",
];

pub(crate) fn feature_names() -> Vec<String> {
    NUMERIC_FEATURES
        .iter()
        .copied()
        .chain([
            "industry_sector",
            "credit_type",
            "has_guarantee",
            "guarantee_type",
            "repayment_frequency",
        ])
        .map(String::from)
        .collect()
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(crate) fn schema() -> FeatureSchema {
    let mut vocabularies = BTreeMap::new();
    vocabularies.insert(
        "industry_sector".to_string(),
        labels(&["agriculture", "missing", "retail", "technology"]),
    );
    vocabularies.insert(
        "credit_type".to_string(),
        labels(&["business_loan", "consumer_loan", "missing"]),
    );
    vocabularies.insert(
        "guarantee_type".to_string(),
        labels(&["collateral", "missing", "none"]),
    );
    vocabularies.insert(
        "repayment_frequency".to_string(),
        labels(&["annual", "missing", "monthly"]),
    );
    FeatureSchema::new(
        NUMERIC_FEATURES.iter().map(|name| name.to_string()).collect::<BTreeSet<_>>(),
        vocabularies,
    )
    .expect("valid schema")
}

/// Model returning a fixed probability of default.
pub(crate) struct StaticModel {
    pub(crate) features: Vec<String>,
    pub(crate) p_default: f64,
    pub(crate) last_row: Mutex<Option<AlignedFeatures>>,
}

impl StaticModel {
    pub(crate) fn new(p_default: f64) -> Self {
        Self {
            features: feature_names(),
            p_default,
            last_row: Mutex::new(None),
        }
    }

    pub(crate) fn last_row(&self) -> Option<AlignedFeatures> {
        self.last_row.lock().expect("row mutex poisoned").clone()
    }
}

impl CreditModel for StaticModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, row: &AlignedFeatures) -> Result<[f64; 2], InferenceError> {
        *self.last_row.lock().expect("row mutex poisoned") = Some(row.clone());
        Ok([1.0 - self.p_default, self.p_default])
    }
}

/// Model whose inference call always fails.
pub(crate) struct FailingModel {
    features: Vec<String>,
}

impl FailingModel {
    pub(crate) fn new() -> Self {
        Self {
            features: feature_names(),
        }
    }
}

impl CreditModel for FailingModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, row: &AlignedFeatures) -> Result<[f64; 2], InferenceError> {
        Err(InferenceError::ShapeMismatch {
            expected: row.width() + 1,
            found: row.width(),
        })
    }
}

pub(crate) fn static_context(p_default: f64) -> ScoringContext {
    ScoringContext::new(schema(), Arc::new(StaticModel::new(p_default)), "test")
        .expect("valid context")
}

pub(crate) fn context_with(model: Arc<dyn CreditModel>) -> ScoringContext {
    ScoringContext::new(schema(), model, "test").expect("valid context")
}

pub(crate) fn bundled_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/credit_scoring_model.json")
}

pub(crate) fn bundled_context() -> ScoringContext {
    load_context(bundled_model_path()).expect("bundled model loads")
}

pub(crate) fn application() -> CreditApplication {
    CreditApplication {
        client_name: "Acme Farms".to_string(),
        age: 35,
        income: 120_000.0,
        employment: "employed".to_string(),
        loan_amount: 10_000.0,
        loan_purpose: "business".to_string(),
        location: "Douala".to_string(),
        phone_usage: "moderate".to_string(),
        utility_payments: "excellent".to_string(),
        interest_rate: 8.0,
        turnover: 300_000.0,
        customer_tenure: 30,
        avg_days_late_current: 0,
        num_late_payments_current: 0,
        unpaid_amount: 0.0,
        industry_sector: "technology".to_string(),
        credit_type: "consumer_loan".to_string(),
        has_guarantee: "yes".to_string(),
        guarantee_type: "collateral".to_string(),
        repayment_frequency: "monthly".to_string(),
    }
}

pub(crate) fn late_payer() -> CreditApplication {
    let mut application = application();
    application.client_name = "Late Payer".to_string();
    application.avg_days_late_current = 20;
    application.num_late_payments_current = 5;
    application
}
