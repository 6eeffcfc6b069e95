use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::alignment::align_features;
use super::application::{CreditApplication, ValidationError};
use super::decision::{decide, key_factors, Decision, KeyFactors};
use super::encoding::encode_features;
use super::features::{map_features, GUARANTEE_FLAG};
use super::model::{CreditModel, InferenceError, ModelLoadError};
use super::schema::FeatureSchema;
use super::score::{calculate_credit_score, determine_risk_level, RiskLevel};

/// Outcome of one prediction. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    pub client: String,
    pub credit_score: i32,
    pub risk_level: RiskLevel,
    pub approval_probability: String,
    pub decision: Decision,
    pub key_factors: KeyFactors,
    pub model_version: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip)]
    pub default_probability: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Immutable, process-wide scoring state: the loaded model and its schema.
///
/// Built once at startup and shared read-only across requests.
#[derive(Clone)]
pub struct ScoringContext {
    schema: FeatureSchema,
    model: Arc<dyn CreditModel>,
    model_version: String,
}

impl fmt::Debug for ScoringContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringContext")
            .field("model_version", &self.model_version)
            .field("feature_names", &self.model.feature_names())
            .finish_non_exhaustive()
    }
}

impl ScoringContext {
    /// Check the model's declared feature list against the schema.
    pub fn new(
        schema: FeatureSchema,
        model: Arc<dyn CreditModel>,
        model_version: impl Into<String>,
    ) -> Result<Self, ModelLoadError> {
        let features = model.feature_names();
        if features.is_empty() {
            return Err(ModelLoadError::MissingFeatureList);
        }

        let mut seen = BTreeSet::new();
        for feature in features {
            if !seen.insert(feature.as_str()) {
                return Err(ModelLoadError::DuplicateFeature(feature.clone()));
            }
            let declared = schema.is_numeric(feature)
                || schema.is_categorical(feature)
                || feature == GUARANTEE_FLAG;
            if !declared {
                return Err(ModelLoadError::UndeclaredFeature(feature.clone()));
            }
        }

        Ok(Self {
            schema,
            model,
            model_version: model_version.into(),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn model(&self) -> &dyn CreditModel {
        self.model.as_ref()
    }

    pub fn feature_names(&self) -> &[String] {
        self.model.feature_names()
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Run the full pipeline stamped with the current time.
    pub fn score(&self, application: &CreditApplication) -> Result<ScoreResult, ScoringError> {
        self.score_at(application, Utc::now())
    }

    pub fn score_at(
        &self,
        application: &CreditApplication,
        timestamp: DateTime<Utc>,
    ) -> Result<ScoreResult, ScoringError> {
        let prob_default = self.default_probability(application)?;

        let credit_score = calculate_credit_score(prob_default);
        let approval = 100.0 * (1.0 - prob_default);

        Ok(ScoreResult {
            client: application.client_name.clone(),
            credit_score,
            risk_level: determine_risk_level(credit_score),
            approval_probability: format!("{approval:.1}%"),
            decision: decide(credit_score),
            key_factors: key_factors(application),
            model_version: self.model_version.clone(),
            timestamp,
            default_probability: prob_default,
        })
    }

    /// Validate, map, encode, align and run inference.
    pub fn default_probability(
        &self,
        application: &CreditApplication,
    ) -> Result<f64, ScoringError> {
        application.validate()?;

        let raw = application.to_raw_record()?;
        let mapped = map_features(&raw, self.schema.numeric_features())?;
        let encoded = encode_features(mapped, &self.schema);
        let row = align_features(&encoded, self.model.feature_names(), &self.schema);
        if !row.filled().is_empty() {
            debug!(filled = ?row.filled(), "filled absent features with defaults");
        }

        let probabilities = self.model.predict_proba(&row).map_err(|err| {
            error!(
                error = %err,
                width = row.width(),
                expected = self.model.feature_names().len(),
                "model inference failed"
            );
            err
        })?;

        let prob_default = probabilities[1];
        if !(0.0..=1.0).contains(&prob_default) {
            error!(
                probability = prob_default,
                width = row.width(),
                "model returned an out-of-range probability"
            );
            return Err(InferenceError::InvalidProbability(prob_default).into());
        }

        Ok(prob_default)
    }
}
