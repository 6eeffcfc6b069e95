//! Model artifact loading and inference.
//!
//! The artifact is a JSON document carrying the ordered feature list, the
//! numeric/categorical split, per-feature vocabularies and a standardized
//! logistic-regression classifier. Everything is validated once at load so
//! that requests never see a malformed model.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use super::alignment::AlignedFeatures;
use super::encoding::EncodingError;
use super::pipeline::ScoringContext;
use super::schema::FeatureSchema;

/// Inference seam; tests substitute lightweight fakes.
pub trait CreditModel: Send + Sync {
    /// Authoritative, ordered list of input features.
    fn feature_names(&self) -> &[String];

    /// Class probabilities `[P(repaid), P(default)]` for one aligned row.
    fn predict_proba(&self, row: &AlignedFeatures) -> Result<[f64; 2], InferenceError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("model expects {expected} features, received {found}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("model produced an invalid probability ({0})")]
    InvalidProbability(f64),
    #[error("model evaluation failed: {0}")]
    Model(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model artifact declares no expected feature list")]
    MissingFeatureList,
    #[error("feature '{0}' is listed more than once")]
    DuplicateFeature(String),
    #[error("feature '{0}' is neither numeric nor categorical")]
    UndeclaredFeature(String),
    #[error("classifier {field} has {found} entries, expected {expected}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("classifier scale for '{feature}' must be finite and non-zero")]
    InvalidScale { feature: String },
    #[error("classifier parameter for '{feature}' is not finite")]
    NonFiniteParameter { feature: String },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

fn default_model_version() -> String {
    "1.0".to_string()
}

/// On-disk model artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_model_version")]
    pub model_version: String,
    #[serde(default)]
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub numeric_features: Vec<String>,
    #[serde(default)]
    pub categorical_features: Vec<String>,
    #[serde(default)]
    pub vocabularies: BTreeMap<String, Vec<String>>,
    pub classifier: ClassifierSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LogisticRegression {
        intercept: f64,
        coefficients: Vec<f64>,
        means: Vec<f64>,
        scales: Vec<f64>,
    },
}

impl ModelArtifact {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ModelLoadError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelLoadError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validate the artifact and build the shared scoring context.
    pub fn into_context(self) -> Result<ScoringContext, ModelLoadError> {
        let ModelArtifact {
            model_version,
            feature_names,
            numeric_features,
            categorical_features,
            vocabularies,
            classifier,
        } = self;

        let schema = FeatureSchema::with_categorical(
            numeric_features.into_iter().collect::<BTreeSet<_>>(),
            &categorical_features,
            vocabularies,
        )?;

        let model = match classifier {
            ClassifierSpec::LogisticRegression {
                intercept,
                coefficients,
                means,
                scales,
            } => LogisticRegression::new(feature_names, intercept, coefficients, means, scales)?,
        };

        ScoringContext::new(schema, Arc::new(model), model_version)
    }
}

/// Load and validate the artifact at `path`. Failure is fatal at startup.
pub fn load_context(path: impl AsRef<Path>) -> Result<ScoringContext, ModelLoadError> {
    ModelArtifact::from_path(path)?.into_context()
}

/// Binary logistic regression over standardized inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    feature_names: Vec<String>,
    intercept: f64,
    coefficients: Vec<f64>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl LogisticRegression {
    pub fn new(
        feature_names: Vec<String>,
        intercept: f64,
        coefficients: Vec<f64>,
        means: Vec<f64>,
        scales: Vec<f64>,
    ) -> Result<Self, ModelLoadError> {
        if feature_names.is_empty() {
            return Err(ModelLoadError::MissingFeatureList);
        }

        let expected = feature_names.len();
        for (field, values) in [
            ("coefficients", &coefficients),
            ("means", &means),
            ("scales", &scales),
        ] {
            if values.len() != expected {
                return Err(ModelLoadError::ShapeMismatch {
                    field,
                    expected,
                    found: values.len(),
                });
            }
        }

        if !intercept.is_finite() {
            return Err(ModelLoadError::NonFiniteParameter {
                feature: "intercept".to_string(),
            });
        }

        for (index, feature) in feature_names.iter().enumerate() {
            if !coefficients[index].is_finite() || !means[index].is_finite() {
                return Err(ModelLoadError::NonFiniteParameter {
                    feature: feature.clone(),
                });
            }
            let scale = scales[index];
            if !scale.is_finite() || scale == 0.0 {
                return Err(ModelLoadError::InvalidScale {
                    feature: feature.clone(),
                });
            }
        }

        Ok(Self {
            feature_names,
            intercept,
            coefficients,
            means,
            scales,
        })
    }

    fn linear_predictor(&self, values: &[f64]) -> f64 {
        values
            .iter()
            .zip(&self.coefficients)
            .zip(self.means.iter().zip(&self.scales))
            .fold(self.intercept, |acc, ((value, weight), (mean, scale))| {
                acc + weight * (value - mean) / scale
            })
    }
}

impl CreditModel for LogisticRegression {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, row: &AlignedFeatures) -> Result<[f64; 2], InferenceError> {
        if row.width() != self.coefficients.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.coefficients.len(),
                found: row.width(),
            });
        }

        let z = self.linear_predictor(row.values());
        let p_default = 1.0 / (1.0 + (-z).exp());
        if !p_default.is_finite() {
            return Err(InferenceError::Model(format!(
                "non-finite output for linear predictor {z}"
            )));
        }

        Ok([1.0 - p_default, p_default])
    }
}
