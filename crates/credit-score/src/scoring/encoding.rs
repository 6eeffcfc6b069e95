use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use super::features::{FeatureRecord, FeatureValue};
use super::schema::FeatureSchema;

/// Token standing in for absent categorical values.
pub const MISSING_CATEGORY: &str = "missing";

/// Vocabulary construction failures. These are configuration faults raised
/// while loading the model, never per request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("vocabulary for '{feature}' is empty")]
    EmptyVocabulary { feature: String },
    #[error("vocabulary for '{feature}' lists '{label}' more than once")]
    DuplicateLabel { feature: String, label: String },
    #[error("categorical feature '{feature}' has no vocabulary")]
    MissingVocabulary { feature: String },
}

/// Fixed label-to-code mapping for one categorical feature.
///
/// Codes are positions in the stored label order. The fallback for unseen
/// labels is the first stored label; whether that is also the most frequent
/// training category depends on how the artifact was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryVocabulary {
    labels: Vec<String>,
    codes: HashMap<String, u32>,
}

/// Result of resolving one raw label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryCode {
    pub code: u32,
    pub unseen: bool,
}

impl CategoryVocabulary {
    pub fn new(feature: &str, labels: Vec<String>) -> Result<Self, EncodingError> {
        if labels.is_empty() {
            return Err(EncodingError::EmptyVocabulary {
                feature: feature.to_string(),
            });
        }

        let mut codes = HashMap::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            if codes.insert(label.clone(), index as u32).is_some() {
                return Err(EncodingError::DuplicateLabel {
                    feature: feature.to_string(),
                    label: label.clone(),
                });
            }
        }

        Ok(Self { labels, codes })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn fallback_label(&self) -> &str {
        &self.labels[0]
    }

    pub fn code_of(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }

    pub fn encode(&self, label: &str) -> CategoryCode {
        match self.code_of(label) {
            Some(code) => CategoryCode {
                code,
                unseen: false,
            },
            None => CategoryCode {
                code: 0,
                unseen: true,
            },
        }
    }
}

/// Encoded value ready for alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodedValue {
    Numeric(f64),
    Code(u32),
    Flag(u8),
}

impl EncodedValue {
    pub fn as_f64(self) -> f64 {
        match self {
            EncodedValue::Numeric(value) => value,
            EncodedValue::Code(code) => f64::from(code),
            EncodedValue::Flag(flag) => f64::from(flag),
        }
    }
}

/// Category label that was not in the vocabulary and got substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnseenCategory {
    pub feature: String,
    pub value: String,
    pub substituted: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedFeatures {
    pub values: BTreeMap<String, EncodedValue>,
    pub unseen: Vec<UnseenCategory>,
}

/// Replace every categorical value by its vocabulary code.
///
/// Total over a validated schema: unseen labels take the fallback code and
/// text values for features the model never declared are dropped.
pub fn encode_features(record: FeatureRecord, schema: &FeatureSchema) -> EncodedFeatures {
    let mut encoded = EncodedFeatures::default();

    for (feature, value) in record {
        if let Some(vocabulary) = schema.vocabulary(&feature) {
            let raw = match value {
                FeatureValue::Category(Some(text)) => text,
                FeatureValue::Category(None) => MISSING_CATEGORY.to_string(),
                FeatureValue::Flag(flag) => flag.to_string(),
                FeatureValue::Numeric(number) => number.to_string(),
            };

            let resolved = vocabulary.encode(&raw);
            if resolved.unseen {
                warn!(
                    feature = %feature,
                    value = %raw,
                    fallback = vocabulary.fallback_label(),
                    "unseen category, substituting fallback"
                );
                encoded.unseen.push(UnseenCategory {
                    feature: feature.clone(),
                    value: raw,
                    substituted: vocabulary.fallback_label().to_string(),
                });
            }
            encoded
                .values
                .insert(feature, EncodedValue::Code(resolved.code));
            continue;
        }

        match value {
            FeatureValue::Numeric(number) => {
                encoded.values.insert(feature, EncodedValue::Numeric(number));
            }
            FeatureValue::Flag(flag) => {
                encoded.values.insert(feature, EncodedValue::Flag(flag));
            }
            FeatureValue::Category(_) => {
                tracing::debug!(feature = %feature, "dropping text feature unknown to the model");
            }
        }
    }

    encoded
}
