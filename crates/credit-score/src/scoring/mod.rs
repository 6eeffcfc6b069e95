//! Credit scoring pipeline: feature mapping, categorical encoding, feature
//! alignment, inference, score and decision derivation.

pub mod alignment;
pub mod application;
pub mod decision;
pub mod encoding;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod score;

#[cfg(test)]
pub(crate) mod tests;

pub use alignment::{align_features, AlignedFeatures};
pub use application::{CreditApplication, ValidationError};
pub use decision::{decide, key_factors, Decision, KeyFactors};
pub use encoding::{
    encode_features, CategoryCode, CategoryVocabulary, EncodedFeatures, EncodedValue,
    EncodingError, UnseenCategory, MISSING_CATEGORY,
};
pub use features::{map_features, FeatureRecord, FeatureValue, FEATURE_MAPPING, GUARANTEE_FLAG};
pub use model::{
    load_context, ClassifierSpec, CreditModel, InferenceError, LogisticRegression, ModelArtifact,
    ModelLoadError,
};
pub use pipeline::{ScoreResult, ScoringContext, ScoringError};
pub use schema::FeatureSchema;
pub use score::{
    calculate_credit_score, determine_risk_level, RiskLevel, MAX_CREDIT_SCORE, MIN_CREDIT_SCORE,
    SCORE_EPSILON,
};
