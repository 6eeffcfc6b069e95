//! Prediction history: persisting scored applications and querying them per user.

pub mod domain;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    NewPrediction, PredictionId, PredictionQuery, PredictionQueryParams, PredictionRecord,
    SortDirection, SortField, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use repository::PredictionRepository;
pub use service::{record_prediction, PredictionService, PredictionServiceError};
