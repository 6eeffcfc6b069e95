use super::domain::{NewPrediction, PredictionId, PredictionQuery, PredictionRecord};
use crate::accounts::UserId;
use crate::storage::RepositoryError;

/// Storage abstraction for scored applications.
pub trait PredictionRepository: Send + Sync {
    /// Assign an id and timestamp and store the prediction.
    fn insert(&self, prediction: NewPrediction) -> Result<PredictionRecord, RepositoryError>;
    fn list_for_user(
        &self,
        user_id: UserId,
        query: &PredictionQuery,
    ) -> Result<Vec<PredictionRecord>, RepositoryError>;
    fn count_for_user(&self, user_id: UserId) -> Result<usize, RepositoryError>;
    fn fetch(&self, id: PredictionId) -> Result<Option<PredictionRecord>, RepositoryError>;
    /// Remove a prediction owned by `user_id`; anything else is `NotFound`.
    fn delete(&self, id: PredictionId, user_id: UserId) -> Result<(), RepositoryError>;
}
