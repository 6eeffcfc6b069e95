use std::sync::Arc;

use tracing::{error, info};

use super::domain::{NewPrediction, PredictionId, PredictionQuery, PredictionRecord};
use super::repository::PredictionRepository;
use crate::accounts::UserId;
use crate::scoring::{CreditApplication, ScoreResult, ScoringContext, ScoringError};
use crate::storage::RepositoryError;

/// Scores applications against the shared context and keeps per-user history.
pub struct PredictionService<P> {
    context: Arc<ScoringContext>,
    predictions: Arc<P>,
}

impl<P> PredictionService<P>
where
    P: PredictionRepository + 'static,
{
    pub fn new(context: Arc<ScoringContext>, predictions: Arc<P>) -> Self {
        Self {
            context,
            predictions,
        }
    }

    pub fn context(&self) -> &ScoringContext {
        &self.context
    }

    pub fn repository(&self) -> Arc<P> {
        Arc::clone(&self.predictions)
    }

    /// Run the scoring pipeline. Nothing is persisted.
    pub fn score(&self, application: &CreditApplication) -> Result<ScoreResult, ScoringError> {
        info!(client = %application.client_name, "received application");
        let result = self.context.score(application)?;
        info!(
            client = %result.client,
            score = result.credit_score,
            decision = %result.decision,
            "processed application"
        );
        Ok(result)
    }

    /// Score then record. A storage failure is logged and never changes the result.
    pub fn predict(
        &self,
        application: &CreditApplication,
        owner: Option<UserId>,
    ) -> Result<ScoreResult, ScoringError> {
        let result = self.score(application)?;
        record_prediction(
            self.predictions.as_ref(),
            NewPrediction::from_result(application, &result, owner),
        );
        Ok(result)
    }

    pub fn history(
        &self,
        user_id: UserId,
        query: &PredictionQuery,
    ) -> Result<Vec<PredictionRecord>, PredictionServiceError> {
        Ok(self.predictions.list_for_user(user_id, query)?)
    }

    pub fn count(&self, user_id: UserId) -> Result<usize, PredictionServiceError> {
        Ok(self.predictions.count_for_user(user_id)?)
    }

    pub fn delete(&self, user_id: UserId, id: PredictionId) -> Result<(), PredictionServiceError> {
        self.predictions.delete(id, user_id)?;
        info!(prediction_id = id.0, user_id = user_id.0, "deleted prediction");
        Ok(())
    }
}

/// Best-effort insert used after the response has been decided.
pub fn record_prediction<P>(repository: &P, prediction: NewPrediction) -> Option<PredictionRecord>
where
    P: PredictionRepository + ?Sized,
{
    let client = prediction.client_name.clone();
    match repository.insert(prediction) {
        Ok(record) => Some(record),
        Err(err) => {
            error!(client = %client, error = %err, "failed to persist prediction");
            None
        }
    }
}

/// Error raised by the prediction history operations.
#[derive(Debug, thiserror::Error)]
pub enum PredictionServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
