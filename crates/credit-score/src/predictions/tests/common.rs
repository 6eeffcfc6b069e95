use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};

use crate::accounts::UserId;
use crate::predictions::{
    NewPrediction, PredictionId, PredictionQuery, PredictionRecord, PredictionRepository,
    PredictionService,
};
use crate::scoring::tests::common::static_context;
use crate::storage::RepositoryError;

/// Each insert lands one minute after the previous one so ordering is deterministic.
#[derive(Default, Clone)]
pub(crate) struct MemoryPredictions {
    records: Arc<Mutex<HashMap<PredictionId, PredictionRecord>>>,
}

impl MemoryPredictions {
    pub(crate) fn all(&self) -> Vec<PredictionRecord> {
        let mut records: Vec<_> = self
            .records
            .lock()
            .expect("repository mutex poisoned")
            .values()
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }
}

impl PredictionRepository for MemoryPredictions {
    fn insert(&self, prediction: NewPrediction) -> Result<PredictionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let sequence = guard.len() as i64 + 1;
        let timestamp = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
            + Duration::minutes(sequence);
        let record = PredictionRecord::from_new(PredictionId(sequence), prediction, timestamp);
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    fn list_for_user(
        &self,
        user_id: UserId,
        query: &PredictionQuery,
    ) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let owned = guard
            .values()
            .filter(|record| record.user_id == Some(user_id))
            .cloned()
            .collect();
        Ok(query.apply(owned))
    }

    fn count_for_user(&self, user_id: UserId) -> Result<usize, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.user_id == Some(user_id))
            .count())
    }

    fn fetch(&self, id: PredictionId) -> Result<Option<PredictionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn delete(&self, id: PredictionId, user_id: UserId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get(&id) {
            Some(record) if record.user_id == Some(user_id) => {
                guard.remove(&id);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}

pub(crate) struct UnavailablePredictions;

impl PredictionRepository for UnavailablePredictions {
    fn insert(&self, _prediction: NewPrediction) -> Result<PredictionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_for_user(
        &self,
        _user_id: UserId,
        _query: &PredictionQuery,
    ) -> Result<Vec<PredictionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn count_for_user(&self, _user_id: UserId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: PredictionId) -> Result<Option<PredictionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: PredictionId, _user_id: UserId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(crate) fn build_predictions(
    p_default: f64,
) -> (PredictionService<MemoryPredictions>, Arc<MemoryPredictions>) {
    let repository = Arc::new(MemoryPredictions::default());
    let service = PredictionService::new(Arc::new(static_context(p_default)), repository.clone());
    (service, repository)
}
