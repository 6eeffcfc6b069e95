use chrono::Utc;
use credit_score::accounts::{NewUser, User, UserId, UserRepository};
use credit_score::predictions::{
    NewPrediction, PredictionId, PredictionQuery, PredictionRecord, PredictionRepository,
};
use credit_score::storage::RepositoryError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) model_version: Arc<str>,
}

#[derive(Default)]
struct UserTable {
    next_id: i64,
    rows: HashMap<UserId, User>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryUserRepository {
    table: Arc<Mutex<UserTable>>,
}

impl UserRepository for InMemoryUserRepository {
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        if guard.rows.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        guard.next_id += 1;
        let stored = User {
            id: UserId(guard.next_id),
            email: user.email,
            username: user.username,
            hashed_password: user.hashed_password,
            created_at: user.created_at,
            last_login: None,
        };
        guard.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.rows.values().find(|user| user.email == email).cloned())
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.rows.get(&id).cloned())
    }

    fn update(&self, user: User) -> Result<(), RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        if guard
            .rows
            .values()
            .any(|existing| existing.id != user.id && existing.email == user.email)
        {
            return Err(RepositoryError::Conflict);
        }
        match guard.rows.get_mut(&user.id) {
            Some(existing) => {
                *existing = user;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[derive(Default)]
struct PredictionTable {
    next_id: i64,
    rows: HashMap<PredictionId, PredictionRecord>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPredictionRepository {
    table: Arc<Mutex<PredictionTable>>,
}

impl PredictionRepository for InMemoryPredictionRepository {
    fn insert(&self, prediction: NewPrediction) -> Result<PredictionRecord, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        guard.next_id += 1;
        let record = PredictionRecord::from_new(PredictionId(guard.next_id), prediction, Utc::now());
        guard.rows.insert(record.id, record.clone());
        Ok(record)
    }

    fn list_for_user(
        &self,
        user_id: UserId,
        query: &PredictionQuery,
    ) -> Result<Vec<PredictionRecord>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        let owned = guard
            .rows
            .values()
            .filter(|record| record.user_id == Some(user_id))
            .cloned()
            .collect();
        Ok(query.apply(owned))
    }

    fn count_for_user(&self, user_id: UserId) -> Result<usize, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard
            .rows
            .values()
            .filter(|record| record.user_id == Some(user_id))
            .count())
    }

    fn fetch(&self, id: PredictionId) -> Result<Option<PredictionRecord>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.rows.get(&id).cloned())
    }

    fn delete(&self, id: PredictionId, user_id: UserId) -> Result<(), RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        let owned = guard
            .rows
            .get(&id)
            .is_some_and(|record| record.user_id == Some(user_id));
        if !owned {
            return Err(RepositoryError::NotFound);
        }
        guard.rows.remove(&id);
        Ok(())
    }
}
