use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Duration;

use crate::accounts::{
    AccountService, NewUser, RegisterRequest, TokenIssuer, User, UserId, UserRepository,
};
use crate::storage::RepositoryError;

pub(crate) const PASSWORD: &str = "s3cure-passw0rd";

pub(crate) fn issuer() -> TokenIssuer {
    TokenIssuer::new("unit-test-secret", Duration::minutes(30), Duration::days(7))
}

pub(crate) fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        username: "ada".to_string(),
        password: PASSWORD.to_string(),
    }
}

pub(crate) fn build_accounts() -> (AccountService<MemoryUsers>, Arc<MemoryUsers>) {
    let users = Arc::new(MemoryUsers::default());
    let service = AccountService::new(users.clone(), issuer());
    (service, users)
}

#[derive(Default, Clone)]
pub(crate) struct MemoryUsers {
    records: Arc<Mutex<HashMap<UserId, User>>>,
}

impl MemoryUsers {
    pub(crate) fn get(&self, id: UserId) -> Option<User> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&id)
            .cloned()
    }
}

impl UserRepository for MemoryUsers {
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        let id = UserId(guard.len() as i64 + 1);
        let stored = User {
            id,
            email: user.email,
            username: user.username,
            hashed_password: user.hashed_password,
            created_at: user.created_at,
            last_login: None,
        };
        guard.insert(id, stored.clone());
        Ok(stored)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().find(|user| user.email == email).cloned())
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn update(&self, user: User) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(user.id, user);
        Ok(())
    }
}

pub(crate) struct UnavailableUsers;

impl UserRepository for UnavailableUsers {
    fn insert(&self, _user: NewUser) -> Result<User, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_email(&self, _email: &str) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_id(&self, _id: UserId) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _user: User) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
