use super::domain::{NewUser, User, UserId};
use crate::storage::RepositoryError;

/// Storage abstraction for registered accounts.
pub trait UserRepository: Send + Sync {
    /// Assign an id and store the account. Duplicate emails are a `Conflict`.
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    /// Overwrite an existing account. Unknown ids are `NotFound`.
    fn update(&self, user: User) -> Result<(), RepositoryError>;
}
