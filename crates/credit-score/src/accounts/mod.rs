//! User accounts: registration, password login and bearer tokens.

pub mod domain;
pub mod password;
pub mod repository;
pub mod service;
pub mod tokens;

#[cfg(test)]
pub(crate) mod tests;

pub use domain::{
    LoginRequest, NewUser, RefreshRequest, RegisterRequest, TokenPair, User, UserId, UserUpdate,
    UserView,
};
pub use password::{hash_password, verify_password, PasswordError};
pub use repository::UserRepository;
pub use service::{AccountError, AccountService};
pub use tokens::{bearer_token, Claims, TokenError, TokenIssuer, TokenKind};
