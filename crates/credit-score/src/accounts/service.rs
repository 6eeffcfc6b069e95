use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{LoginRequest, NewUser, RegisterRequest, TokenPair, User, UserUpdate};
use super::password::{hash_password, verify_password, PasswordError};
use super::repository::UserRepository;
use super::tokens::{TokenError, TokenIssuer, TokenKind};
use crate::storage::RepositoryError;

const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration, login and bearer-token resolution over a user repository.
pub struct AccountService<U> {
    users: Arc<U>,
    tokens: TokenIssuer,
}

impl<U> AccountService<U>
where
    U: UserRepository + 'static,
{
    pub fn new(users: Arc<U>, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn register(&self, request: RegisterRequest) -> Result<User, AccountError> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(AccountError::InvalidInput(
                "username must not be empty".to_string(),
            ));
        }
        validate_password(&request.password)?;

        if self.users.find_by_email(&email)?.is_some() {
            return Err(AccountError::EmailTaken);
        }

        let user = self
            .users
            .insert(NewUser {
                email,
                username,
                hashed_password: hash_password(&request.password)?,
                created_at: Utc::now(),
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => AccountError::EmailTaken,
                other => AccountError::Repository(other),
            })?;

        info!(user_id = user.id.0, "registered user");
        Ok(user)
    }

    /// Check credentials without issuing tokens.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_by_email(&email)? else {
            warn!("login attempt for unknown account");
            return Err(AccountError::InvalidCredentials);
        };
        if !verify_password(password, &user.hashed_password)? {
            warn!(user_id = user.id.0, "login attempt with wrong password");
            return Err(AccountError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Authenticate and issue an access/refresh pair; records `last_login`.
    pub fn login(&self, credentials: &LoginRequest) -> Result<TokenPair, AccountError> {
        let mut user = self.authenticate(&credentials.username, &credentials.password)?;

        user.last_login = Some(Utc::now());
        if let Err(err) = self.users.update(user.clone()) {
            warn!(user_id = user.id.0, error = %err, "failed to record last login");
        }

        self.issue_pair(&user.email)
    }

    /// Exchange a refresh token for a fresh token pair.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AccountError> {
        let claims = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh)
            .map_err(|err| {
                warn!(error = %err, "refresh token rejected");
                AccountError::Unauthorized
            })?;
        let user = self
            .users
            .find_by_email(&claims.sub)?
            .ok_or(AccountError::Unauthorized)?;
        self.issue_pair(&user.email)
    }

    /// Resolve the account behind an access token.
    pub fn current_user(&self, access_token: &str) -> Result<User, AccountError> {
        let claims = self
            .tokens
            .verify(access_token, TokenKind::Access)
            .map_err(|err| {
                warn!(error = %err, "access token rejected");
                AccountError::Unauthorized
            })?;
        self.users
            .find_by_email(&claims.sub)?
            .ok_or(AccountError::Unauthorized)
    }

    /// Apply profile changes. Changing the email invalidates outstanding tokens.
    pub fn update_profile(&self, user: &User, update: UserUpdate) -> Result<User, AccountError> {
        let mut updated = user.clone();

        if let Some(email) = update.email {
            let email = normalize_email(&email);
            validate_email(&email)?;
            if email != user.email {
                if self.users.find_by_email(&email)?.is_some() {
                    return Err(AccountError::EmailTaken);
                }
                updated.email = email;
            }
        }

        if let Some(username) = update.username {
            let username = username.trim().to_string();
            if username.is_empty() {
                return Err(AccountError::InvalidInput(
                    "username must not be empty".to_string(),
                ));
            }
            updated.username = username;
        }

        if let Some(password) = update.password {
            validate_password(&password)?;
            updated.hashed_password = hash_password(&password)?;
        }

        self.users.update(updated.clone())?;
        info!(user_id = updated.id.0, "updated user profile");
        Ok(updated)
    }

    fn issue_pair(&self, email: &str) -> Result<TokenPair, AccountError> {
        let access = self.tokens.issue(email, TokenKind::Access)?;
        let refresh = self.tokens.issue(email, TokenKind::Refresh)?;
        Ok(TokenPair::bearer(access, refresh))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn validate_email(email: &str) -> Result<(), AccountError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AccountError::InvalidInput(format!(
            "'{email}' is not a valid email address"
        ))),
    }
}

fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Error raised by the account service.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Email already registered")]
    EmailTaken,
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Could not validate credentials")]
    Unauthorized,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
