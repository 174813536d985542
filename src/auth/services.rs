use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{
    errors::AuthError,
    jwt::JwtKeys,
    password::{hash_password_blocking, verify_password_blocking},
    repo::CredentialStore,
    repo_types::{StoreError, User},
};

/// Outcome of a successful registration.
#[derive(Debug, Clone)]
pub struct Registered {
    pub email: String,
    pub created_at: OffsetDateTime,
}

/// Outcome of a successful login.
#[derive(Debug, Clone)]
pub struct LoggedIn {
    pub token: String,
    pub email: String,
    pub created_at: OffsetDateTime,
}

/// Trims and lowercases; emails compare case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalized `(email, password)` if both are present and non-empty.
fn required(email: Option<&str>, password: Option<&str>) -> Result<(String, String), AuthError> {
    let email = email.map(normalize_email).unwrap_or_default();
    let password = password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::Validation);
    }
    Ok((email, password.to_string()))
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn register(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<Registered, AuthError> {
        let (email, password) = required(email, password)?;

        // Fast path only; the store insert is what enforces uniqueness.
        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let hash = hash_password_blocking(password).await?;

        let user = match self.store.insert(&email, &hash).await {
            Ok(u) => u,
            Err(StoreError::DuplicateEmail) => {
                warn!(email = %email, "email registered concurrently");
                return Err(AuthError::DuplicateEmail);
            }
            Err(StoreError::Backend(e)) => return Err(AuthError::Internal(e)),
        };

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(Registered {
            email: user.email,
            created_at: user.created_at,
        })
    }

    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<LoggedIn, AuthError> {
        let (email, password) = required(email, password)?;

        let user = match self.store.find_by_email(&email).await? {
            Some(u) => u,
            None => {
                warn!(email = %email, "login unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password_blocking(password, user.password_hash.clone()).await? {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.sign(user.id, &user.email)?;

        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(LoggedIn {
            token,
            email: user.email,
            created_at: user.created_at,
        })
    }

    /// Record behind a verified token's subject.
    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthorized("User not found"))
    }
}
