//! Signup and login orchestration.

use std::sync::Arc;

use serde::Deserialize;
use tokio::task::spawn_blocking;
use validator::Validate;

use crate::crypto::PasswordHasher;
use crate::token::TokenIssuer;
use crate::user::{NewUser, RepositoryError, User, UserRepository};

pub type Result<T> = std::result::Result<T, AccountError>;

/// Errors returned by [`AccountService`].
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("no such user")]
    NoSuchUser,
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("internal server error, {details}")]
    Internal {
        details: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl AccountError {
    fn internal<E>(details: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            details: details.to_owned(),
            source: Box::new(err),
        }
    }
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict => Self::UserAlreadyExists,
            err => Self::internal("user store failed", err),
        }
    }
}

/// Body of `POST /signup`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        email(message = "Email must be formatted."),
        custom(
            function = "crate::router::validate_not_blank",
            message = "Email must not be blank."
        )
    )]
    pub email: String,
    #[validate(custom(
        function = "crate::router::validate_not_blank",
        message = "Password must not be blank."
    ))]
    pub password: String,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        email(message = "Email must be formatted."),
        custom(
            function = "crate::router::validate_not_blank",
            message = "Email must not be blank."
        )
    )]
    pub email: String,
    #[validate(custom(
        function = "crate::router::validate_not_blank",
        message = "Password must not be blank."
    ))]
    pub password: String,
}

/// Account manager.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    token: Arc<dyn TokenIssuer>,
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(
        repo: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        token: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self {
            repo,
            hasher,
            token,
        }
    }

    /// Register a new user.
    ///
    /// The existence check is only a shortcut; the store rejects a
    /// concurrent duplicate on insert.
    pub async fn signup(&self, request: SignupRequest) -> Result<User> {
        if self.repo.exists(&request.email).await? {
            tracing::debug!("signup rejected, email already registered");
            return Err(AccountError::UserAlreadyExists);
        }

        let password_hash = self.hash_password(request.password).await?;

        let user = self
            .repo
            .save(NewUser {
                email: request.email,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = user.id, "user created");
        Ok(user)
    }

    /// Check credentials and issue a token.
    ///
    /// An unknown email is still verified against a decoy hash, so both
    /// failures take the same time.
    pub async fn login(&self, request: LoginRequest) -> Result<String> {
        let user = self.repo.find_by_email(&request.email).await?;
        let hash = user.as_ref().map(|user| user.password_hash().to_owned());
        let verified = self.verify_password(request.password, hash).await?;

        let Some(user) = user else {
            tracing::debug!("login rejected, unknown email");
            return Err(AccountError::NoSuchUser);
        };

        if !verified {
            tracing::debug!(user_id = user.id, "login rejected, wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self
            .token
            .issue(&user)
            .map_err(|err| AccountError::internal("token creation failed", err))?;

        tracing::info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    /// Argon2 runs on the blocking pool, away from the async workers.
    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);

        spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| AccountError::internal("hashing task failed", err))?
            .map_err(|err| AccountError::internal("password hashing failed", err))
    }

    /// `None` verifies against the decoy hash and always fails.
    async fn verify_password(
        &self,
        password: String,
        hash: Option<String>,
    ) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);

        spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => {
                hasher.verify(&password, hasher.decoy_hash());
                false
            },
        })
        .await
        .map_err(|err| AccountError::internal("verification task failed", err))
    }
}
