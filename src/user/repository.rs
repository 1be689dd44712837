//! User store port.

use async_trait::async_trait;

use crate::user::{NewUser, User};

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Unique constraint on `email` rejected the insert.
    #[error("email is already registered")]
    Conflict,
    #[error("SQL request failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence over a table of users keyed by unique email.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Whether a user with exactly this email exists.
    async fn exists(&self, email: &str) -> Result<bool>;

    /// Find a user using its exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new user, assigning its id.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the email is taken.
    async fn save(&self, user: NewUser) -> Result<User>;
}
