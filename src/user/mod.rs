//! User accounts: storage and signup/login orchestration.

mod memory;
mod postgres;
mod repository;
mod service;

pub use memory::MemoryUserRepository;
pub use postgres::PgUserRepository;
pub use repository::{RepositoryError, UserRepository};
pub use service::{AccountError, AccountService, LoginRequest, SignupRequest};

/// Database user representation.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub(crate) password: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    /// Stored password hash.
    pub fn password_hash(&self) -> &str {
        &self.password
    }
}

/// User about to be inserted. Identifier is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}
