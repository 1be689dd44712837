//! Process-local user repository.
//!
//! Used when no PostgreSQL instance is configured. Data is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::repository::{RepositoryError, Result, UserRepository};
use super::{NewUser, User};

#[derive(Default)]
struct Table {
    last_id: i64,
    users: HashMap<String, User>,
}

/// In-memory user repository.
#[derive(Default)]
pub struct MemoryUserRepository {
    table: Mutex<Table>,
}

impl MemoryUserRepository {
    /// Create an empty [`MemoryUserRepository`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn exists(&self, email: &str) -> Result<bool> {
        Ok(self.table.lock().await.users.contains_key(email))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.table.lock().await.users.get(email).cloned())
    }

    async fn save(&self, user: NewUser) -> Result<User> {
        let mut table = self.table.lock().await;
        if table.users.contains_key(&user.email) {
            return Err(RepositoryError::Conflict);
        }

        table.last_id += 1;
        let user = User {
            id: table.last_id,
            email: user.email,
            password: user.password_hash,
            created_at: Utc::now(),
        };
        table.users.insert(user.email.clone(), user.clone());

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_ids() {
        let repo = MemoryUserRepository::new();

        let first = repo.save(new_user("a@b.com")).await.unwrap();
        let second = repo.save(new_user("c@d.com")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        assert!(repo.exists("a@b.com").await.unwrap());
        assert_eq!(repo.find_by_email("c@d.com").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_email_is_case_sensitive() {
        let repo = MemoryUserRepository::new();
        repo.save(new_user("a@b.com")).await.unwrap();

        assert!(!repo.exists("A@b.com").await.unwrap());
        assert!(repo.find_by_email("A@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_duplicates() {
        let repo = Arc::new(MemoryUserRepository::new());

        let handles = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.save(new_user("race@b.com")).await })
            })
            .collect::<Vec<_>>();

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(RepositoryError::Conflict) => conflicts += 1,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);
    }
}
