//! In-memory document store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::user::{StoreError, User, UserRepository};

/// [`UserRepository`] keeping users in a map keyed by slug.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(slug).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.unique_slug) {
            return Err(StoreError::Duplicate {
                value: user.unique_slug.clone(),
            });
        }

        users.insert(user.unique_slug.clone(), user.clone());
        Ok(())
    }

    async fn delete(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(slug).is_some())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.users.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_slug() {
        let repo = MemoryUserRepository::new();
        let user = User::builder().username("a").slug("same").build("/");

        repo.insert(&user).await.unwrap();
        let err = repo.insert(&user).await.unwrap_err();

        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
