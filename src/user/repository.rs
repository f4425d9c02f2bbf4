//! Handle database requests.

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use thiserror::Error;

use crate::user::User;

/// Errors returned by a [`UserRepository`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique index on `unique_slug` rejected the write.
    #[error("duplicate value `{value}` for unique field `unique_slug`")]
    Duplicate { value: String },

    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}

/// Document store holding users, with a uniqueness constraint on
/// `unique_slug`.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by exact slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user.
    ///
    /// Must fail with [`StoreError::Duplicate`] if the slug is taken, even when
    /// a previous [`UserRepository::find_by_slug`] returned nothing.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    /// Delete a user by slug. Returns whether a row was removed.
    async fn delete(&self, slug: &str) -> Result<bool, StoreError>;

    /// Total number of users.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// PostgreSQL backed [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    /// Create a new [`PgUserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT username, unique_slug, url, images, secret
                FROM users
                WHERE unique_slug = $1"#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO users (username, unique_slug, url, images, secret)
                VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(&user.username)
        .bind(&user.unique_slug)
        .bind(&user.url)
        .bind(&user.images)
        .bind(&user.secret)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::Duplicate {
                    value: user.unique_slug.clone(),
                }
            },
            err => StoreError::Sql(err),
        })?;

        Ok(())
    }

    async fn delete(&self, slug: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM users WHERE unique_slug = $1"#)
            .bind(slug)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.pool)
            .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::builder()
            .username("Alice")
            .slug("alice123")
            .images(vec!["https://cdn/1.png".into(), "https://cdn/2.png".into()])
            .secret(crate::user::Secret::try_from("1234".to_owned()).ok())
            .build("https://x/user/")
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance in DATABASE_URL"]
    async fn test_insert_and_find(pool: Pool<Postgres>) {
        let repo = PgUserRepository::new(pool);
        repo.insert(&alice()).await.unwrap();

        let user = repo.find_by_slug("alice123").await.unwrap().unwrap();
        assert_eq!(user, alice());
        assert!(repo.find_by_slug("nobody").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance in DATABASE_URL"]
    async fn test_unique_index_is_reported_as_duplicate(pool: Pool<Postgres>) {
        let repo = PgUserRepository::new(pool);
        repo.insert(&alice()).await.unwrap();

        let err = repo.insert(&alice()).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref value } if value == "alice123"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[sqlx::test]
    #[ignore = "requires a PostgreSQL instance in DATABASE_URL"]
    async fn test_delete(pool: Pool<Postgres>) {
        let repo = PgUserRepository::new(pool);
        repo.insert(&alice()).await.unwrap();

        assert!(repo.delete("alice123").await.unwrap());
        assert!(!repo.delete("alice123").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
