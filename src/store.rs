use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;

use crate::models::User;

/// StoreError
///
/// Failure to reach the user store. Lookups that complete but find nothing are
/// *not* errors - they return `Ok(None)`. This distinction matters to the
/// identity context: an absent user is cached, an unreachable store is not.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// UserStore Trait
///
/// The abstract contract for principal lookup and the small amount of user
/// listing the admin surface needs. Handlers and middleware depend on this
/// trait rather than a concrete database, so tests substitute in-memory mocks.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn UserStore>`) safely shareable across Axum's async task boundaries.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a single user by id. The backbone of principal resolution:
    /// called at most once per request by the identity context.
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Admin-only listing of all user accounts.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

/// UserStoreState
///
/// The concrete type used to share the persistence layer across the application state.
pub type UserStoreState = Arc<dyn UserStore>;

/// PostgresUserStore
///
/// The concrete implementation of `UserStore` backed by PostgreSQL. Each call
/// checks a connection out of the pool for the duration of the query and
/// returns it on every exit path, including errors - nothing is held across
/// the request lifetime.
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Creates a new store instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// The password hash column is intentionally excluded from every SELECT.
const USER_COLUMNS: &str = "id, email, username, first_name, last_name, role, is_active";

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY id",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
