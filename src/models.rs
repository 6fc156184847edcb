use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User
///
/// The canonical identity record stored in the `users` table. This is the
/// principal resolved during authentication: guard policies read `role` for
/// RBAC decisions and handlers read the profile fields.
///
/// The password hash column is deliberately absent - it is never selected by
/// the store and never serialized into a response or a log line.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    /// Primary key; matches the `sub` claim of an issued token.
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    // The RBAC field: 'user' or 'admin'.
    pub role: String,
    pub is_active: bool,
}
