use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Registered account. `password_hash` is opaque to everything outside the
/// store boundary and never leaves the process; API responses go through
/// `api::models::UserView`.
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub fullname: String,
    /// Global operator flag. Gates the operational-log surface, not group
    /// administration (that lives on `Member::is_admin`).
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Users are soft-deleted so historical member rows keep resolving.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
