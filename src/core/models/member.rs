use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Join record linking a user to a group. At most one exists per
/// (user, group) pair; the store rejects duplicates.
#[derive(Clone, Debug)]
pub struct Member {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    /// Admin of this group. Set for the creator; members added by invite or
    /// batch-add start without it.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
