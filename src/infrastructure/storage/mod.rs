use crate::core::errors::TallyError;
use crate::core::models::{Group, Invite, Member, Pending, User};
use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Store-level capabilities, declared per entity kind rather than applied
/// store-wide. The store consults these on insert and delete.
pub struct EntityPolicy {
    /// Delete hides the record behind `deleted_at` instead of removing it.
    pub soft_delete: bool,
    /// Field a unique, URL-safe slug is derived from at insert time.
    pub slug_source: Option<&'static str>,
}

pub const USER_POLICY: EntityPolicy = EntityPolicy {
    soft_delete: true,
    slug_source: None,
};
pub const GROUP_POLICY: EntityPolicy = EntityPolicy {
    soft_delete: true,
    slug_source: Some("name"),
};
pub const MEMBER_POLICY: EntityPolicy = EntityPolicy {
    soft_delete: false,
    slug_source: None,
};
pub const INVITE_POLICY: EntityPolicy = EntityPolicy {
    soft_delete: false,
    slug_source: None,
};
pub const PENDING_POLICY: EntityPolicy = EntityPolicy {
    soft_delete: false,
    slug_source: None,
};

/// Turns free text into the slug alphabet: lowercase ASCII alphanumerics
/// separated by single dashes. Collisions are resolved by the store with a
/// numeric suffix.
pub fn slugify(source: &str) -> String {
    let mut slug = String::with_capacity(source.len());
    let mut pending_dash = false;
    for c in source.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("group");
    }
    slug
}

/// Persistence contract for the ledger core.
///
/// Reads hide soft-deleted rows, except the historical joins that are
/// documented to include them. `adjust_group_balance` is the one write path
/// for `Group.base_money` during normal operation and must be atomic per
/// group id: a SQL store would issue a single
/// `UPDATE .. SET base_money = base_money + $delta`, a document store a
/// `$inc`. Read-then-write implementations lose concurrent deltas and are
/// not conforming.
#[async_trait]
pub trait Storage: Send + Sync {
    // users

    /// Persists a new user, hashing `password` at this boundary. Fails with
    /// `UsernameTaken`/`EmailTaken` on conflict with any record, including
    /// soft-deleted ones.
    async fn create_user(&self, user: User, password: &str) -> Result<User, TallyError>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, TallyError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, TallyError>;
    /// Grants or revokes the global operator flag.
    async fn set_user_admin(&self, user_id: Uuid, is_admin: bool) -> Result<User, TallyError>;
    /// Soft delete per `USER_POLICY`; the row keeps serving historical joins.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), TallyError>;

    // groups

    /// Persists a new group, deriving a unique slug per `GROUP_POLICY`.
    /// Returns the stored record (slug filled in).
    async fn create_group(&self, group: Group) -> Result<Group, TallyError>;
    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, TallyError>;
    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>, TallyError>;
    /// Rewrites name/description/avatar. The slug and `base_money` are left
    /// as stored; `updated_at` is bumped.
    async fn update_group_metadata(&self, group: Group) -> Result<Group, TallyError>;
    /// Soft delete per `GROUP_POLICY`. Members and pendings stay linked but
    /// the group disappears from every read path.
    async fn delete_group(&self, group_id: Uuid) -> Result<(), TallyError>;
    /// Groups the user belongs to (Member join), newest first.
    async fn get_user_groups(&self, user_id: Uuid) -> Result<Vec<Group>, TallyError>;
    /// Atomically applies a signed delta to the group's aggregate and
    /// returns the new value.
    async fn adjust_group_balance(
        &self,
        group_id: Uuid,
        delta: Decimal,
    ) -> Result<Decimal, TallyError>;
    /// Rewrites the aggregate outright. Reserved for reconcile passes.
    async fn set_group_balance(&self, group_id: Uuid, value: Decimal) -> Result<(), TallyError>;

    // members

    /// Inserts a member row, enforcing at most one per (user, group) pair.
    async fn add_member(&self, member: Member) -> Result<Member, TallyError>;
    async fn get_member(&self, group_id: Uuid, user_id: Uuid)
    -> Result<Option<Member>, TallyError>;
    async fn is_member(&self, group_id: Uuid, user_id: Uuid) -> Result<bool, TallyError>;
    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<(), TallyError>;
    /// Member rows joined with their user records. Soft-deleted users are
    /// included: the join is historical.
    async fn get_group_members(&self, group_id: Uuid)
    -> Result<Vec<(Member, User)>, TallyError>;

    // invites

    /// Purges any invite for the same (user, group) pair, then inserts the
    /// new one, atomically. Keeps at most one outstanding invite per pair.
    async fn upsert_invite(&self, invite: Invite) -> Result<Invite, TallyError>;
    async fn get_invite(&self, invite_id: Uuid) -> Result<Option<Invite>, TallyError>;
    async fn delete_invite(&self, invite_id: Uuid) -> Result<(), TallyError>;
    /// The caller's invites joined with a summary of the inviting group;
    /// invites whose group has been deleted are skipped.
    async fn get_user_invites(&self, user_id: Uuid)
    -> Result<Vec<(Invite, Group)>, TallyError>;

    // pendings

    async fn create_pending(&self, pending: Pending) -> Result<Pending, TallyError>;
    async fn get_pending(&self, pending_id: Uuid) -> Result<Option<Pending>, TallyError>;
    /// Replaces the stored record and returns it **as it was before** the
    /// update, so callers can derive the exact balance delta they owe the
    /// aggregate. Fails with `PendingNotFound` when absent.
    async fn update_pending(&self, pending: Pending) -> Result<Pending, TallyError>;
    /// Removes the record and returns it, for the same reason.
    async fn delete_pending(&self, pending_id: Uuid) -> Result<Pending, TallyError>;
    /// All pendings of a group, unordered.
    async fn get_group_pendings(&self, group_id: Uuid) -> Result<Vec<Pending>, TallyError>;
    /// Pendings of a group whose `date` falls in the given calendar month,
    /// ordered by date ascending.
    async fn get_pendings_by_month(
        &self,
        group_id: Uuid,
        month: u32,
        year: i32,
    ) -> Result<Vec<Pending>, TallyError>;
}

pub mod in_memory;
