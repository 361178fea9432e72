//! Membership resolution: pure reads over the store, no mutation. The
//! service layer turns a negative answer into the authorization error for
//! the operation at hand.

use crate::core::errors::TallyError;
use crate::core::models::{Group, Pending};
use crate::infrastructure::storage::Storage;
use uuid::Uuid;

/// Whether the user currently holds a member record in the group.
pub async fn is_member<S: Storage>(
    storage: &S,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<bool, TallyError> {
    storage.is_member(group_id, user_id).await
}

/// Whether the user administers the group: either their member record
/// carries the admin flag or they are the group's owning admin.
pub async fn is_admin<S: Storage>(
    storage: &S,
    group_id: Uuid,
    user_id: Uuid,
) -> Result<bool, TallyError> {
    if let Some(member) = storage.get_member(group_id, user_id).await? {
        if member.is_admin {
            return Ok(true);
        }
    }
    match storage.get_group(group_id).await? {
        Some(group) => Ok(group.admin_id == user_id),
        None => Ok(false),
    }
}

/// Pending-to-group traversal for authorization on transaction paths. A
/// missing pending and a missing (or soft-deleted) group stay distinct
/// errors.
pub async fn group_for_pending<S: Storage>(
    storage: &S,
    pending_id: Uuid,
) -> Result<(Pending, Group), TallyError> {
    let pending = storage
        .get_pending(pending_id)
        .await?
        .ok_or_else(|| TallyError::PendingNotFound(pending_id.to_string()))?;
    let group = storage
        .get_group(pending.group_id)
        .await?
        .ok_or_else(|| TallyError::GroupNotFound(pending.group_id.to_string()))?;
    Ok((pending, group))
}

/// The owning admin can never be removed from their own group, whatever the
/// caller's standing.
pub fn is_owning_admin(group: &Group, user_id: Uuid) -> bool {
    group.admin_id == user_id
}
