use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Outstanding join request from a group member to a prospective member.
/// Issuing a new invite for the same (user, group) pair replaces the old one,
/// so at most one is ever outstanding.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Invite {
    #[schema(value_type = String)]
    pub id: Uuid,
    /// The invitee.
    #[schema(value_type = String)]
    pub user_id: Uuid,
    #[schema(value_type = String)]
    pub group_id: Uuid,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub updated_at: DateTime<Utc>,
}
