use axum::{Json, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::core::errors::TallyError;
use crate::core::models::{Group, Invite, Member, User};

// Request structs for JSON payloads
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub fullname: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SetAdminRequest {
    pub username: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: Option<String>,
    pub avatar_img: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_img: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AddMembersRequest {
    pub usernames: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct InviteRequest {
    pub username: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReplyInviteRequest {
    #[schema(value_type = String)]
    pub invite_id: Uuid,
    pub accept: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePendingRequest {
    #[schema(value_type = String)]
    pub group_id: Uuid,
    pub content: Option<String>,
    pub bank: String,
    /// RFC 3339 or `YYYY-MM-DD`.
    pub date: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub money: Decimal,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePendingRequest {
    pub content: Option<String>,
    pub bank: Option<String>,
    /// RFC 3339 or `YYYY-MM-DD`.
    pub date: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub money: Option<Decimal>,
}

#[derive(Deserialize, IntoParams)]
pub struct ListPendingsQuery {
    #[param(value_type = String)]
    pub group_id: Uuid,
    /// Calendar month, 1-12.
    pub month: u32,
    pub year: i32,
}

// Response views. User records never serialize directly; these carry the
// display fields only.
#[derive(Serialize, ToSchema)]
pub struct UserView {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub fullname: String,
    pub is_admin: bool,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            id: user.id,
            username: user.username,
            email: user.email,
            fullname: user.fullname,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct GroupMemberView {
    #[schema(value_type = String)]
    pub user_id: Uuid,
    pub username: String,
    pub fullname: String,
    pub email: String,
    /// Group-admin flag of the member record.
    pub is_admin: bool,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub joined_at: DateTime<Utc>,
}

impl From<(Member, User)> for GroupMemberView {
    fn from((member, user): (Member, User)) -> Self {
        GroupMemberView {
            user_id: user.id,
            username: user.username,
            fullname: user.fullname,
            email: user.email,
            is_admin: member.is_admin,
            joined_at: member.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct InviteView {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub group_id: Uuid,
    pub group_name: String,
    pub group_slug: String,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
}

impl From<(Invite, Group)> for InviteView {
    fn from((invite, group): (Invite, Group)) -> Self {
        InviteView {
            id: invite.id,
            group_id: group.id,
            group_name: group.name,
            group_slug: group.slug,
            created_at: invite.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ReplyInviteResponse {
    /// True when the reply accepted the invite and created a membership.
    pub joined: bool,
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// Newtype wrapper for TallyError to implement IntoResponse
pub struct ApiError(pub TallyError);

impl From<TallyError> for ApiError {
    fn from(err: TallyError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message) = match self.0 {
            err @ (TallyError::MissingField(_)
            | TallyError::InvalidDate(_)
            | TallyError::InvalidMoney
            | TallyError::InvalidPeriod { .. }
            | TallyError::NoFieldsToUpdate
            | TallyError::InvalidInput(..)) => (StatusCode::BAD_REQUEST, err.to_string()),

            err @ (TallyError::Unauthorized | TallyError::InvalidCredentials) => {
                (StatusCode::UNAUTHORIZED, err.to_string())
            }

            err @ (TallyError::NotGroupMember(_)
            | TallyError::NotGroupAdmin(_)
            | TallyError::NotOperator(_)
            | TallyError::OwningAdminProtected
            | TallyError::OwningAdminCannotLeave
            | TallyError::InviteNotForUser(_)) => (StatusCode::FORBIDDEN, err.to_string()),

            err @ (TallyError::UserNotFound(_)
            | TallyError::GroupNotFound(_)
            | TallyError::PendingNotFound(_)
            | TallyError::MemberNotFound(_)
            | TallyError::InviteNotFound(_)) => (StatusCode::NOT_FOUND, err.to_string()),

            err @ (TallyError::AlreadyGroupMember(_)
            | TallyError::UsernameTaken(_)
            | TallyError::EmailTaken(_)) => (StatusCode::CONFLICT, err.to_string()),

            // Internal detail is logged, never returned.
            err @ (TallyError::StorageError(_)
            | TallyError::LedgerInconsistency(_)
            | TallyError::LoggingError(_)
            | TallyError::InternalError(_)) => {
                error!(%err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}
