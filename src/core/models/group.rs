use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A shared expense pool.
///
/// `base_money` is the materialized signed sum of the group's pendings and is
/// only ever moved through `Storage::adjust_group_balance` (or rewritten by a
/// reconcile pass); nothing else may write it.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Group {
    #[schema(value_type = String)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub avatar_img: Option<String>,
    /// The creating user. Keeps group-admin rights for the lifetime of the
    /// group and cannot be removed or leave while the group exists.
    #[schema(value_type = String)]
    pub admin_id: Uuid,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub base_money: Decimal,
    /// Unique, URL-safe identifier derived from `name` at creation.
    /// Stable across renames.
    pub slug: String,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
