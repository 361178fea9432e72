use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A single signed monetary transaction recorded against a group.
/// Negative `money` is a withdrawal. `group_id` is immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Pending {
    #[schema(value_type = String)]
    pub id: Uuid,
    #[schema(value_type = String)]
    pub group_id: Uuid,
    pub content: Option<String>,
    pub bank: String,
    /// Effective date of the transaction; drives the month/year listing
    /// filter, independent of `created_at`.
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub date: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub money: Decimal,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub updated_at: DateTime<Utc>,
}
