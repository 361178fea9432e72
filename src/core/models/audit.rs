use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Structured record of one service operation, kept by the
/// `LoggingService` sink and readable by operators via the log endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AppLog {
    #[schema(value_type = String)]
    pub id: Uuid,
    /// One of the operation names in `crate::constants`.
    pub action: String,
    /// Acting user; registration records the created user itself.
    #[schema(value_type = Option<String>)]
    pub user_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub timestamp: DateTime<Utc>,
}
