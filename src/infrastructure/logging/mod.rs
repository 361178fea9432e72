pub mod in_memory;

use crate::core::errors::TallyError;
use crate::core::models::AppLog;
use async_trait::async_trait;
use uuid::Uuid;

/// Audit sink for domain actions. Entries are append-only; `get_logs`
/// returns them in insertion order.
#[async_trait]
pub trait LoggingService: Send + Sync {
    async fn log_action(
        &self,
        action: &str,
        details: serde_json::Value,
        user_id: Option<Uuid>,
    ) -> Result<(), TallyError>;
    async fn get_logs(&self) -> Result<Vec<AppLog>, TallyError>;
}
