mod group_tests;
mod ledger_tests;

use crate::core::models::{Group, User};
use crate::core::services::TallyService;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryStorage;

pub type TestService = TallyService<InMemoryLogging, InMemoryStorage>;

pub fn create_test_service() -> TestService {
    TallyService::new(
        InMemoryStorage::new(),
        InMemoryLogging::new(),
        "test-secret".to_string(),
    )
}

/// Like `create_test_service`, but hands back the shared storage and logging
/// handles so tests can inspect or perturb state behind the service.
pub fn create_test_parts() -> (TestService, InMemoryStorage, InMemoryLogging) {
    let storage = InMemoryStorage::new();
    let logging = InMemoryLogging::new();
    let service = TallyService::new(storage.clone(), logging.clone(), "test-secret".to_string());
    (service, storage, logging)
}

pub async fn register(service: &TestService, username: &str) -> User {
    service
        .register_user(
            username.to_string(),
            format!("{}@example.com", username),
            "hunter2".to_string(),
            format!("{} Example", username),
        )
        .await
        .unwrap()
}

pub async fn create_group(service: &TestService, owner: &User, name: &str) -> Group {
    service
        .create_group(name.to_string(), None, None, owner.id)
        .await
        .unwrap()
}
