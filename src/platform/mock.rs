//! Mock platform collaborator for testing without network calls.

use super::{CommercePlatform, PlatformError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock collaborator that serves predefined tags per customer id.
#[derive(Debug, Default)]
pub struct MockCommercePlatform {
    tags: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<bool>,
}

impl MockCommercePlatform {
    /// Create a new mock with no tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register tags for a customer id.
    pub fn with_tags(self, external_customer_id: &str, tags: Vec<String>) -> Self {
        self.tags
            .lock()
            .expect("mock lock poisoned")
            .insert(external_customer_id.to_string(), tags);
        self
    }

    /// Make every lookup fail, to exercise the best-effort path.
    pub fn failing(self) -> Self {
        *self.failing.lock().expect("mock lock poisoned") = true;
        self
    }
}

#[async_trait]
impl CommercePlatform for MockCommercePlatform {
    async fn fetch_customer_tags(
        &self,
        external_customer_id: &str,
    ) -> Result<Vec<String>, PlatformError> {
        if *self.failing.lock().expect("mock lock poisoned") {
            return Err(PlatformError::NetworkError("mock failure".to_string()));
        }

        Ok(self
            .tags
            .lock()
            .expect("mock lock poisoned")
            .get(external_customer_id)
            .cloned()
            .unwrap_or_default())
    }
}
