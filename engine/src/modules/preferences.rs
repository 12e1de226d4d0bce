//! Preference storage behind `memory_tools`

use async_trait::async_trait;
use sdk::errors::EngineError;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key/value preference storage scoped per user
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Store a preference, replacing any previous value
    async fn save(&self, user_id: i64, key: &str, value: &str) -> Result<(), EngineError>;

    /// Load a preference, `None` when it was never saved
    async fn load(&self, user_id: i64, key: &str) -> Result<Option<String>, EngineError>;
}

/// Process-local preference store
#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    entries: RwLock<HashMap<(i64, String), String>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferences {
    async fn save(&self, user_id: i64, key: &str, value: &str) -> Result<(), EngineError> {
        self.entries
            .write()
            .await
            .insert((user_id, key.to_string()), value.to_string());
        Ok(())
    }

    async fn load(&self, user_id: i64, key: &str) -> Result<Option<String>, EngineError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&(user_id, key.to_string()))
            .cloned())
    }
}
