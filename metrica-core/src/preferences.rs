//! Key/value contract for dashboard layout and column preferences.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use metrica_types::MetricaError;

/// Stores opaque preference documents keyed by a logical table identifier.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Replace the document stored for `table_id`.
    async fn save(&self, table_id: &str, prefs: Value) -> Result<(), MetricaError>;

    /// Load the document stored for `table_id`, if any.
    async fn load(&self, table_id: &str) -> Result<Option<Value>, MetricaError>;
}

/// In-process preference store.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    docs: Mutex<HashMap<String, Value>>,
}

impl MemoryPreferenceStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_table_id(table_id: &str) -> Result<(), MetricaError> {
    if table_id.trim().is_empty() {
        return Err(MetricaError::InvalidArg("table id is empty".into()));
    }
    Ok(())
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn save(&self, table_id: &str, prefs: Value) -> Result<(), MetricaError> {
        check_table_id(table_id)?;
        self.docs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table_id.to_string(), prefs);
        Ok(())
    }

    async fn load(&self, table_id: &str) -> Result<Option<Value>, MetricaError> {
        check_table_id(table_id)?;
        Ok(self
            .docs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table_id)
            .cloned())
    }
}
