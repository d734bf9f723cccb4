use anyhow::{Result, anyhow};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::store::repo::KeyValueStore;

/// Process-local store, used by `run-once --ephemeral` and tests.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, Value>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in the order they were written, one entry per `set`.
    pub fn write_log(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl KeyValueStore for MemoryStore {
    fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.items
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?
            .insert(key.to_string(), value.clone());
        self.writes
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?
            .push(key.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .items
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))?
            .get(key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_store_starts_empty_and_logs_every_set() {
        let store = MemoryStore::new();
        assert_eq!(store.get("archivedEmails").unwrap(), None);

        store.set("archivedEmails", &json!([{ "id": "a" }])).unwrap();
        store.set("archivedEmails", &json!([])).unwrap();

        assert_eq!(store.get("archivedEmails").unwrap(), Some(json!([])));
        assert_eq!(store.write_log(), vec!["archivedEmails", "archivedEmails"]);
    }
}
