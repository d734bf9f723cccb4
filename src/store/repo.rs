use anyhow::Result;
use serde_json::Value;

use crate::domain::message::MessageRef;

/// Key holding the result set of the most recent archive pass.
pub const ARCHIVED_EMAILS_KEY: &str = "archivedEmails";

pub trait KeyValueStore: Send + Sync {
    fn set(&self, key: &str, value: &Value) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<Value>>;
}

pub fn save_archived(store: &dyn KeyValueStore, items: &[MessageRef]) -> Result<()> {
    store.set(ARCHIVED_EMAILS_KEY, &serde_json::to_value(items)?)
}

pub fn load_archived(store: &dyn KeyValueStore) -> Result<Vec<MessageRef>> {
    match store.get(ARCHIVED_EMAILS_KEY)? {
        Some(v) => Ok(serde_json::from_value(v)?),
        None => Ok(vec![]),
    }
}
