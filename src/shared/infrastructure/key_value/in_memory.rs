use crate::modules::work_logs::core::errors::PersistenceError;
use crate::shared::infrastructure::key_value::KeyValueStorage;
use std::collections::HashMap;
use std::sync::Mutex;

/// Key-value storage held in memory, with an optional byte quota like a browser origin has.
#[derive(Default)]
pub struct InMemoryKeyValueStorage {
    values: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl InMemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            values: Mutex::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn used_bytes_without(values: &HashMap<String, String>, key: &str) -> usize {
        values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStorage for InMemoryKeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let guard = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        let mut guard = self.values.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(quota) = self.quota_bytes {
            let used = Self::used_bytes_without(&guard, key);
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(PersistenceError::StorageFull { needed, available });
            }
        }
        guard.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let mut guard = self.values.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(key);
        Ok(())
    }
}
