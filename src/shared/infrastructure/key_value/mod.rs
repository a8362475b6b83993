// On-device key-value storage port.
//
// Purpose
// - Give local persistence a place to keep serialized state under a single key.
//
// Boundaries
// - Synchronous by contract. Failures are serialization, quota or device i/o problems only.

pub mod file;
pub mod in_memory;

use crate::modules::work_logs::core::errors::PersistenceError;

pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: String) -> Result<(), PersistenceError>;
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}
