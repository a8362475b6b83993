// File-backed key-value storage: one `<key>.json` file per key under a directory.
//
// Writes go to a temporary sibling first and are renamed into place, so a crash
// mid-write leaves the previous value readable.

use crate::modules::work_logs::core::errors::PersistenceError;
use crate::shared::infrastructure::key_value::KeyValueStorage;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

pub struct FileKeyValueStorage {
    dir: PathBuf,
}

impl FileKeyValueStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e, 0))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStorage for FileKeyValueStorage {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e, 0)),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        let needed = value.len();
        fs::write(&staging, value).map_err(|e| io_error(&staging, e, needed))?;
        fs::rename(&staging, &path).map_err(|e| io_error(&path, e, needed))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e, 0)),
        }
    }
}

fn io_error(path: &Path, e: io::Error, needed: usize) -> PersistenceError {
    if e.kind() == ErrorKind::StorageFull {
        return PersistenceError::StorageFull {
            needed,
            available: 0,
        };
    }
    PersistenceError::Io(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod file_key_value_storage_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_persist_values_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileKeyValueStorage::open(dir.path()).unwrap();
        storage.set("workLogs", r#"[{"a":1}]"#.into()).unwrap();

        let reopened = FileKeyValueStorage::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get("workLogs").unwrap(),
            Some(r#"[{"a":1}]"#.to_string())
        );
        assert!(dir.path().join("workLogs.json").exists());
    }

    #[rstest]
    fn it_should_treat_a_missing_key_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileKeyValueStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get("nothing").unwrap(), None);
        storage.remove("nothing").unwrap();
    }

    #[rstest]
    fn it_should_sanitize_keys_into_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileKeyValueStorage::open(dir.path()).unwrap();
        storage.set("../escape", "x".into()).unwrap();
        assert!(dir.path().join("___escape.json").exists());
    }
}
