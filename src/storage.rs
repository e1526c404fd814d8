use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;

const STORAGE_FILE_NAME: &str = "storage.json";
const APP_NAME: &str = "whoson";

/// Storage key holding the serialized profile list.
pub const PROFILES_KEY: &str = "mediaOS_profiles";
/// Storage key holding the id of the most recently activated profile.
pub const ACTIVE_PROFILE_KEY: &str = "mediaOS_activeProfile";

/// A synchronous, file-backed string key-value store.
///
/// One JSON object file maps keys to string values. Every `set`/`remove`
/// rewrites the file before returning, so a completed mutation is durable
/// across sessions. A missing file is an empty store.
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    /// Open the store in the platform data directory.
    pub fn open() -> Result<Self> {
        let base = BaseDirs::new().context("unable to determine data directories")?;
        Self::open_in(&base.data_dir().join(APP_NAME))
    }

    /// Open the store rooted at an explicit data directory.
    pub fn open_in(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
        let path = data_dir.join(STORAGE_FILE_NAME);

        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid storage file", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.entries.insert(key.to_string(), value.into());
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open_in(dir.path()).unwrap();
        assert_eq!(store.get(PROFILES_KEY), None);
        // Opening alone does not create the storage file
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::open_in(dir.path()).unwrap();
        store.set(ACTIVE_PROFILE_KEY, "guest").unwrap();

        let reopened = LocalStore::open_in(dir.path()).unwrap();
        assert_eq!(reopened.get(ACTIVE_PROFILE_KEY), Some("guest"));
    }

    #[test]
    fn test_remove_deletes_key() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::open_in(dir.path()).unwrap();
        store.set(ACTIVE_PROFILE_KEY, "kids").unwrap();
        store.remove(ACTIVE_PROFILE_KEY).unwrap();

        let reopened = LocalStore::open_in(dir.path()).unwrap();
        assert_eq!(reopened.get(ACTIVE_PROFILE_KEY), None);
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORAGE_FILE_NAME), "not json at all").unwrap();
        assert!(LocalStore::open_in(dir.path()).is_err());
    }
}
