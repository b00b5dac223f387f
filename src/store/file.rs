use super::{KeyValueStore, StoreError};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A flat JSON object on disk. Every `set` rewrites the whole file; the store
/// holds a handful of keys at most.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`. A missing file is an
    /// empty store; a corrupt one is discarded with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        "[Store] Ignoring corrupt store {}: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    /// Default location under the platform data directory.
    pub fn default_path() -> PathBuf {
        dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("com.forest.guide")
            .join("visits.json")
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        // Memory only changes once the file does
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.write(&next)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_persist_across_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data").join("visits.json");

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get("tree_last_visit").unwrap(), None);
        store.set("tree_last_visit", "1700000000000").unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(
            reopened.get("tree_last_visit").unwrap().as_deref(),
            Some("1700000000000")
        );
    }

    #[test]
    fn corrupt_file_starts_empty_and_is_overwritten() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("visits.json");
        std::fs::write(&path, "][").unwrap();

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get("anything").unwrap(), None);
        store.set("k", "v").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let tmp = tempfile::TempDir::new().unwrap();
        // The store's parent is a regular file, so the directory can't be made
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let mut store = JsonFileStore::open(blocker.join("visits.json"));
        assert!(store.set("tree_last_visit", "1700000000000").is_err());
        assert_eq!(store.get("tree_last_visit").unwrap(), None);
    }
}
