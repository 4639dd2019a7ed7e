use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Key-value persistence port. Values are whole blobs; there are no
/// partial writes.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under `data_dir`, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct FileStore {
    pub data_dir: PathBuf,
}

impl FileStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        info!(data_dir = %data_dir.display(), "opened file store");
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.data_dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileStore {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(file = %path.display(), "no stored value");
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(raw))
    }

    #[tracing::instrument(skip(self, value), fields(bytes = value.len()))]
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), "writing value atomically");

        let mut temp = NamedTempFile::new_in(&self.data_dir)
            .with_context(|| format!("failed creating temp file in {}", self.data_dir.display()))?;
        temp.write_all(value.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed removing {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(feature = "web")]
pub use web::LocalStorage;

#[cfg(feature = "web")]
mod web {
    use anyhow::anyhow;

    use super::KeyValueStore;

    /// Browser `window.localStorage`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LocalStorage;

    fn storage() -> anyhow::Result<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| anyhow!("no browser window"))?
            .local_storage()
            .map_err(|err| anyhow!("local storage unavailable: {err:?}"))?
            .ok_or_else(|| anyhow!("local storage disabled"))
    }

    impl KeyValueStore for LocalStorage {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            storage()?
                .get_item(key)
                .map_err(|err| anyhow!("failed reading {key}: {err:?}"))
        }

        fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
            storage()?
                .set_item(key, value)
                .map_err(|err| anyhow!("failed writing {key}: {err:?}"))
        }

        fn remove(&mut self, key: &str) -> anyhow::Result<()> {
            storage()?
                .remove_item(key)
                .map_err(|err| anyhow!("failed removing {key}: {err:?}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::{FileStore, KeyValueStore, MemoryStore};

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn file_store_replaces_and_removes() {
        let temp = tempdir().expect("tempdir");
        let mut store = FileStore::open(&temp.path().join("nested")).expect("open");

        assert_eq!(store.get("taskManager_tasks").unwrap(), None);
        store.set("taskManager_tasks", "[1]").unwrap();
        store.set("taskManager_tasks", "[2]").unwrap();
        assert_eq!(
            store.get("taskManager_tasks").unwrap().as_deref(),
            Some("[2]")
        );
        assert!(store.path_for("taskManager_tasks").exists());

        store.remove("taskManager_tasks").unwrap();
        assert!(!store.path_for("taskManager_tasks").exists());
        store.remove("taskManager_tasks").unwrap();
    }

    #[test]
    fn file_names_cannot_escape_data_dir() {
        let temp = tempdir().expect("tempdir");
        let store = FileStore::open(temp.path()).expect("open");
        let path = store.path_for("../etc/passwd");
        assert_eq!(path.parent(), Some(temp.path()));
    }
}
