//! Key-value persistence gateway.
//!
//! The engine never touches storage directly; it goes through
//! `PlayLibrary`, which is generic over this trait. Hosts plug in whatever
//! durable storage they have (browser localStorage behind the wasm wrapper,
//! a directory on disk, a database).

use std::collections::BTreeMap;

use crate::error::StoreResult;

/// String-keyed storage of serialized JSON records.
pub trait KeyValueStore {
    /// Gets the record under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes the record under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> StoreResult<()>;

    /// Every key starting with `prefix`, sorted.
    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Volatile store. Used by tests and by hosts that mirror storage themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

// =============================================================================
// DIRECTORY STORE
// =============================================================================

#[cfg(not(target_arch = "wasm32"))]
pub use dir::DirStore;

#[cfg(not(target_arch = "wasm32"))]
mod dir {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::KeyValueStore;
    use crate::error::{StoreError, StoreResult};

    const EXTENSION: &str = "json";

    /// One `<key>.json` file per record under a root directory. Key segments
    /// separated by `/` become subdirectories.
    #[derive(Debug, Clone)]
    pub struct DirStore {
        root: PathBuf,
    }

    impl DirStore {
        /// Opens (creating if needed) a store rooted at `root`.
        pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
            let root = root.into();
            fs::create_dir_all(&root)?;
            Ok(Self { root })
        }

        pub fn root(&self) -> &Path {
            &self.root
        }

        fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
            let valid_segment = |s: &str| {
                !s.is_empty()
                    && s != "."
                    && s != ".."
                    && s
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            };
            if !key.split('/').all(valid_segment) {
                return Err(StoreError::invalid_key(key));
            }
            Ok(self.root.join(format!("{key}.{EXTENSION}")))
        }

        fn collect_keys(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> StoreResult<()> {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    self.collect_keys(&path, prefix, out)?;
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    continue;
                }
                let stem = path.with_extension("");
                let Ok(rel) = stem.strip_prefix(&self.root).map(Path::to_path_buf) else {
                    continue;
                };
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if key.starts_with(prefix) {
                    out.push(key);
                }
            }
            Ok(())
        }
    }

    impl KeyValueStore for DirStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            let path = self.path_for(key)?;
            match fs::read_to_string(&path) {
                Ok(raw) => Ok(Some(raw)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
            let path = self.path_for(key)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Write-then-rename so a crash never leaves a truncated record.
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, value)?;
            fs::rename(&tmp, &path)?;
            log::trace!("wrote {}", path.display());
            Ok(())
        }

        fn remove(&mut self, key: &str) -> StoreResult<()> {
            let path = self.path_for(key)?;
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }

        fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
            let mut keys = Vec::new();
            self.collect_keys(&self.root, prefix, &mut keys)?;
            keys.sort();
            Ok(keys)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &mut dyn KeyValueStore) {
        assert_eq!(store.get("a/one").unwrap(), None);

        store.set("a/one", "1").unwrap();
        store.set("a/two", "2").unwrap();
        store.set("b/three", "3").unwrap();
        assert_eq!(store.get("a/one").unwrap().as_deref(), Some("1"));

        store.set("a/one", "uno").unwrap();
        assert_eq!(store.get("a/one").unwrap().as_deref(), Some("uno"));

        assert_eq!(
            store.keys_with_prefix("a/").unwrap(),
            vec!["a/one".to_string(), "a/two".to_string()]
        );

        store.remove("a/one").unwrap();
        store.remove("a/one").unwrap();
        assert_eq!(store.get("a/one").unwrap(), None);
        assert_eq!(store.keys_with_prefix("a/").unwrap(), vec!["a/two".to_string()]);
    }

    #[test]
    fn test_memory_store_contract() {
        let mut store = MemoryStore::new();
        exercise(&mut store);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_dir_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        exercise(&mut store);
        assert!(dir.path().join("b/three.json").exists());
    }

    #[test]
    fn test_dir_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(dir.path()).unwrap();
        assert!(store.set("../evil", "x").is_err());
        assert!(store.set("a//b", "x").is_err());
        assert!(store.get("/abs").is_err());
    }
}
