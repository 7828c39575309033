use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum DraftStoreError {
    #[error("draft key `{0}` contains unsupported characters")]
    InvalidKey(String),
    #[error("draft storage failed: {0}")]
    Io(#[from] io::Error),
    #[error("draft could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Local key-value storage for in-progress forms.
pub trait DraftStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, DraftStoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), DraftStoreError>;
    fn remove(&self, key: &str) -> Result<(), DraftStoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDraftStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryDraftStore {
    pub fn len(&self) -> usize {
        self.entries.lock().expect("draft mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DraftStore for InMemoryDraftStore {
    fn load(&self, key: &str) -> Result<Option<String>, DraftStoreError> {
        let guard = self.entries.lock().expect("draft mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), DraftStoreError> {
        let mut guard = self.entries.lock().expect("draft mutex poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        let mut guard = self.entries.lock().expect("draft mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per entry under a directory, created on first save.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    root: PathBuf,
}

impl FileDraftStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DraftStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DraftStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, key: &str) -> Result<Option<String>, DraftStoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), DraftStoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        fs::write(path, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fleet-roster-drafts-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn file_store_round_trips_and_removes() {
        let dir = scratch_dir("round-trip");
        let store = FileDraftStore::new(&dir);

        assert_eq!(store.load("registration_data").expect("load"), None);
        store
            .save("registration_data", r#"{"first_name":"Ana"}"#)
            .expect("save");
        assert_eq!(
            store.load("registration_data").expect("load").as_deref(),
            Some(r#"{"first_name":"Ana"}"#)
        );

        store.remove("registration_data").expect("remove");
        store.remove("registration_data").expect("second remove is a no-op");
        assert_eq!(store.load("registration_data").expect("load"), None);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let store = FileDraftStore::new(scratch_dir("keys"));
        assert!(matches!(
            store.save("../escape", "{}"),
            Err(DraftStoreError::InvalidKey(_))
        ));
    }
}
