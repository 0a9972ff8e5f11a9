// SPDX-License-Identifier: MIT

//! Photo blob store and the entity-id -> local-path preference map.
//!
//! Blobs live under one directory, addressed by the fixed pattern
//! `{entity_id}_photo.jpg`. The preference map remembers which
//! entities have a locally cached photo and is persisted as JSON next
//! to the blobs. Transfer mechanics beyond that are the client's
//! concern.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Errors from the photo store.
#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("Failed to access photo directory: {0}")]
    Io(String),

    #[error("Corrupt photo preferences: {0}")]
    Prefs(String),
}

const PREFS_FILE: &str = "photo_prefs.json";

/// Filesystem-backed photo store.
pub struct PhotoStore {
    root: PathBuf,
    prefs: Mutex<HashMap<String, String>>,
}

impl PhotoStore {
    /// Open the store rooted at `root`, creating the directory and
    /// loading any persisted preference map.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, PhotoError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| PhotoError::Io(e.to_string()))?;

        let prefs_path = root.join(PREFS_FILE);
        let prefs = if prefs_path.exists() {
            let raw = fs::read_to_string(&prefs_path).map_err(|e| PhotoError::Io(e.to_string()))?;
            serde_json::from_str(&raw).map_err(|e| PhotoError::Prefs(e.to_string()))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            root,
            prefs: Mutex::new(prefs),
        })
    }

    /// The blob path for an entity: `{root}/{entity_id}_photo.jpg`.
    pub fn blob_path(&self, entity_id: &str) -> PathBuf {
        self.root.join(format!("{entity_id}_photo.jpg"))
    }

    /// Store photo bytes for an entity and record the local path.
    pub fn import(&self, entity_id: &str, bytes: &[u8]) -> Result<PathBuf, PhotoError> {
        let path = self.blob_path(entity_id);
        fs::write(&path, bytes).map_err(|e| PhotoError::Io(e.to_string()))?;
        self.record(entity_id, path.to_string_lossy().as_ref())?;
        Ok(path)
    }

    /// The recorded local path for an entity's cached photo, if any.
    pub fn cached_path(&self, entity_id: &str) -> Option<String> {
        self.prefs
            .lock()
            .expect("photo prefs mutex poisoned")
            .get(entity_id)
            .cloned()
    }

    fn record(&self, entity_id: &str, path: &str) -> Result<(), PhotoError> {
        let mut prefs = self.prefs.lock().expect("photo prefs mutex poisoned");
        prefs.insert(entity_id.to_string(), path.to_string());

        let serialized =
            serde_json::to_string_pretty(&*prefs).map_err(|e| PhotoError::Prefs(e.to_string()))?;
        fs::write(self.root.join(PREFS_FILE), serialized)
            .map_err(|e| PhotoError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_path_follows_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::open(dir.path()).unwrap();

        let path = store.blob_path("ph-1");
        assert!(path.ends_with("ph-1_photo.jpg"));
    }

    #[test]
    fn test_import_records_and_persists_pref() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = PhotoStore::open(dir.path()).unwrap();
            store.import("ph-1", b"jpegbytes").unwrap();
            assert!(store.cached_path("ph-1").is_some());
            assert!(store.cached_path("ph-2").is_none());
        }

        // Reopen: the preference map survives restarts.
        let store = PhotoStore::open(dir.path()).unwrap();
        let cached = store.cached_path("ph-1").unwrap();
        assert!(cached.ends_with("ph-1_photo.jpg"));
        assert_eq!(fs::read(cached).unwrap(), b"jpegbytes");
    }
}
