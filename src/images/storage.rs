//! Blob storage backends for uploaded images.
//!
//! Keys are `/`-separated relative paths such as `avatars/jdoe.png`. A
//! backend maps each key to durable bytes and to a public URL.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use parking_lot::RwLock;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object is stored under the key.
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The key is empty, absolute, or escapes the storage root.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key/value blob store.
///
/// `save` overwrites whatever is stored under the key. `delete` of a key
/// that does not exist is not an error.
pub trait StorageBackend: Send + Sync {
    /// Check whether an object is stored under `key`.
    fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Read the object stored under `key`.
    fn open(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Store `data` under `key` and return the key it was stored under.
    fn save(&self, key: &str, data: &[u8]) -> StorageResult<String>;

    /// Remove the object stored under `key`.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Public URL for `key`. Does not check existence.
    fn url(&self, key: &str) -> String;
}

/// Reject keys that could address something outside the storage root.
fn validate_key(key: &str) -> StorageResult<()> {
    let path = Path::new(key);
    let clean = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if clean {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Join a URL prefix and a key with exactly one `/` between them.
fn join_url(prefix: &str, key: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), key.trim_start_matches('/'))
}

/// Filesystem storage rooted at a media directory.
///
/// Objects live at `{media_root}/{key}`; URLs are `{media_url}{key}`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    media_root: PathBuf,
    media_url: String,
}

impl LocalStorage {
    /// Create a new `LocalStorage`.
    ///
    /// # Arguments
    ///
    /// * `media_root` - Directory holding stored objects, created on first save
    /// * `media_url` - URL prefix objects are served under (e.g. `/media/`)
    pub fn new(media_root: impl Into<PathBuf>, media_url: impl Into<String>) -> Self {
        Self {
            media_root: media_root.into(),
            media_url: media_url.into(),
        }
    }

    /// Filesystem path of the object stored under `key`.
    pub fn path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.media_root.join(key))
    }
}

impl StorageBackend for LocalStorage {
    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.path(key)?.is_file())
    }

    fn open(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path(key)?;
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(key.to_string())
            } else {
                StorageError::Io(e)
            }
        })
    }

    fn save(&self, key: &str, data: &[u8]) -> StorageResult<String> {
        let path = self.path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, data)?;
        tracing::debug!(key, bytes = data.len(), "Saved object");
        Ok(key.to_string())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(key, "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn url(&self, key: &str) -> String {
        join_url(&self.media_url, key)
    }
}

/// In-process storage. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    base_url: String,
}

impl MemoryStorage {
    /// Create an empty store serving URLs under `/media/`.
    pub fn new() -> Self {
        Self::with_base_url("/media/")
    }

    /// Create an empty store serving URLs under `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            base_url: base_url.into(),
        }
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }
}

impl StorageBackend for MemoryStorage {
    fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self.objects.read().contains_key(key))
    }

    fn open(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn save(&self, key: &str, data: &[u8]) -> StorageResult<String> {
        validate_key(key)?;
        self.objects.write().insert(key.to_string(), data.to_vec());
        Ok(key.to_string())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.objects.write().remove(key);
        Ok(())
    }

    fn url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("avatars/jdoe.png").is_ok());
        assert!(validate_key("jdoe.png").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("avatars/../../secret").is_err());
        assert!(validate_key("./jdoe.png").is_err());
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("/media/", "avatars/a.png"), "/media/avatars/a.png");
        assert_eq!(join_url("/media", "avatars/a.png"), "/media/avatars/a.png");
        assert_eq!(
            join_url("https://cdn.example.com/m/", "a.png"),
            "https://cdn.example.com/m/a.png"
        );
    }

    #[test]
    fn test_local_storage_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/");

        assert!(!storage.exists("avatars/jdoe.png").unwrap());

        let key = storage.save("avatars/jdoe.png", b"pixels").unwrap();
        assert_eq!(key, "avatars/jdoe.png");
        assert!(dir.path().join("avatars/jdoe.png").is_file());
        assert!(storage.exists("avatars/jdoe.png").unwrap());
        assert_eq!(storage.open("avatars/jdoe.png").unwrap(), b"pixels");

        // Overwrite
        storage.save("avatars/jdoe.png", b"other").unwrap();
        assert_eq!(storage.open("avatars/jdoe.png").unwrap(), b"other");

        storage.delete("avatars/jdoe.png").unwrap();
        assert!(!storage.exists("avatars/jdoe.png").unwrap());
    }

    #[test]
    fn test_local_storage_missing_objects() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/");

        assert!(storage.delete("nope.png").is_ok());
        assert!(matches!(
            storage.open("nope.png"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_local_storage_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/");

        assert!(matches!(
            storage.save("../outside.png", b"x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_local_storage_url() {
        let storage = LocalStorage::new("/srv/media", "/media/");
        assert_eq!(storage.url("avatars/jdoe.png"), "/media/avatars/jdoe.png");
    }

    #[test]
    fn test_memory_storage_lifecycle() {
        let storage = MemoryStorage::new();

        storage.save("b.png", b"2").unwrap();
        storage.save("a.png", b"1").unwrap();
        assert_eq!(storage.keys(), vec!["a.png", "b.png"]);
        assert_eq!(storage.open("a.png").unwrap(), b"1");

        storage.delete("a.png").unwrap();
        storage.delete("a.png").unwrap();
        assert!(!storage.exists("a.png").unwrap());
        assert!(matches!(storage.open("a.png"), Err(StorageError::NotFound(_))));
        assert_eq!(storage.url("b.png"), "/media/b.png");
    }
}
