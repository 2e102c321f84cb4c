//! Persisted key/value state owned by the background.
//!
//! Content scripts and UI surfaces never write here; they go through
//! messages.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Mirror of the backend focus state.
pub const FOCUS_STATE_KEY: &str = "focusState";
/// Safe mode flag.
pub const SAFE_MODE_KEY: &str = "safeMode";
/// Domain → seconds of activity.
pub const SITE_TIME_KEY: &str = "siteTime";

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Read and decode `key`. Undecodable values are reported as errors.
pub async fn load<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>> {
    match storage.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub async fn save<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) -> Result<()> {
    storage.set(key, serde_json::to_value(value)?).await
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

// =============================================================================
// JSON file
// =============================================================================

/// Whole-file JSON object store. Every write rewrites the file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    values: Mutex<Option<HashMap<String, Value>>>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), values: Mutex::new(None) }
    }

    async fn read_file(&self) -> Result<HashMap<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Storage(format!("Failed to parse '{}': {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut guard = self.values.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_file().await?);
        }
        Ok(guard.as_ref().and_then(|values| values.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut guard = self.values.lock().await;
        let mut values = match guard.take() {
            Some(values) => values,
            None => self.read_file().await?,
        };
        let previous = values.insert(key.to_string(), value);

        let result = match serde_json::to_vec_pretty(&values) {
            Ok(bytes) => tokio::fs::write(&self.path, bytes).await.map_err(Error::from),
            Err(e) => Err(e.into()),
        };
        if result.is_err() {
            // Keep memory in step with what is on disk.
            match previous {
                Some(previous) => values.insert(key.to_string(), previous),
                None => values.remove(key),
            };
        }
        *guard = Some(values);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(load::<bool>(&storage, SAFE_MODE_KEY).await.unwrap(), None);
        save(&storage, SAFE_MODE_KEY, &true).await.unwrap();
        assert_eq!(load::<bool>(&storage, SAFE_MODE_KEY).await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_json_file_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let storage = JsonFileStorage::new(&path);
        save(&storage, SAFE_MODE_KEY, &true).await.unwrap();
        save(&storage, SITE_TIME_KEY, &serde_json::json!({"a.test": 4.0})).await.unwrap();

        let reopened = JsonFileStorage::new(&path);
        assert_eq!(load::<bool>(&reopened, SAFE_MODE_KEY).await.unwrap(), Some(true));
        assert!(reopened.get(SITE_TIME_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let storage = JsonFileStorage::new(&path);
        save(&storage, SAFE_MODE_KEY, &true).await.unwrap();

        // Turn the target into a directory so the next write fails.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(save(&storage, SAFE_MODE_KEY, &false).await.is_err());
        assert_eq!(load::<bool>(&storage, SAFE_MODE_KEY).await.unwrap(), Some(true));
        assert!(save(&storage, SITE_TIME_KEY, &serde_json::json!({})).await.is_err());
        assert_eq!(storage.get(SITE_TIME_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_error() {
        let storage = MemoryStorage::new();
        storage.set(SAFE_MODE_KEY, serde_json::json!("yes")).await.unwrap();
        assert!(load::<bool>(&storage, SAFE_MODE_KEY).await.is_err());
    }
}
