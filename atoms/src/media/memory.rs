use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::service::ObjectStore;
use crate::error::CoreError;

const MEMORY_URL_PREFIX: &str = "memory://objects/";

/// Process-local object store used by tests and local runs.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url_for(key: &str) -> String {
        format!("{}{}", MEMORY_URL_PREFIX, key)
    }

    /// Content type recorded for `key`, if present.
    pub fn content_type(&self, key: &str) -> Option<String> {
        let objects = self.objects.lock().ok()?;
        objects.get(key).map(|(_, ct)| ct.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, location: &str) -> Result<Vec<u8>, CoreError> {
        let key = location.strip_prefix(MEMORY_URL_PREFIX).unwrap_or(location);
        let objects = self
            .objects
            .lock()
            .map_err(|_| CoreError::Internal("object store lock poisoned".to_string()))?;
        objects
            .get(key)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| CoreError::not_found("Object", location))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, CoreError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| CoreError::Internal("object store lock poisoned".to_string()))?;
        objects.insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(Self::url_for(key))
    }
}
