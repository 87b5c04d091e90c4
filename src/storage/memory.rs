use std::collections::HashMap;
use std::sync::Mutex;

use super::{Storage, poisoned};
use crate::error::MwanamamaError;

/// Process-local storage. Contents vanish with the value.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_raw(&self, key: &str) -> Result<Option<String>, MwanamamaError> {
        Ok(self.entries.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), MwanamamaError> {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<Option<String>, MwanamamaError> {
        Ok(self.entries.lock().map_err(poisoned)?.remove(key))
    }
}
