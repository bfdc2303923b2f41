//! In-memory storage.

use super::{DesignStore, StorageError, StorageResult};
use crate::definition::DesignDefinition;
use std::collections::HashMap;
use std::sync::RwLock;

/// Keeps definitions in a map, for tests and scratch sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    designs: RwLock<HashMap<String, DesignDefinition>>,
}

fn lock_error(err: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", err))
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DesignStore for MemoryStorage {
    fn save(&self, id: &str, definition: &DesignDefinition) -> StorageResult<()> {
        let mut designs = self.designs.write().map_err(lock_error)?;
        designs.insert(id.to_string(), definition.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<DesignDefinition> {
        let designs = self.designs.read().map_err(lock_error)?;
        designs
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let mut designs = self.designs.write().map_err(lock_error)?;
        designs.remove(id);
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let designs = self.designs.read().map_err(lock_error)?;
        Ok(designs.keys().cloned().collect())
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        let designs = self.designs.read().map_err(lock_error)?;
        Ok(designs.contains_key(id))
    }
}
