//! Persistence of design definitions.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::definition::DesignDefinition;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    #[error("Design not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend holding design definitions by key.
///
/// Calls complete before returning; the editor never waits on storage
/// in the middle of an action.
pub trait DesignStore: Send + Sync {
    fn save(&self, id: &str, definition: &DesignDefinition) -> StorageResult<()>;

    fn load(&self, id: &str) -> StorageResult<DesignDefinition>;

    /// Delete a definition. Deleting a missing key is not an error.
    fn delete(&self, id: &str) -> StorageResult<()>;

    fn list(&self) -> StorageResult<Vec<String>>;

    fn exists(&self, id: &str) -> StorageResult<bool>;
}
