//! JSON files on disk.

use super::{DesignStore, StorageError, StorageResult};
use crate::definition::DesignDefinition;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each definition as `<id>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Use `base_path`, creating it if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Storage under the user's local data directory
    /// (`reportgrid/designs`), falling back to the home directory.
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("reportgrid").join("designs"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn design_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }
}

impl DesignStore for FileStorage {
    fn save(&self, id: &str, definition: &DesignDefinition) -> StorageResult<()> {
        let path = self.design_path(id);
        let json = definition
            .to_json_pretty()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))?;
        log::debug!("Saved design {} to {}", id, path.display());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<DesignDefinition> {
        let path = self.design_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id.to_string()));
        }
        let json = fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        DesignDefinition::from_json(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let path = self.design_path(id);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

        let mut ids: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        Ok(self.design_path(id).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{GroupDefinition, ItemDefinition};
    use tempfile::tempdir;

    fn definition() -> DesignDefinition {
        DesignDefinition {
            base_width: Some(800.0),
            groups: vec![GroupDefinition {
                top_space: 2,
                items: vec![ItemDefinition {
                    left_space: 1,
                    space: 4,
                    min_space: 1,
                    components: Vec::new(),
                }],
                ..GroupDefinition::default()
            }],
            ..DesignDefinition::default()
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        storage.save("invoice", &definition()).unwrap();
        assert!(dir.path().join("invoice.json").exists());
        assert_eq!(storage.load("invoice").unwrap(), definition());
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save("b", &definition()).unwrap();
        storage.save("a", &definition()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(storage.list().unwrap(), vec!["a".to_string(), "b".to_string()]);
        storage.delete("a").unwrap();
        assert!(!storage.exists("a").unwrap());
        assert!(matches!(storage.load("a"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_ids_are_sanitized() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        storage.save("../escape", &definition()).unwrap();
        assert!(dir.path().join("___escape.json").exists());
        assert!(storage.exists("../escape").unwrap());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("designs");
        let storage = FileStorage::new(&nested).unwrap();
        assert!(nested.exists());
        assert_eq!(storage.base_path(), nested.as_path());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
        assert!(matches!(storage.load("broken"), Err(StorageError::Serialization(_))));
    }
}
