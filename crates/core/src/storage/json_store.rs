use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

/// Whole-file JSON persistence for one record type.
///
/// Every `save` overwrites the full file; there are no partial or append
/// writes and no locking. Single writer assumed, last write wins.
pub struct JsonStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored record. A missing file yields `T::default()`.
    pub fn load(&self) -> Result<T, CoreError> {
        if !self.path.exists() {
            return Ok(T::default());
        }
        let json = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&json).map_err(|e| {
            CoreError::Deserialization(format!("Failed to read {}: {e}", self.path.display()))
        })
    }

    /// Serialize and overwrite the file.
    pub fn save(&self, record: &T) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize record: {e}")))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl<T> std::fmt::Debug for JsonStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonStore").field("path", &self.path).finish()
    }
}
