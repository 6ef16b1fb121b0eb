//! Durable slot for the last selected city.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use skycast_core::StorageError;

const CITY_FILE: &str = "last_city.json";

/// Small key-value slot holding the last selected city.
pub trait CityStore: Send + Sync {
    /// `Ok(None)` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>, StorageError>;

    fn save(&self, city: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCity {
    city: String,
}

/// JSON file in the config directory
#[derive(Debug, Clone)]
pub struct FileCityStore {
    path: PathBuf,
}

impl FileCityStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            path: config_dir.join(CITY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CityStore for FileCityStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .map_err(|e| StorageError::ReadFailed(format!("{}: {}", self.path.display(), e)))?;
        let stored: StoredCity = serde_json::from_str(&json)
            .map_err(|e| StorageError::ReadFailed(format!("{}: {}", self.path.display(), e)))?;

        Ok(Some(stored.city).filter(|c| !c.trim().is_empty()))
    }

    fn save(&self, city: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::WriteFailed(format!("{}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_string_pretty(&StoredCity {
            city: city.to_string(),
        })
        .map_err(|e| StorageError::WriteFailed(e.to_string()))?;

        fs::write(&self.path, json)
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", self.path.display(), e)))?;

        tracing::debug!("Saved city {:?} to {}", city, self.path.display());
        Ok(())
    }
}

/// Process-local store, used in tests
#[derive(Debug, Default)]
pub struct MemoryCityStore {
    city: Mutex<Option<String>>,
}

impl MemoryCityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(city: &str) -> Self {
        Self {
            city: Mutex::new(Some(city.to_string())),
        }
    }
}

impl CityStore for MemoryCityStore {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.city.lock().clone())
    }

    fn save(&self, city: &str) -> Result<(), StorageError> {
        *self.city.lock() = Some(city.to_string());
        Ok(())
    }
}

impl<T: CityStore + ?Sized> CityStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<String>, StorageError> {
        (**self).load()
    }

    fn save(&self, city: &str) -> Result<(), StorageError> {
        (**self).save(city)
    }
}
