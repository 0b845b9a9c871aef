//! JSON file persistence adapter.

use crate::domain::error::RatesheetError;
use crate::domain::rate_table::RootState;
use crate::ports::persistence_port::PersistencePort;
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct JsonStoreAdapter {
    path: PathBuf,
}

impl JsonStoreAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistencePort for JsonStoreAdapter {
    fn load(&self) -> Result<Option<RootState>, RatesheetError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RatesheetError::Storage {
                    reason: format!("failed to read {}: {}", self.path.display(), e),
                })
            }
        };

        let state: RootState =
            serde_json::from_str(&content).map_err(|e| RatesheetError::Storage {
                reason: format!("invalid data in {}: {}", self.path.display(), e),
            })?;
        debug!(
            "loaded {} clients from {}",
            state.clients.len(),
            self.path.display()
        );
        Ok(Some(state))
    }

    fn save(&self, state: &RootState) -> Result<(), RatesheetError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RatesheetError::Storage {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|e| RatesheetError::Storage {
            reason: format!("failed to encode state: {}", e),
        })?;
        fs::write(&self.path, json).map_err(|e| RatesheetError::Storage {
            reason: format!("failed to write {}: {}", self.path.display(), e),
        })?;
        debug!("saved state to {}", self.path.display());
        Ok(())
    }
}
