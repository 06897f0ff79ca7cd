//! Small JSON key-value store for user settings.
//!
//! Each key is one file: `<dir>/<namespace>/<key>.json`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::StorageConfig;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    root: PathBuf,
}

impl SettingsStore {
    pub fn new<P: AsRef<Path>>(dir: P, namespace: &str) -> Self {
        Self {
            root: dir.as_ref().join(namespace),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.dir, &config.namespace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// `Ok(None)` when the record does not exist yet.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        let value = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(value))
    }

    /// Reads a record, falling back when it is missing or unreadable.
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.read(key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key, "no stored record, using defaults");
                fallback
            }
            Err(e) => {
                warn!(key, "ignoring stored record: {e:#}");
                fallback
            }
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        let path = self.path(key);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
