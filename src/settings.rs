//! Durable user settings: the last room key and the username.
//!
//! The store is a flat string → string map. [`TomlSettingsStore`] persists it as a
//! TOML table and writes through on every `set`; [`MemorySettingsStore`] keeps it
//! in memory for tests and for runs without a settings file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, TidiError};

/// Key holding the raw (unresolved) room key.
pub const ROOM_KEY: &str = "roomKey";

/// Key holding the username.
pub const USERNAME: &str = "usrIn";

/// Get/set string values by key.
pub trait SettingsStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted to a TOML file.
#[derive(Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl TomlSettingsStore {
    /// Load settings from `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).map_err(|e| TidiError::SettingsParse {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file yet");
                BTreeMap::new()
            }
            Err(source) => {
                return Err(TidiError::SettingsIo {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let text = toml::to_string(&self.values)?;
        std::fs::write(&self.path, text).map_err(|source| TidiError::SettingsIo {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl SettingsStore for TomlSettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}
