use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use kegel_core::UserSettings;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const SETTINGS_FILE: &str = "settings.json";
pub const STATS_FILE: &str = "stats.json";
pub const HISTORY_FILE: &str = "history.json";

/// Settings as written to disk, with the reminder mark kept next to them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    #[serde(flatten)]
    pub settings: UserSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reminder_time: Option<DateTime<Local>>,
}

/// JSON files under one directory, or nothing at all in memory mode
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: Option<PathBuf>,
}

impl JsonStore {
    /// Store rooted at `dir`, created if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        log::info!("Data directory: {}", dir.display());
        Ok(Self {
            dir: Some(dir.to_path_buf()),
        })
    }

    #[must_use]
    pub const fn in_memory() -> Self {
        Self { dir: None }
    }

    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Read `name`, falling back to the default when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let Some(dir) = &self.dir else {
            return Ok(T::default());
        };
        let path = dir.join(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Write `value` as pretty JSON. A no-op in memory mode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path = dir.join(name);
        let raw = serde_json::to_string_pretty(value).context("Failed to serialize")?;
        // Atomic replace
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Like [`JsonStore::load`], but an unreadable file is logged and
    /// replaced by the default
    #[must_use]
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        self.load(name).unwrap_or_else(|e| {
            log::warn!("Failed to load {name}, using defaults: {e:#}");
            T::default()
        })
    }
}
