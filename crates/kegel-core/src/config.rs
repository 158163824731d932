use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::scheduler::REMINDER_TICK_INTERVAL;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the local data directory for kegel.
///
/// # Errors
///
/// Returns an error if the local data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let mut path =
        dirs::data_local_dir().ok_or_else(|| anyhow::anyhow!("Failed to get local data dir"))?;
    path.push("kegel");
    Ok(path)
}

/// Process configuration, distinct from the user settings the backend owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub tick_interval_seconds: u64,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: get_data_dir().unwrap_or_else(|_| PathBuf::from(".kegel")),
            tick_interval_seconds: REMINDER_TICK_INTERVAL.as_secs(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config.toml` from the data directory, then apply `KEGEL_*`
    /// environment overrides. A missing file means defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, if
    /// an override does not parse, or if the result is invalid.
    pub fn load() -> Result<Self> {
        let data_dir = std::env::var("KEGEL_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|_| get_data_dir())?;
        let mut config = Self::from_dir(&data_dir)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read `config.toml` under `dir`; `data_dir` defaults to `dir` itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self {
                data_dir: dir.to_path_buf(),
                ..Self::default()
            });
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let table: toml::Table = raw
            .parse()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        let sets_data_dir = table.contains_key("data_dir");
        let mut config: Self = toml::Value::Table(table)
            .try_into()
            .with_context(|| format!("invalid config in {}", path.display()))?;
        if !sets_data_dir {
            config.data_dir = dir.to_path_buf();
        }
        Ok(config)
    }

    /// Apply `KEGEL_DATA_DIR`, `KEGEL_TICK_SECONDS` and `KEGEL_LOG`.
    ///
    /// # Errors
    ///
    /// Returns an error if `KEGEL_TICK_SECONDS` is not a whole number.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("KEGEL_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("KEGEL_TICK_SECONDS") {
            self.tick_interval_seconds = v
                .trim()
                .parse()
                .with_context(|| format!("invalid KEGEL_TICK_SECONDS={v}"))?;
        }
        if let Some(v) = lookup("KEGEL_LOG") {
            self.log_filter = v;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the tick interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_seconds == 0 {
            anyhow::bail!("tick_interval_seconds must be at least 1");
        }
        Ok(())
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    /// Write this config as `config.toml` under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        let path = self.data_dir.join(CONFIG_FILE_NAME);
        let raw = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, raw).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}
