//! Global calfold configuration.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::{CalFoldError, CalFoldResult};
use crate::query::QueryOptions;

static DEFAULT_DATA_DIR: &str = "~/.calfold";
static DEFAULT_NOTIFICATION_OFFSET: &str = "30m";

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn is_default_data_dir(p: &PathBuf) -> bool {
    *p == default_data_dir()
}

fn default_notification_offset() -> String {
    DEFAULT_NOTIFICATION_OFFSET.to_string()
}

/// Configuration at ~/.config/calfold/config.toml
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CalfoldConfig {
    /// Where the event log, checkpoint and scheduled jobs live.
    #[serde(default = "default_data_dir", skip_serializing_if = "is_default_data_dir")]
    pub data_dir: PathBuf,

    /// How long before an event its reminder fires, e.g. "30m" or "1h 15m".
    #[serde(default = "default_notification_offset")]
    pub notification_offset: String,

    #[serde(default)]
    pub sort_by_start: bool,

    #[serde(default)]
    pub expand_all_templates: bool,
}

impl Default for CalfoldConfig {
    fn default() -> Self {
        CalfoldConfig {
            data_dir: default_data_dir(),
            notification_offset: default_notification_offset(),
            sort_by_start: false,
            expand_all_templates: false,
        }
    }
}

impl CalfoldConfig {
    pub fn config_path() -> CalFoldResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalFoldError::Config("Could not determine config directory".into()))?
            .join("calfold");

        Ok(config_dir.join("config.toml"))
    }

    /// Load the global config, creating a commented default file on first use.
    pub fn load() -> CalFoldResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> CalFoldResult<Self> {
        let config: CalfoldConfig = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .build()
            .map_err(|e| CalFoldError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalFoldError::Config(e.to_string()))?;

        config.notification_offset()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> CalFoldResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CalFoldError::Config(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| CalFoldError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalFoldResult<()> {
        let contents = format!(
            "\
# calfold configuration

# Where the event log and scheduled reminders are stored:
# data_dir = \"{}\"

# How long before an event its reminder fires:
# notification_offset = \"{}\"

# Sort query results by start time instead of listing one-off events first:
# sort_by_start = false

# Expand recurring events whose first occurrence is outside the queried window:
# expand_all_templates = false
",
            DEFAULT_DATA_DIR, DEFAULT_NOTIFICATION_OFFSET
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CalFoldError::Config(format!("Could not create config directory: {e}")))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalFoldError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// `data_dir` with `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.data_dir.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn notification_offset(&self) -> CalFoldResult<TimeDelta> {
        let std_dur = humantime::parse_duration(&self.notification_offset).map_err(|e| {
            CalFoldError::Config(format!(
                "Invalid notification_offset '{}': {}",
                self.notification_offset, e
            ))
        })?;

        TimeDelta::from_std(std_dur)
            .map_err(|_| CalFoldError::Config("notification_offset is too large".into()))
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            sort_by_start: self.sort_by_start,
            expand_all_templates: self.expand_all_templates,
        }
    }
}
