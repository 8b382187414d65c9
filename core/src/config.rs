//! Configuration loading
//!
//! Sources are layered, later ones winning:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, `COMMANDDB_CONFIG_PATH`, or `./commanddb.toml`)
//! 3. `COMMANDDB__SECTION__KEY` environment variables (a `.env` file is read first)
//! 4. Explicit overrides passed to the builder

use anyhow::{Context, Result};
use config::{Config as Layers, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dispatch::ShellFlavor;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "COMMANDDB_CONFIG_PATH";

/// Loopback port claimed by the running engine
pub const DEFAULT_INSTANCE_PORT: u16 = 49202;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub engine: EngineConfig,
    pub instance: InstanceConfig,
    #[serde(default)]
    pub tagging: TaggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the store file and its backups
    pub data_dir: PathBuf,
    pub file_name: String,
    pub backup_dir_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Pause before a hotkey is sent, so the triggering widget can give up focus
    pub hotkey_delay_ms: u64,
    /// Pause after a target window was brought to the foreground
    pub focus_settle_ms: u64,
    /// Shell wrapping rules; the host platform's when unset
    pub shell_flavor: Option<ShellFlavor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaggingConfig {
    /// TOML table of `tag = [keywords]` replacing the built-in rules
    pub rules_path: Option<PathBuf>,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load with no explicit overrides
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn store_path(&self) -> PathBuf {
        self.store.data_dir.join(&self.store.file_name)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.store.data_dir.join(&self.store.backup_dir_name)
    }

    pub fn shell_flavor(&self) -> ShellFlavor {
        self.engine.shell_flavor.unwrap_or_else(ShellFlavor::host)
    }
}

/// Builder for [`Config`]
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    read_env: Option<bool>,
}

impl ConfigBuilder {
    /// Set the config file path (overrides default search)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Set the data directory (overrides every other source)
    pub fn data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.data_dir = dir;
        self
    }

    /// Skip `.env` and `COMMANDDB__*` variables
    pub fn without_env(mut self) -> Self {
        self.read_env = Some(false);
        self
    }

    pub fn build(self) -> Result<Config> {
        let read_env = self.read_env.unwrap_or(true);
        if read_env {
            dotenvy::dotenv().ok();
        }

        let mut layers = Layers::builder()
            .set_default("store.data_dir", path_string(&default_data_dir()))?
            .set_default("store.file_name", "commands.json")?
            .set_default("store.backup_dir_name", "backups")?
            .set_default("engine.hotkey_delay_ms", 300)?
            .set_default("engine.focus_settle_ms", 200)?
            .set_default("instance.port", i64::from(DEFAULT_INSTANCE_PORT))?;

        let explicit_path = self.config_path.or_else(|| {
            if read_env {
                std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
            } else {
                None
            }
        });

        layers = match &explicit_path {
            Some(path) => layers.add_source(File::from(path.as_path()).required(true)),
            None => layers.add_source(File::with_name("commanddb").required(false)),
        };

        if read_env {
            layers = layers.add_source(Environment::with_prefix("COMMANDDB").separator("__"));
        }

        if let Some(dir) = &self.data_dir {
            layers = layers.set_override("store.data_dir", path_string(dir))?;
        }

        let config: Config = layers
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if config.store.file_name.trim().is_empty() {
            anyhow::bail!("store.file_name must not be empty");
        }

        Ok(config)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("commanddb"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
