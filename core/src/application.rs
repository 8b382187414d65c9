//! Initialization for CommandDB
//!
//! Builds an [`Application`] from layered configuration: the store, the
//! execution engine over the host desktop, and the tag rules.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::desktop::Desktop;
use crate::engine::{ArgumentPrompt, EngineSettings, ExecutionEngine, Notifier};
use crate::store::CommandStore;
use crate::tagging::TagRules;

/// The CommandDB application instance
pub struct Application {
    pub config: Config,
    pub store: CommandStore,
    pub engine: ExecutionEngine,
    pub tag_rules: TagRules,
}

impl Application {
    /// Create a new Application instance (no I/O beyond reading tag rules)
    pub fn new(config: Config, engine: ExecutionEngine) -> Result<Self> {
        let tag_rules = TagRules::load(config.tagging.rules_path.as_deref())?;
        Ok(Self {
            store: CommandStore::from_config(&config),
            config,
            engine,
            tag_rules,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Options for initializing CommandDB
#[derive(Default)]
pub struct InitOptions {
    /// Config file path (overrides default search)
    pub config_path: Option<PathBuf>,

    /// Data directory (overrides config file and env vars)
    pub data_dir: Option<PathBuf>,

    /// Skip `.env` and environment variables
    pub ignore_env: bool,

    /// Desktop backends; the host's when unset
    pub desktop: Option<Desktop>,

    pub prompt: Option<Arc<dyn ArgumentPrompt>>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// Builder for constructing InitOptions
#[derive(Default)]
pub struct InitBuilder {
    options: InitOptions,
}

impl InitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.options.config_path = path;
        self
    }

    pub fn data_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.options.data_dir = dir;
        self
    }

    pub fn ignore_env(mut self) -> Self {
        self.options.ignore_env = true;
        self
    }

    pub fn desktop(mut self, desktop: Desktop) -> Self {
        self.options.desktop = Some(desktop);
        self
    }

    pub fn prompt(mut self, prompt: Arc<dyn ArgumentPrompt>) -> Self {
        self.options.prompt = Some(prompt);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.options.notifier = Some(notifier);
        self
    }

    pub fn init(self) -> Result<Application> {
        initialize(self.options)
    }
}

/// Initialize CommandDB and return an Application instance
pub fn initialize(options: InitOptions) -> Result<Application> {
    let mut builder = Config::builder()
        .config_path(options.config_path)
        .data_dir(options.data_dir);
    if options.ignore_env {
        builder = builder.without_env();
    }
    let config = builder.build().context("Failed to load configuration")?;

    debug!(
        store = %config.store_path().display(),
        flavor = ?config.shell_flavor(),
        "Configuration loaded"
    );

    let desktop = options.desktop.unwrap_or_else(Desktop::system);
    let mut engine = ExecutionEngine::new(desktop, EngineSettings::from_config(&config));
    if let Some(prompt) = options.prompt {
        engine = engine.with_prompt(prompt);
    }
    if let Some(notifier) = options.notifier {
        engine = engine.with_notifier(notifier);
    }

    Application::new(config, engine)
}
