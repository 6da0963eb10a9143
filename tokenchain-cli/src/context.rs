//! CLI context - shared state for all commands

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokenchain::{FlowConfig, Orchestrator};
use tracing::debug;

use crate::console::ConsoleSink;
use crate::output::{OutputFormat, OutputFormatter};

pub struct CliContext {
    /// Explicit `--config` path, if any
    pub config_path: Option<PathBuf>,
    pub output_format: OutputFormat,
    /// Suppress status lines
    pub quiet: bool,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>, output_format: OutputFormat, quiet: bool) -> Self {
        Self {
            config_path,
            output_format,
            quiet,
        }
    }

    pub fn formatter(&self) -> OutputFormatter {
        OutputFormatter::new(self.output_format).quiet(self.quiet)
    }

    /// Load the configuration file and apply `TOKENCHAIN_*` environment overrides.
    pub fn load_config(&self) -> anyhow::Result<(PathBuf, FlowConfig)> {
        let (path, mut config) = FlowConfig::load(self.config_path.as_deref())
            .context("Failed to load configuration")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        debug!("Configuration loaded from {}", path.display());
        Ok((path, config))
    }

    /// Load and validate the configuration, printing any warnings.
    pub fn validated_config(&self) -> anyhow::Result<(PathBuf, FlowConfig)> {
        let (path, config) = self.load_config()?;
        let warnings = config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        let formatter = self.formatter();
        for warning in &warnings {
            formatter.warning(warning);
        }
        Ok((path, config))
    }

    /// A fresh session bound to the console.
    pub fn orchestrator(&self) -> anyhow::Result<Orchestrator> {
        let (_, config) = self.validated_config()?;
        let sink = Arc::new(ConsoleSink::new(self.formatter()));
        Ok(Orchestrator::new(config)?.with_sink(sink))
    }
}
