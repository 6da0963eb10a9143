//! Config command - configuration management

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Subcommand;
use tokenchain::{FlowConfig, Step};

use crate::context::CliContext;
use crate::output::{OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (file plus environment overrides)
    Show,

    /// Validate the configuration file
    Validate,

    /// Write a starter configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, default_value = "tokenchain.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn execute(ctx: &CliContext, command: ConfigCommand) -> anyhow::Result<()> {
    let formatter = ctx.formatter();

    match command {
        ConfigCommand::Show => show_config(ctx, &formatter),
        ConfigCommand::Validate => validate_config(ctx, &formatter),
        ConfigCommand::Init { output, force } => init_config(&output, force, &formatter),
    }
}

fn show_config(ctx: &CliContext, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let (path, config) = ctx.load_config()?;

    if formatter.format() == OutputFormat::Json {
        formatter.json(&config);
        return Ok(());
    }

    formatter.section("Configuration");
    formatter.kv("Config file", &path.to_string_lossy());

    for step in Step::ALL {
        let call = config.call(step);
        formatter.section(&format!("[{}]", step.key()));
        formatter.kv("URL", &call.url);
        formatter.kv("Method", call.method_name());
        if step == Step::Authenticate {
            formatter.kv(
                "Token field",
                call.token_field.as_deref().unwrap_or("(auto-detect)"),
            );
            if let Some(device_id) = &call.device_id {
                formatter.kv("Device ID", device_id);
            }
        } else {
            formatter.kv(
                "Authorization override",
                if call.allow_authorization_override {
                    "allowed"
                } else {
                    "blocked"
                },
            );
        }
        if call.headers.is_empty() {
            formatter.list_item("(no extra headers)");
        } else {
            for name in call.headers.keys() {
                // Header values often carry secrets.
                formatter.list_item(&format!("{}: ***", name));
            }
        }
    }
    Ok(())
}

fn validate_config(ctx: &CliContext, formatter: &OutputFormatter) -> anyhow::Result<()> {
    let (path, config) = ctx.load_config()?;
    let warnings = config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    for warning in &warnings {
        formatter.warning(warning);
    }
    formatter.success(&format!(
        "Configuration {} is valid ({} warning{})",
        path.display(),
        warnings.len(),
        if warnings.len() == 1 { "" } else { "s" }
    ));
    Ok(())
}

fn init_config(output: &PathBuf, force: bool, formatter: &OutputFormatter) -> anyhow::Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(output, FlowConfig::template())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    formatter.success(&format!("Wrote {}", output.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokenchain.toml");
        let formatter = OutputFormatter::new(OutputFormat::Plain);

        init_config(&path, false, &formatter).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(FlowConfig::from_toml_str(&written).is_ok());

        assert!(init_config(&path, false, &formatter).is_err());
        assert!(init_config(&path, true, &formatter).is_ok());
    }
}
