//! tokenchain - drive the authenticate, submit-profile, onboard chain
//!
//! # Usage
//!
//! ```bash
//! # Walk the chain one call at a time
//! tokenchain session
//!
//! # Run all three calls without prompts
//! tokenchain run --phone-number 5551234 --mpin 0000 \
//!     --username jdoe --display-name "J Doe" --email j@example.com
//!
//! # Configuration commands
//! tokenchain config show
//! tokenchain config validate
//! tokenchain config init
//! ```

mod commands;
mod console;
mod context;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{config::ConfigCommand, run::RunArgs};
use crate::context::CliContext;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "tokenchain")]
#[command(version)]
#[command(about = "Authenticate, submit a profile and onboard against a remote service", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "TOKENCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Output format (table, json, plain)
    #[arg(short, long, global = true, default_value = "table")]
    output_format: String,

    /// Suppress status messages
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session, one call at a time
    Session,

    /// Run all three calls in order
    Run(RunArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "tokenchain=debug"
    } else {
        "tokenchain=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let output_format: OutputFormat = cli.output_format.parse().unwrap_or_else(|e| {
        eprintln!("Warning: {}. Using table format.", e);
        OutputFormat::Table
    });

    let ctx = CliContext::new(cli.config, output_format, cli.quiet);

    let result = match cli.command {
        Commands::Session => commands::session::execute(&ctx).await,
        Commands::Run(args) => commands::run::execute(&ctx, args).await,
        Commands::Config { command } => commands::config::execute(&ctx, command).await,
    };

    if let Err(e) = result {
        ctx.formatter().error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::parse_from(["tokenchain", "config", "show", "-o", "json", "-q"]);
        assert_eq!(cli.output_format, "json");
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommand::Show
            }
        ));
    }

    #[test]
    fn config_init_takes_long_output_flag() {
        let cli = Cli::parse_from([
            "tokenchain",
            "config",
            "init",
            "--output",
            "x.toml",
            "-f",
            "-o",
            "plain",
        ]);
        assert_eq!(cli.output_format, "plain");
        match cli.command {
            Commands::Config {
                command: ConfigCommand::Init { output, force },
            } => {
                assert_eq!(output, PathBuf::from("x.toml"));
                assert!(force);
            }
            _ => panic!("expected config init"),
        }
    }
}
