//! gaugectl - Evaluate, inspect and run gauge expressions
//!
//! Ad-hoc evaluation and program inspection for single expressions, and a
//! polling loop that evaluates every channel of a configuration file.

mod commands;
mod vars;

use anyhow::Result;
use clap::{Parser, Subcommand};
use common::logging::{self, LogConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gaugectl")]
#[command(about = "Gauge expression tool")]
#[command(long_about = "Gauge expression tool

Commands:
  eval        Evaluate an expression once
  check       Parse an expression and show the compiled program
  functions   List built-in functions
  run         Poll the channels of a configuration file

Examples:
  gaugectl eval \"remap(t, 0, 100, 0, 1)\" -s t=42
  gaugectl check \"x > 0 ? y : z\"
  gaugectl run -c gauge.yaml --ticks 10

Use 'gaugectl <command> --help' for more information on a specific command.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter, e.g. `debug` or `info,gauge_calc=trace` (RUST_LOG wins when set)
    #[arg(long, global = true, env = "GAUGE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression once
    Eval {
        /// Expression text
        expression: String,

        /// Variable assignment `name=value`, repeatable
        #[arg(short = 's', long = "set", value_parser = vars::parse_assignment)]
        assignments: Vec<(String, f64)>,
    },

    /// Parse an expression and show the compiled program
    Check {
        /// Expression text
        expression: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List built-in functions
    Functions,

    /// Poll the channels of a configuration file
    Run {
        /// Configuration file (.yaml, .yml, .toml or .json)
        #[arg(short = 'c', long = "config")]
        config: PathBuf,

        /// Stop after this many polling passes
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure colored output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut log_config = LogConfig::new("gaugectl");
    log_config.ansi = !cli.no_color;

    match cli.command {
        Commands::Eval {
            expression,
            assignments,
        } => {
            init_logging(log_config, cli.log_level)?;
            commands::eval(&expression, &assignments)
        },
        Commands::Check { expression, json } => {
            init_logging(log_config, cli.log_level)?;
            commands::check(&expression, json)
        },
        Commands::Functions => {
            commands::functions();
            Ok(())
        },
        Commands::Run { config, ticks } => {
            let settings = commands::load_run_config(&config)?;
            // The config file owns the filter unless RUST_LOG or --log-level pin it
            let follow_log_level = cli.log_level.is_none()
                && std::env::var("RUST_LOG").map_or(true, |value| value.trim().is_empty());
            init_logging(log_config.with_settings(&settings.logging), cli.log_level)?;
            commands::run(settings, config, ticks, follow_log_level).await
        },
    }
}

/// Install the subscriber; a `--log-level` flag overrides the config file
fn init_logging(mut config: LogConfig, log_level: Option<String>) -> Result<()> {
    if log_level.is_some() {
        config.filter = log_level;
    }
    logging::init_with_config(config)?;
    Ok(())
}
