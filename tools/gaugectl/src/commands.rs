//! Subcommand implementations

use crate::vars;
use anyhow::{bail, Context, Result};
use colored::*;
use common::logging;
use common::{load_config_from_file, ChannelSet, ClockVariables, GaugeConfig, SharedChannelSet};
use gauge_calc::{parse, CalcEngine, Chain, ParseError, Registry, VariableTable};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

fn format_value(value: f64) -> ColoredString {
    if value.is_nan() {
        "NaN".yellow()
    } else {
        value.to_string().green()
    }
}

/// Evaluate one expression against `-s` assignments and clock variables
pub fn eval(expression: &str, assignments: &[(String, f64)]) -> Result<()> {
    let program = parse(expression).map_err(|e| parse_failure(expression, &e))?;
    let variables = vars::to_table(assignments);
    let clock = ClockVariables::now();

    let mut engine = CalcEngine::with_builtins();
    let value = engine.evaluate(&program, &Chain::new(&variables, &clock))?;
    debug!(expression, value, "Evaluated");

    println!("{}", format_value(value));
    Ok(())
}

/// Static facts about an expression
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub expression: String,
    pub postfix: String,
    pub variables: Vec<String>,
    pub functions: Vec<String>,
    /// Called functions the built-in registry does not provide
    pub unknown_functions: Vec<String>,
}

impl CheckReport {
    pub fn build(expression: &str, registry: &Registry) -> std::result::Result<Self, ParseError> {
        let program = parse(expression)?;
        let functions: Vec<String> = program.functions().into_iter().map(String::from).collect();
        let unknown_functions = functions
            .iter()
            .filter(|name| registry.function(name).is_none())
            .cloned()
            .collect();

        Ok(Self {
            expression: expression.to_string(),
            postfix: program.to_display_string(),
            variables: program.variables().into_iter().map(String::from).collect(),
            functions,
            unknown_functions,
        })
    }
}

/// Parse an expression and describe the compiled program
pub fn check(expression: &str, json: bool) -> Result<()> {
    let registry = Registry::with_builtins();
    let report =
        CheckReport::build(expression, &registry).map_err(|e| parse_failure(expression, &e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "OK".green(), report.expression);
    println!("  {:<10} {}", "postfix".bright_cyan(), report.postfix);
    println!(
        "  {:<10} {}",
        "variables".bright_cyan(),
        report.variables.join(", ")
    );
    println!(
        "  {:<10} {}",
        "functions".bright_cyan(),
        report.functions.join(", ")
    );
    for name in &report.unknown_functions {
        println!(
            "  {} '{}' is not a built-in function and will evaluate to NaN",
            "WARN".yellow(),
            name
        );
    }
    Ok(())
}

/// Print a parse error with a caret under the offending offset
fn parse_failure(expression: &str, error: &ParseError) -> anyhow::Error {
    eprintln!("{} {}", "ERROR".red(), error);
    if let Some(position) = error.position() {
        let column = expression
            .get(..position)
            .map_or(position, |prefix| prefix.chars().count());
        eprintln!("  {}", expression);
        eprintln!("  {}{}", " ".repeat(column), "^".red());
    }
    anyhow::Error::new(error.clone()).context(format!("Failed to parse '{}'", expression))
}

/// List registered functions
pub fn functions() {
    let registry = Registry::with_builtins();
    println!("{}", "Built-in functions".bright_cyan());
    for name in registry.function_names() {
        println!("  {}", name);
    }
}

/// Load configuration for `run`
pub fn load_run_config(path: &Path) -> Result<GaugeConfig> {
    load_config_from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Poll every configured channel until interrupted or `ticks` passes ran
///
/// With `follow_log_level`, a reload also applies a changed `logging.level`.
pub async fn run(
    config: GaugeConfig,
    path: PathBuf,
    ticks: Option<u64>,
    follow_log_level: bool,
) -> Result<()> {
    let variables: VariableTable = config
        .variables
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();

    let (set, report) = ChannelSet::compile(&config.channels);
    for (name, error) in &report.skipped {
        eprintln!("{} channel '{}' skipped: {}", "WARN".yellow(), name, error);
    }
    if set.is_empty() {
        bail!("No channel compiled from {}", path.display());
    }

    let shared = SharedChannelSet::new(set);
    spawn_reload_on_hangup(shared.clone(), path, follow_log_level);

    let mut engine = CalcEngine::with_builtins();
    let mut interval = tokio::time::interval(config.polling.interval());
    let mut passes = 0u64;

    info!(
        channels = report.compiled,
        interval_ms = config.polling.interval_ms,
        filter = %logging::get_log_level(),
        "Polling started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {},
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            },
        }

        let clock = ClockVariables::now();
        let resolver = Chain::new(&variables, &clock);
        let stamp = clock.instant().format("%H:%M:%S%.3f").to_string();

        let set = shared.snapshot();
        let emitted = set.evaluate_each(&mut engine, &resolver, |channel, value| {
            println!(
                "{} {} = {}",
                stamp.dimmed(),
                channel.name().bold(),
                format_value(value)
            );
        });
        debug!(pass = passes, emitted, "Polling pass done");

        passes += 1;
        if ticks.is_some_and(|limit| passes >= limit) {
            break;
        }
    }

    info!(passes, "Polling stopped");
    Ok(())
}

/// Filter to switch to after a reload; `None` when nothing changed
#[cfg_attr(not(unix), allow(dead_code))]
fn changed_filter<'a>(current: &str, configured: Option<&'a str>) -> Option<&'a str> {
    configured
        .map(str::trim)
        .filter(|level| !level.is_empty() && *level != current)
}

#[cfg(unix)]
fn apply_logging(config: &GaugeConfig) {
    let current = logging::get_log_level();
    if let Some(level) = changed_filter(&current, config.logging.level.as_deref()) {
        if let Err(e) = logging::set_log_level(level) {
            warn!("Keeping log filter '{}': {}", current, e);
        }
    }
}

/// Recompile channels from the config file on SIGHUP
#[cfg(unix)]
fn spawn_reload_on_hangup(shared: SharedChannelSet, path: PathBuf, follow_log_level: bool) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                warn!("SIGHUP reload unavailable: {}", e);
                return;
            },
        };
        while hangup.recv().await.is_some() {
            match load_run_config(&path) {
                Ok(config) => {
                    if follow_log_level {
                        apply_logging(&config);
                    }
                    let report = shared.reload(&config.channels);
                    for (name, error) in &report.skipped {
                        warn!(channel = %name, "Skipped on reload: {}", error);
                    }
                },
                Err(e) => warn!("Reload failed, keeping current channels: {:#}", e),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_hangup(_shared: SharedChannelSet, _path: PathBuf, _follow_log_level: bool) {}
