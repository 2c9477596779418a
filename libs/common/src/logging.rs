//! Logging bootstrap shared by gauge binaries
//!
//! Console output uses the bracketed `timestamp [LEVEL] message` format. An
//! optional daily-rolling file gets the same format, or JSON lines. The
//! level filter sits behind a reload handle so it can change at runtime.

use std::path::PathBuf;
use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    reload,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2026-03-02T00:50:44.809120Z [INFO] Channel set compiled compiled=3`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m", // magenta
                Level::DEBUG => "\x1b[34m", // blue
                Level::INFO => "\x1b[32m",  // green
                Level::WARN => "\x1b[33m",  // yellow
                Level::ERROR => "\x1b[31m", // red
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Keeps the non-blocking file writer flushing until process exit
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

type EnvFilterReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;
static LOG_FILTER_HANDLE: OnceLock<EnvFilterReloadHandle> = OnceLock::new();
static CURRENT_LOG_LEVEL: OnceLock<Mutex<String>> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Binary name, used in the default filter and the log file name
    pub service_name: String,
    /// Filter directive (e.g. `debug` or `info,gauge_calc=trace`);
    /// `RUST_LOG` takes precedence when set
    pub filter: Option<String>,
    /// Directory for the daily log file; console only when unset
    pub log_dir: Option<PathBuf>,
    /// Write the log file as JSON lines
    pub enable_json: bool,
    /// Colored console level tags
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "gauge".to_string(),
            filter: None,
            log_dir: None,
            enable_json: false,
            ansi: true,
        }
    }
}

impl LogConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Take level, directory and format from the `logging` config section
    pub fn with_settings(mut self, settings: &LoggingConfig) -> Self {
        if settings.level.is_some() {
            self.filter = settings.level.clone();
        }
        self.log_dir = settings.dir.clone();
        self.enable_json = settings.json;
        self
    }

    /// Filter directive to start with
    ///
    /// Priority: `RUST_LOG` > configured filter > `info,{service}=debug`
    pub fn effective_filter(&self, rust_log: Option<String>) -> String {
        if let Some(env) = rust_log.filter(|value| !value.trim().is_empty()) {
            return env;
        }
        match &self.filter {
            Some(filter) => filter.clone(),
            None => format!("info,{}=debug", self.service_name.replace('-', "_")),
        }
    }
}

/// Initialize logging system with configuration
///
/// Fails when a global subscriber is already installed.
pub fn init_with_config(config: LogConfig) -> Result<()> {
    let filter_str = config.effective_filter(std::env::var("RUST_LOG").ok());
    let env_filter = EnvFilter::try_new(&filter_str)
        .map_err(|e| Error::logging(format!("Invalid log filter '{}': {}", filter_str, e)))?;

    // Wrap EnvFilter with reload::Layer for dynamic level changes
    let (reload_filter, reload_handle) = reload::Layer::new(env_filter);

    let registry = tracing_subscriber::registry().with(reload_filter);

    let console_layer = fmt::layer()
        .with_ansi(config.ansi)
        .event_format(BracketedLevelFormat)
        .boxed();

    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            GUARDS
                .get_or_init(|| Mutex::new(Vec::new()))
                .lock()
                .push(guard);

            let layer = if config.enable_json {
                fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_level(true)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .boxed()
            } else {
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .event_format(BracketedLevelFormat)
                    .boxed()
            };
            Some(layer)
        },
        None => None,
    };

    registry
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::logging(e.to_string()))?;

    let _ = LOG_FILTER_HANDLE.set(reload_handle);
    *CURRENT_LOG_LEVEL
        .get_or_init(|| Mutex::new(String::new()))
        .lock() = filter_str.clone();

    tracing::debug!(
        service = %config.service_name,
        filter = %filter_str,
        log_dir = ?config.log_dir,
        "Logging initialized"
    );
    Ok(())
}

/// Dynamically set log filter level at runtime
///
/// Accepts a bare level (`debug`) or a full filter directive
/// (`info,gauge_calc=trace`).
pub fn set_log_level(level: &str) -> Result<()> {
    let handle = LOG_FILTER_HANDLE
        .get()
        .ok_or_else(|| Error::logging("Logging not initialized with reload support"))?;

    let new_filter = EnvFilter::try_new(level)
        .map_err(|e| Error::logging(format!("Invalid log level '{}': {}", level, e)))?;

    handle
        .reload(new_filter)
        .map_err(|e| Error::logging(format!("Failed to reload log filter: {}", e)))?;

    if let Some(current) = CURRENT_LOG_LEVEL.get() {
        *current.lock() = level.to_string();
    }

    tracing::info!("Log level changed to: {}", level);
    Ok(())
}

/// Get current log filter level
pub fn get_log_level() -> String {
    CURRENT_LOG_LEVEL
        .get()
        .map(|current| current.lock().clone())
        .unwrap_or_else(|| "unknown".to_string())
}
