//! Channel set - one compiled program per configured channel
//!
//! Channels are compiled once. A malformed expression is logged and left
//! out of the set rather than failing the whole configuration, and a NaN
//! reading is never passed on to the sink.

use crate::config::ChannelConfig;
use gauge_calc::{parse, CalcEngine, ParseError, Program, Resolver};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A compiled channel
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    description: Option<String>,
    program: Program,
}

impl Channel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }
}

/// Outcome of compiling a channel list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileReport {
    pub compiled: usize,
    /// Channels left out because their expression does not parse
    pub skipped: Vec<(String, ParseError)>,
}

impl CompileReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelSet {
    channels: Vec<Channel>,
}

impl ChannelSet {
    /// Compile every enabled channel
    pub fn compile(configs: &[ChannelConfig]) -> (Self, CompileReport) {
        let mut channels = Vec::with_capacity(configs.len());
        let mut report = CompileReport::default();

        for config in configs {
            if !config.enabled {
                debug!(channel = %config.name, "Channel disabled");
                continue;
            }
            match parse(&config.expression) {
                Ok(program) => channels.push(Channel {
                    name: config.name.clone(),
                    description: config.description.clone(),
                    program,
                }),
                Err(e) => {
                    warn!(
                        channel = %config.name,
                        expression = %config.expression,
                        "Channel skipped: {}",
                        e
                    );
                    report.skipped.push((config.name.clone(), e));
                },
            }
        }

        report.compiled = channels.len();
        info!(
            compiled = report.compiled,
            skipped = report.skipped.len(),
            "Channel set compiled"
        );
        (Self { channels }, report)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Case-insensitive lookup by name
    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|channel| channel.name.eq_ignore_ascii_case(name))
    }

    /// Evaluate every channel in order, passing non-NaN readings to `sink`
    ///
    /// Returns the number of readings emitted. An internal evaluation error
    /// on one channel is logged and does not stop the others.
    pub fn evaluate_each<R, F>(&self, engine: &mut CalcEngine, resolver: &R, mut sink: F) -> usize
    where
        R: Resolver + ?Sized,
        F: FnMut(&Channel, f64),
    {
        let mut emitted = 0;
        for channel in &self.channels {
            match engine.evaluate(&channel.program, resolver) {
                Ok(value) if value.is_nan() => {
                    debug!(channel = %channel.name, "No reading (NaN)");
                },
                Ok(value) => {
                    sink(channel, value);
                    emitted += 1;
                },
                Err(e) => {
                    error!(channel = %channel.name, "Evaluation failed: {}", e);
                },
            }
        }
        emitted
    }
}

/// Channel set shared between a polling loop and a reloader
///
/// Evaluation works on a snapshot, so a reload never waits for a running
/// pass and a pass never waits for parsing.
#[derive(Debug, Clone, Default)]
pub struct SharedChannelSet {
    current: Arc<Mutex<Arc<ChannelSet>>>,
}

impl SharedChannelSet {
    pub fn new(set: ChannelSet) -> Self {
        Self {
            current: Arc::new(Mutex::new(Arc::new(set))),
        }
    }

    /// The set as of now; later reloads do not affect it
    pub fn snapshot(&self) -> Arc<ChannelSet> {
        Arc::clone(&self.current.lock())
    }

    /// Compile `configs` and swap the result in
    pub fn reload(&self, configs: &[ChannelConfig]) -> CompileReport {
        let (set, report) = ChannelSet::compile(configs);
        *self.current.lock() = Arc::new(set);
        info!(channels = report.compiled, "Channel set reloaded");
        report
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use gauge_calc::VariableTable;
    use tracing_test::traced_test;

    fn make_configs() -> Vec<ChannelConfig> {
        let mut disabled = ChannelConfig::new("disabled", "1");
        disabled.enabled = false;
        vec![
            ChannelConfig::new("sum", "a + b"),
            ChannelConfig::new("broken", "(a + "),
            ChannelConfig::new("missing", "ghost * 2"),
            disabled,
            ChannelConfig::new("Ratio", "a / b"),
        ]
    }

    fn make_vars() -> VariableTable {
        [("a", 3.0), ("b", 4.0)].into_iter().collect()
    }

    #[test]
    #[traced_test]
    fn test_compile_skips_malformed() {
        let (set, report) = ChannelSet::compile(&make_configs());
        assert_eq!(set.len(), 3);
        assert_eq!(report.compiled, 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].0, "broken");
        assert!(!report.is_clean());
        assert!(logs_contain("Channel skipped"));
    }

    #[test]
    #[traced_test]
    fn test_evaluate_each_drops_nan() {
        let (set, _) = ChannelSet::compile(&make_configs());
        let mut engine = CalcEngine::with_builtins();
        let mut readings = Vec::new();

        let emitted = set.evaluate_each(&mut engine, &make_vars(), |channel, value| {
            readings.push((channel.name().to_string(), value));
        });

        assert_eq!(emitted, 2);
        assert_eq!(
            readings,
            vec![("sum".to_string(), 7.0), ("Ratio".to_string(), 0.75)]
        );
        assert!(logs_contain("No reading (NaN)"));
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let (set, _) = ChannelSet::compile(&make_configs());
        let channel = set.get("ratio").unwrap();
        assert_eq!(channel.name(), "Ratio");
        assert_eq!(channel.program().to_display_string(), "a b /");
        assert!(set.get("disabled").is_none());
    }

    #[test]
    fn test_reload_keeps_old_snapshot() {
        let (set, _) = ChannelSet::compile(&[ChannelConfig::new("one", "1")]);
        let shared = SharedChannelSet::new(set);
        let before = shared.snapshot();

        let report = shared.reload(&[ChannelConfig::new("two", "2"), ChannelConfig::new("three", "3")]);
        assert!(report.is_clean());

        assert_eq!(before.len(), 1);
        assert_eq!(shared.snapshot().len(), 2);

        let mut engine = CalcEngine::with_builtins();
        let mut values = Vec::new();
        before.evaluate_each(&mut engine, &make_vars(), |_, v| values.push(v));
        assert_eq!(values, vec![1.0]);
    }
}
