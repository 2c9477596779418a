//! Gauge host library
//!
//! Glue shared by gauge binaries around the `gauge-calc` engine:
//! - logging bootstrap
//! - configuration loading
//! - compiled channel sets
//! - wall-clock variables

pub mod channel;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use channel::{Channel, ChannelSet, CompileReport, SharedChannelSet};
pub use clock::ClockVariables;
pub use config::{
    load_config_from_file, ChannelConfig, GaugeConfig, LoggingConfig, PollingConfig,
};
pub use error::{Error, Result};
