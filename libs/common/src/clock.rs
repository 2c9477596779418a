//! Wall-clock variables
//!
//! | Variable | Value |
//! |----------|-------|
//! | `time.hour` | 0-23 |
//! | `time.minute` | 0-59 |
//! | `time.second` | 0-59 |
//! | `time.day` | day of month, 1-31 |
//! | `time.month` | 1-12 |
//! | `time.year` | calendar year |
//! | `time.weekday` | 0 = Monday .. 6 = Sunday |
//! | `time.unix` | seconds since the epoch, fractional |

use chrono::{DateTime, Datelike, FixedOffset, Local, Timelike};
use gauge_calc::Resolver;

/// Name prefix of every clock variable
pub const PREFIX: &str = "time.";

/// Resolver over one instant, so every variable in a pass agrees
#[derive(Debug, Clone, Copy)]
pub struct ClockVariables {
    instant: DateTime<FixedOffset>,
}

impl ClockVariables {
    /// Current local time
    pub fn now() -> Self {
        let now = Local::now();
        Self::at(now.with_timezone(now.offset()))
    }

    pub fn at(instant: DateTime<FixedOffset>) -> Self {
        Self { instant }
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }
}

impl Resolver for ClockVariables {
    fn resolve(&self, name: &str) -> f64 {
        let Some(field) = name.strip_prefix(PREFIX) else {
            return f64::NAN;
        };
        let t = &self.instant;
        match field {
            "hour" => f64::from(t.hour()),
            "minute" => f64::from(t.minute()),
            "second" => f64::from(t.second()),
            "day" => f64::from(t.day()),
            "month" => f64::from(t.month()),
            "year" => f64::from(t.year()),
            "weekday" => f64::from(t.weekday().num_days_from_monday()),
            "unix" => t.timestamp_millis() as f64 / 1000.0,
            _ => f64::NAN,
        }
    }
}
