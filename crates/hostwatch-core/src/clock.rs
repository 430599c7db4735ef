//! Local wall-clock access for the configured time zone.
//!
//! Interval bookkeeping in the scheduler uses monotonic `Instant`s; this
//! clock exists for everything that is calendar-shaped: the daily report
//! trigger, log file naming, and persisted timestamps.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Timestamp format for log lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date suffix appended to per-service log files
pub const LOG_DATE_FORMAT: &str = "%Y-%m-%d";

/// Human-readable format used in alert subjects and report titles
pub const HUMAN_DATETIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// A clock pinned to one IANA time zone.
///
/// Cheap to copy; every component that needs local time gets its own copy at
/// construction instead of reaching for a global.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    tz: Tz,
}

impl LocalClock {
    /// Create a clock for the given time zone
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Create a clock from an IANA zone identifier (e.g. "Europe/Vienna")
    pub fn from_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| Error::config(format!("unknown time zone: {name}")))?;
        Ok(Self::new(tz))
    }

    /// Current local time
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// The zone this clock is pinned to
    pub fn timezone(&self) -> Tz {
        self.tz
    }
}
