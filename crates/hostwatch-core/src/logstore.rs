//! Durable per-service log streams.
//!
//! Each named service writes to `<root>/<service>/service.log.<YYYY-MM-DD>`.
//! The backing file switches automatically when the local date changes; the
//! daily report generator reads these files back by date.
//!
//! Handles are explicit and passed at construction (no global registry).
//! Lines are mirrored to `tracing` so console output stays useful while the
//! files remain the system of record.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::clock::{LOG_DATE_FORMAT, LocalClock, TIMESTAMP_FORMAT};
use crate::error::Result;

/// Severity of a log line.
///
/// The tag rendered into the line (`[WARNING]`, ...) is also what the report
/// generator matches against, so the `Display` form is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// The upper-case tag used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only log stream for one named service.
///
/// Cloning is cheap; clones share the same backing file.
#[derive(Clone)]
pub struct ServiceLog {
    inner: Arc<Inner>,
}

struct Inner {
    service: String,
    dir: PathBuf,
    clock: LocalClock,
    stream: Mutex<Option<Stream>>,
}

struct Stream {
    date: NaiveDate,
    file: File,
}

impl ServiceLog {
    /// Open (creating the service directory if needed) the stream for
    /// `service` under `root`.
    pub fn open(root: &Path, service: impl Into<String>, clock: LocalClock) -> Result<Self> {
        let service = service.into();
        let dir = root.join(&service);
        fs::create_dir_all(&dir)?;

        Ok(Self {
            inner: Arc::new(Inner {
                service,
                dir,
                clock,
                stream: Mutex::new(None),
            }),
        })
    }

    /// Name of the service this stream belongs to
    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(Severity::Info, msg.as_ref());
    }

    pub fn warning(&self, msg: impl AsRef<str>) {
        self.log(Severity::Warning, msg.as_ref());
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(Severity::Error, msg.as_ref());
    }

    pub fn critical(&self, msg: impl AsRef<str>) {
        self.log(Severity::Critical, msg.as_ref());
    }

    /// Append one line at the given severity.
    pub fn log(&self, level: Severity, msg: &str) {
        match level {
            Severity::Info => tracing::debug!(service = %self.inner.service, "{msg}"),
            Severity::Warning => tracing::warn!(service = %self.inner.service, "{msg}"),
            Severity::Error | Severity::Critical => {
                tracing::error!(service = %self.inner.service, "{msg}")
            }
        }

        let now = self.inner.clock.now();
        if let Err(e) = self.append(now, level, msg) {
            tracing::error!(
                service = %self.inner.service,
                "failed to append to log stream: {e}"
            );
        }
    }

    /// File the stream writes to on `date`
    pub fn file_for(&self, date: NaiveDate) -> PathBuf {
        self.inner
            .dir
            .join(format!("service.log.{}", date.format(LOG_DATE_FORMAT)))
    }

    fn append(&self, now: DateTime<Tz>, level: Severity, msg: &str) -> std::io::Result<()> {
        let date = now.date_naive();
        let mut guard = self.inner.stream.lock().unwrap_or_else(|p| p.into_inner());

        // Roll to a new file when the local date changed since the last write.
        let stream = match &mut *guard {
            Some(stream) if stream.date == date => stream,
            slot => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.file_for(date))?;
                slot.insert(Stream { date, file })
            }
        };

        writeln!(
            stream.file,
            "[{}] [{}] {}",
            now.format(TIMESTAMP_FORMAT),
            level,
            msg
        )
    }
}

impl fmt::Debug for ServiceLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceLog")
            .field("service", &self.inner.service)
            .field("dir", &self.inner.dir)
            .finish()
    }
}
