//! Fixed-tick task scheduler
//!
//! One control loop drives every periodic task from a single tick:
//!
//! - A task fires when `now - last_fired_at > interval`, with
//!   `last_fired_at` recorded at dispatch time. Measured intervals are
//!   therefore "at least `interval`", never "exactly `interval`".
//! - Each fired body runs on its own tokio task; the loop never awaits a
//!   body, so a slow probe cannot stall the tick or other tasks.
//! - Per-task-name overlap guard: while a run is in flight, a due tick is
//!   skipped with a warning, never queued. The scheduler keeps the
//!   `JoinHandle` of every in-flight run; a finished handle frees the slot
//!   on the next tick (so a panicking body cannot wedge its task name), and
//!   a run older than the hung-task bound is warned about once.
//! - The daily report has its own level-triggered check against the local
//!   calendar: it fires when the local hour equals the trigger hour and the
//!   day differs from the marker, which tolerates slow loops as long as the
//!   trigger hour is observed at least once that day.
//!
//! There is no graceful shutdown: bodies are fire-and-forget and the loop
//! runs for the life of the process.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Days, NaiveDate, Timelike};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::clock::LocalClock;
use crate::config::SchedulerConfig;
use crate::error::{Error, Result};
use crate::logstore::ServiceLog;
use crate::traits::Notifier;

/// Boxed future returned by task bodies
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A zero-argument task body. Bodies own their failure handling; nothing
/// they do reaches the control loop.
pub type TaskBody = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Body of the daily report task; receives the local day to report on
pub type ReportBody = Arc<dyn Fn(NaiveDate) -> TaskFuture + Send + Sync>;

/// A registered periodic task
pub struct Task {
    pub name: &'static str,
    pub interval: Duration,
    pub body: TaskBody,
}

impl Task {
    pub fn new<F>(name: &'static str, interval: Duration, body: F) -> Self
    where
        F: Fn() -> TaskFuture + Send + Sync + 'static,
    {
        Self {
            name,
            interval,
            body: Arc::new(body),
        }
    }
}

struct Inflight {
    handle: JoinHandle<()>,
    since: Instant,
}

struct TaskEntry {
    task: Task,
    last_fired: Option<Instant>,
    inflight: Option<Inflight>,
    hung_warned: bool,
}

struct DailyReport {
    trigger_hour: u32,
    /// Last local day the report was dispatched for (the marker)
    last_day: Option<NaiveDate>,
    body: ReportBody,
    inflight: Option<Inflight>,
}

/// The control loop
pub struct Scheduler {
    clock: LocalClock,
    log: ServiceLog,
    notifier: Arc<dyn Notifier>,
    log_root: PathBuf,
    tick_period: Duration,
    hung_warn_after: Duration,
    tasks: Vec<TaskEntry>,
    daily: Option<DailyReport>,
}

impl Scheduler {
    pub fn new(
        config: &SchedulerConfig,
        log_root: PathBuf,
        clock: LocalClock,
        log: ServiceLog,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            log,
            notifier,
            log_root,
            tick_period: Duration::from_secs(config.tick_secs),
            hung_warn_after: Duration::from_secs(config.hung_task_warn_secs),
            tasks: Vec::new(),
            daily: None,
        }
    }

    /// Register a periodic task. All tasks are due immediately after
    /// startup: schedule state does not survive restarts.
    pub fn register(&mut self, task: Task) {
        self.tasks.push(TaskEntry {
            task,
            last_fired: None,
            inflight: None,
            hung_warned: false,
        });
    }

    /// Install the once-per-day report trigger
    pub fn set_daily_report(&mut self, trigger_hour: u32, body: ReportBody) {
        self.daily = Some(DailyReport {
            trigger_hour,
            last_day: None,
            body,
            inflight: None,
        });
    }

    /// Run the control loop forever.
    ///
    /// Returns an error only for the startup log-root failure; the process
    /// must not run with an unwritable log target.
    pub async fn run(mut self) -> Result<()> {
        if let Err(e) = std::fs::create_dir_all(&self.log_root) {
            let msg = format!(
                "Cannot create log root {}: {e}. Refusing to run without a writable log target.",
                self.log_root.display()
            );
            let _ = self.notifier.send("Monitor startup failed", &msg).await;
            return Err(Error::config(msg));
        }

        // Best-effort: the monitor must come up even if email is down.
        if let Err(e) = self
            .notifier
            .send("Monitor started", "The host monitor is up and all tasks are scheduled.")
            .await
        {
            self.log.warning(format!("Startup notification failed: {e}"));
        }

        self.log.info("Main monitor loop started");

        loop {
            self.tick(Instant::now(), self.clock.now());
            tokio::time::sleep(self.tick_period).await;
        }
    }

    /// One pass over the task table and the daily trigger.
    ///
    /// Split out from [`run`] so tests can drive the loop with synthetic
    /// instants and local times.
    pub fn tick(&mut self, now: Instant, local: DateTime<Tz>) {
        let log = self.log.clone();

        for entry in &mut self.tasks {
            // Reap finished runs first so a completed body frees its slot
            // within the same tick.
            if entry
                .inflight
                .as_ref()
                .is_some_and(|run| run.handle.is_finished())
            {
                entry.inflight = None;
                entry.hung_warned = false;
            }

            let due = entry
                .last_fired
                .is_none_or(|fired| now.duration_since(fired) > entry.task.interval);
            if !due {
                continue;
            }

            if let Some(run) = &entry.inflight {
                // Overlap guard: skip, never queue. The next opportunity is
                // one interval after this one.
                log.warning(format!(
                    "Skipping task '{}': previous run still in flight",
                    entry.task.name
                ));
                if !entry.hung_warned && now.duration_since(run.since) > self.hung_warn_after {
                    entry.hung_warned = true;
                    log.warning(format!(
                        "Task '{}' has been in flight for {}s; it may be hung and will \
                         never be dispatched again until it returns",
                        entry.task.name,
                        now.duration_since(run.since).as_secs()
                    ));
                }
                continue;
            }

            entry.last_fired = Some(now);
            let handle = tokio::spawn((entry.task.body)());
            entry.inflight = Some(Inflight { handle, since: now });
        }

        if let Some(daily) = &mut self.daily {
            if daily
                .inflight
                .as_ref()
                .is_some_and(|run| run.handle.is_finished())
            {
                daily.inflight = None;
            }

            let today = local.date_naive();
            if local.hour() == daily.trigger_hour && daily.last_day != Some(today) {
                // Report on the previous local day; marker moves at dispatch
                // so the report fires at most once per day.
                let report_day = today
                    .checked_sub_days(Days::new(1))
                    .unwrap_or(today);
                log.info(format!("Dispatching daily report for {report_day}"));
                let handle = tokio::spawn((daily.body)(report_day));
                daily.inflight = Some(Inflight { handle, since: now });
                daily.last_day = Some(today);
            }
        }
    }
}
