//! Contract tests for the scheduler's control loop
//!
//! The tick is driven directly with synthetic instants and local times, so
//! these tests pin the dispatch rules without real sleeping: the overlap
//! guard, dispatch-time interval bookkeeping, slot reaping, panic
//! containment and the once-per-day report trigger.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Europe::Vienna;
use chrono_tz::Tz;
use common::*;
use hostwatch_core::config::SchedulerConfig;
use hostwatch_core::scheduler::{Scheduler, Task, TaskFuture};
use tempfile::TempDir;

fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
    Vienna.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

fn scheduler(dir: &TempDir) -> Scheduler {
    Scheduler::new(
        &SchedulerConfig {
            tick_secs: 10,
            hung_task_warn_secs: 1800,
        },
        PathBuf::from(dir.path()),
        test_clock(),
        test_log(dir.path(), "main"),
        Arc::new(RecordingNotifier::new()),
    )
}

/// Let spawned task bodies make progress under the paused runtime
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn same_task_never_runs_twice_concurrently() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler(&dir);

    let started = Arc::new(AtomicUsize::new(0));
    let in_body = Arc::new(AtomicUsize::new(0));
    let max_in_body = Arc::new(AtomicUsize::new(0));

    let (s, b, m) = (started.clone(), in_body.clone(), max_in_body.clone());
    sched.register(Task::new("slow", Duration::from_secs(60), move || {
        let (s, b, m) = (s.clone(), b.clone(), m.clone());
        Box::pin(async move {
            s.fetch_add(1, Ordering::SeqCst);
            let concurrent = b.fetch_add(1, Ordering::SeqCst) + 1;
            m.fetch_max(concurrent, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1000)).await;
            b.fetch_sub(1, Ordering::SeqCst);
        }) as TaskFuture
    }));

    let t0 = Instant::now();
    let now = local(2026, 3, 14, 12, 0);

    sched.tick(t0, now);
    settle().await;

    // Two more due ticks while the first run is still in flight: both
    // skipped, never queued.
    sched.tick(t0 + Duration::from_secs(61), now);
    sched.tick(t0 + Duration::from_secs(122), now);
    settle().await;

    assert_eq!(started.load(Ordering::SeqCst), 1);

    // Let the body finish; the freed slot dispatches again.
    tokio::time::advance(Duration::from_secs(1000)).await;
    settle().await;
    sched.tick(t0 + Duration::from_secs(183), now);
    settle().await;

    assert_eq!(started.load(Ordering::SeqCst), 2);
    assert_eq!(max_in_body.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn skipped_dispatch_is_logged() {
    let dir = TempDir::new().unwrap();
    let log = test_log(dir.path(), "main");
    let mut sched = Scheduler::new(
        &SchedulerConfig {
            tick_secs: 10,
            hung_task_warn_secs: 1800,
        },
        PathBuf::from(dir.path()),
        test_clock(),
        log.clone(),
        Arc::new(RecordingNotifier::new()),
    );

    sched.register(Task::new("slow", Duration::from_secs(60), || {
        Box::pin(async {
            tokio::time::sleep(Duration::from_secs(1000)).await;
        }) as TaskFuture
    }));

    let t0 = Instant::now();
    let now = local(2026, 3, 14, 12, 0);
    sched.tick(t0, now);
    settle().await;
    sched.tick(t0 + Duration::from_secs(61), now);

    let today = test_clock().now().date_naive();
    let content = std::fs::read_to_string(log.file_for(today)).unwrap();
    assert!(content.contains("[WARNING] Skipping task 'slow'"));
}

#[tokio::test(start_paused = true)]
async fn tasks_fire_immediately_on_first_tick_and_respect_interval() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler(&dir);

    let runs = Arc::new(AtomicUsize::new(0));
    let r = runs.clone();
    sched.register(Task::new("fast", Duration::from_secs(60), move || {
        let r = r.clone();
        Box::pin(async move {
            r.fetch_add(1, Ordering::SeqCst);
        }) as TaskFuture
    }));

    let t0 = Instant::now();
    let now = local(2026, 3, 14, 12, 0);

    // Never-fired tasks are due on the very first tick after startup.
    sched.tick(t0, now);
    settle().await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Not due yet: the interval is measured from dispatch time.
    sched.tick(t0 + Duration::from_secs(30), now);
    settle().await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    sched.tick(t0 + Duration::from_secs(61), now);
    settle().await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn panicking_body_does_not_wedge_its_task_name() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler(&dir);

    let runs = Arc::new(AtomicUsize::new(0));
    let r = runs.clone();
    sched.register(Task::new("flaky", Duration::from_secs(60), move || {
        let r = r.clone();
        Box::pin(async move {
            r.fetch_add(1, Ordering::SeqCst);
            panic!("probe blew up");
            #[allow(unreachable_code)]
            ()
        }) as TaskFuture
    }));

    let t0 = Instant::now();
    let now = local(2026, 3, 14, 12, 0);
    sched.tick(t0, now);
    settle().await;

    // The finished (panicked) handle frees the slot; the task keeps its
    // schedule.
    sched.tick(t0 + Duration::from_secs(61), now);
    settle().await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn daily_report_fires_once_per_day_in_the_trigger_hour() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler(&dir);

    let days: Arc<std::sync::Mutex<Vec<NaiveDate>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let d = days.clone();
    sched.set_daily_report(
        1,
        Arc::new(move |day| {
            let d = d.clone();
            Box::pin(async move {
                d.lock().unwrap().push(day);
            }) as TaskFuture
        }),
    );

    let t0 = Instant::now();
    let mut t = t0;
    // Two simulated days of ticks, coarse outside the trigger hour and
    // repeated inside it.
    let ticks = [
        local(2026, 3, 14, 0, 50),
        local(2026, 3, 14, 1, 0),  // fires for 2026-03-13
        local(2026, 3, 14, 1, 10), // same hour, same day: no refire
        local(2026, 3, 14, 1, 59),
        local(2026, 3, 14, 2, 0),
        local(2026, 3, 14, 23, 50),
        local(2026, 3, 15, 1, 30), // fires for 2026-03-14
        local(2026, 3, 15, 1, 45),
        local(2026, 3, 15, 2, 10),
    ];
    for now in ticks {
        sched.tick(t, now);
        settle().await;
        t += Duration::from_secs(10);
    }

    let days = days.lock().unwrap();
    assert_eq!(
        *days,
        vec![
            NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn report_missed_in_the_exact_minute_still_fires_within_the_hour() {
    let dir = TempDir::new().unwrap();
    let mut sched = scheduler(&dir);

    let fired = Arc::new(AtomicUsize::new(0));
    let f = fired.clone();
    sched.set_daily_report(
        1,
        Arc::new(move |_| {
            let f = f.clone();
            Box::pin(async move {
                f.fetch_add(1, Ordering::SeqCst);
            }) as TaskFuture
        }),
    );

    // A slow loop that only observes 01:58 of the trigger hour: the check
    // is level-triggered, so it still fires exactly once.
    let t0 = Instant::now();
    sched.tick(t0, local(2026, 3, 14, 0, 10));
    settle().await;
    sched.tick(t0 + Duration::from_secs(10), local(2026, 3, 14, 1, 58));
    settle().await;
    sched.tick(t0 + Duration::from_secs(20), local(2026, 3, 14, 3, 0));
    settle().await;

    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
