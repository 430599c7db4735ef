// # hostwatch-core
//
// Core library for the host monitoring agent.
//
// ## Architecture Overview
//
// Two components carry all of the state and failure-handling semantics:
//
// - **Scheduler**: one fixed-tick control loop driving every periodic task,
//   with a per-task-name overlap guard and the once-per-day report trigger.
// - **Reconciler**: the dynamic-DNS state machine: resolve the public
//   address, compare against persisted state, update the provider when
//   needed, walk a bounded retry ladder, escalate to a human on exhaustion.
//
// Everything else the scheduler dispatches (system probe, disk probe,
// report sender) is a stateless probe-and-log body behind a [`Task`].
//
// ## Design Principles
//
// 1. **Explicit collaborators**: resolvers, updaters, stores, notifiers and
//    log handles are passed at construction, not pulled from globals.
// 2. **Contained failure**: nothing a task body does reaches the control
//    loop; the only fatal error is an unwritable log root at startup.
// 3. **Self-healing state**: corrupt or missing persisted state degrades to
//    "never updated", which costs one redundant provider call and nothing
//    else.

pub mod clock;
pub mod config;
pub mod error;
pub mod logstore;
pub mod reconciler;
pub mod report;
pub mod scheduler;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use clock::LocalClock;
pub use config::{DnsConfig, MonitorConfig, SchedulerConfig};
pub use error::{Error, Result};
pub use logstore::{Severity, ServiceLog};
pub use reconciler::{CycleOutcome, Reconciler};
pub use scheduler::{Scheduler, Task};
pub use state::{DnsState, FileStateStore, MemoryStateStore};
pub use traits::{AddressResolver, Notifier, RecordUpdater, StateStore};
