// # hostwatch-probes
//
// Stateless probe-and-log task bodies for the scheduler: resource health
// (CPU, RAM, temperature, firmware throttle flags) and storage health
// (usage, SMART, SD write test).
//
// Probes read, classify, and log. They never decide scheduling, never
// retry, and the only state any of them keeps is the system probe's own
// heartbeat cadence.

pub mod disks;
pub mod sys;

pub use disks::{DiskProbe, SmartHealth, WriteTest};
pub use sys::{SysProbe, ThrottleStatus};
