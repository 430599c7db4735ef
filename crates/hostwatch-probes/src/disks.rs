//! Storage health probe
//!
//! For every configured drive: a usage reading (WARNING above the
//! threshold), then the health check matching the drive's kind:
//! `smartctl -H` for SMART-capable disks, a write test for SD cards. A
//! failed or inconclusive SD write test means the card may have locked
//! itself read-only, which is unrecoverable in place, so those two outcomes
//! escalate with a CRITICAL log plus alert email.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use hostwatch_core::config::{DiskConfig, DriveConfig, DriveKind};
use hostwatch_core::traits::{Notifier, alert_critical};
use hostwatch_core::{LocalClock, ServiceLog};
use sysinfo::Disks;

/// Timeout for one `smartctl` invocation
const SMARTCTL_TIMEOUT: Duration = Duration::from_secs(10);

/// EROFS: the filesystem went read-only under us
const READ_ONLY_FS: i32 = 30;

/// Outcome of a SMART health check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmartHealth {
    Passed,
    Failed,
    /// smartctl ran but reported neither PASSED nor FAILED
    Unknown,
    Timeout,
    /// smartctl could not be run at all
    Error,
}

/// Outcome of an SD card write test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTest {
    Passed,
    /// The filesystem rejected the write with EROFS
    ReadOnly,
    Error,
}

/// Usage reading for one mount point
#[derive(Debug, Clone, Copy)]
struct DiskUsage {
    percent: f32,
    free_gb: u64,
}

/// The storage health probe
pub struct DiskProbe {
    config: DiskConfig,
    log: ServiceLog,
    notifier: Arc<dyn Notifier>,
    clock: LocalClock,
}

impl DiskProbe {
    pub fn new(
        config: DiskConfig,
        log: ServiceLog,
        notifier: Arc<dyn Notifier>,
        clock: LocalClock,
    ) -> Self {
        Self {
            config,
            log,
            notifier,
            clock,
        }
    }

    /// One probe run over every configured drive.
    pub async fn run(&self) {
        let disks = Disks::new_with_refreshed_list();

        for drive in &self.config.drives {
            self.check_usage(&disks, drive);
            self.check_health(drive).await;
        }
    }

    fn check_usage(&self, disks: &Disks, drive: &DriveConfig) {
        let Some(usage) = usage_for_mount(disks, &drive.mount) else {
            self.log.error(format!(
                "Could not read usage for {} (mount {})",
                drive.name,
                drive.mount.display()
            ));
            return;
        };

        if usage.percent > self.config.usage_percent {
            self.log.warning(format!(
                "DISK FULL: {} is {:.0}% full ({}GB left)",
                drive.name, usage.percent, usage.free_gb
            ));
        } else {
            self.log.info(format!(
                "{} Usage: {:.0}% ({}GB free)",
                drive.name, usage.percent, usage.free_gb
            ));
        }
    }

    async fn check_health(&self, drive: &DriveConfig) {
        match &drive.kind {
            DriveKind::Smart { device } => match smart_health(device).await {
                SmartHealth::Passed => {
                    self.log
                        .info(format!("DRIVE {} passed the SMART test", drive.name));
                }
                SmartHealth::Failed => {
                    self.log.critical(format!(
                        "DRIVE FAILURE IMMINENT: {} ({}) FAILED SMART CHECK!",
                        drive.name,
                        device.display()
                    ));
                }
                SmartHealth::Error => {
                    self.log.error(format!(
                        "SMART ERROR: Could not communicate with {}. Check USB cable.",
                        device.display()
                    ));
                }
                SmartHealth::Timeout => {
                    self.log
                        .error(format!("SMART check timed out for {}", device.display()));
                }
                SmartHealth::Unknown => {
                    self.log.error(format!(
                        "UNKNOWN SMART STATUS: smartctl returned unknown status for {}",
                        device.display()
                    ));
                }
            },
            DriveKind::SdCard { write_test_file } => match write_test(write_test_file) {
                WriteTest::Passed => {
                    self.log
                        .info(format!("SD card {} passed the write test", drive.name));
                }
                WriteTest::ReadOnly => {
                    alert_critical(
                        &self.log,
                        self.notifier.as_ref(),
                        &self.clock,
                        &format!(
                            "SD card {} did not pass the write test. It is now in READ-ONLY mode!",
                            drive.name
                        ),
                        Some(&format!(
                            "SD card {} failed the write test, because it is in READ-ONLY mode!\n\
                             Immediate backup and replacement required.",
                            drive.name
                        )),
                    )
                    .await;
                }
                WriteTest::Error => {
                    alert_critical(
                        &self.log,
                        self.notifier.as_ref(),
                        &self.clock,
                        &format!(
                            "UNKNOWN ERROR while performing write test on {}",
                            drive.name
                        ),
                        Some(&format!(
                            "SD card {} failed the write test with an unknown error.\n\
                             It may be in READ-ONLY mode! Immediate replacement required.",
                            drive.name
                        )),
                    )
                    .await;
                }
            },
        }
    }
}

fn usage_for_mount(disks: &Disks, mount: &Path) -> Option<DiskUsage> {
    let disk = disks.iter().find(|d| d.mount_point() == mount)?;
    Some(usage_from_space(disk.total_space(), disk.available_space()))
}

fn usage_from_space(total: u64, available: u64) -> DiskUsage {
    let percent = if total > 0 {
        (total - available) as f32 / total as f32 * 100.0
    } else {
        0.0
    };
    DiskUsage {
        percent,
        free_gb: available >> 30,
    }
}

/// Run `smartctl -H` on the device and classify its verdict.
///
/// Runs under sudo: the probe itself runs unprivileged, and SMART queries
/// need raw device access.
async fn smart_health(device: &Path) -> SmartHealth {
    let child = tokio::process::Command::new("sudo")
        .args(["smartctl", "-H"])
        .arg(device)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output();

    match tokio::time::timeout(SMARTCTL_TIMEOUT, child).await {
        Ok(Ok(output)) => classify_smart(&String::from_utf8_lossy(&output.stdout)),
        Ok(Err(_)) => SmartHealth::Error,
        Err(_) => SmartHealth::Timeout,
    }
}

fn classify_smart(stdout: &str) -> SmartHealth {
    if stdout.contains("PASSED") {
        SmartHealth::Passed
    } else if stdout.contains("FAILED") {
        SmartHealth::Failed
    } else {
        SmartHealth::Unknown
    }
}

/// Touch-and-unlink write test detecting read-only lockup
fn write_test(path: &Path) -> WriteTest {
    match std::fs::write(path, b"") {
        Ok(()) => match std::fs::remove_file(path) {
            Ok(()) => WriteTest::Passed,
            Err(e) if e.raw_os_error() == Some(READ_ONLY_FS) => WriteTest::ReadOnly,
            Err(_) => WriteTest::Error,
        },
        Err(e) if e.raw_os_error() == Some(READ_ONLY_FS) => WriteTest::ReadOnly,
        Err(_) => WriteTest::Error,
    }
}
