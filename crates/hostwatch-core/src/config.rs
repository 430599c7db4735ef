//! Configuration types for the monitoring agent.
//!
//! Everything here is a plain serde record with named fields; defaults match
//! the values the agent has historically run with. Secrets (API token, SMTP
//! credentials) never appear here; they are supplied separately from the
//! environment by the daemon.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::logstore::Severity;

/// Top-level agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// IANA identifier of the host's local time zone
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Root directory holding one subdirectory per service log stream
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub sys: SysConfig,

    #[serde(default)]
    pub disks: DiskConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub email: EmailConfig,
}

impl MonitorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        crate::clock::LocalClock::from_name(&self.timezone)?;
        self.scheduler.validate()?;
        self.dns.validate()?;
        self.report.validate()?;
        self.email.validate()?;
        self.disks.validate()?;
        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            log_root: default_log_root(),
            scheduler: SchedulerConfig::default(),
            dns: DnsConfig::default(),
            sys: SysConfig::default(),
            disks: DiskConfig::default(),
            report: ReportConfig::default(),
            email: EmailConfig::default(),
        }
    }
}

/// Control-loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Fixed tick period of the control loop (seconds)
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// An in-flight task older than this gets a hung-task warning (seconds)
    #[serde(default = "default_hung_task_warn_secs")]
    pub hung_task_warn_secs: u64,
}

impl SchedulerConfig {
    fn validate(&self) -> Result<()> {
        if self.tick_secs == 0 {
            return Err(crate::Error::config("scheduler.tick_secs must be > 0"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            hung_task_warn_secs: default_hung_task_warn_secs(),
        }
    }
}

/// DNS reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Interval between reconciliation cycles (seconds)
    #[serde(default = "default_dns_check_secs")]
    pub check_interval_secs: u64,

    /// A record older than this is re-asserted even without an address
    /// change (seconds)
    #[serde(default = "default_force_refresh_secs")]
    pub force_refresh_secs: u64,

    /// Retry attempts after a failed critical update
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay before each retry (seconds); no backoff
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Path of the persisted `{address, observed_at}` state file
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Ordered address-echo endpoints; first success wins
    #[serde(default = "default_resolver_urls")]
    pub resolver_urls: Vec<String>,

    /// The single managed DNS record
    #[serde(default)]
    pub record: RecordConfig,
}

impl DnsConfig {
    fn validate(&self) -> Result<()> {
        if self.resolver_urls.is_empty() {
            return Err(crate::Error::config(
                "dns.resolver_urls must list at least one address-echo endpoint",
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(crate::Error::config("dns.check_interval_secs must be > 0"));
        }
        if self.max_retries > 10 {
            return Err(crate::Error::config(
                "dns.max_retries must be between 0 and 10",
            ));
        }
        Ok(())
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_dns_check_secs(),
            force_refresh_secs: default_force_refresh_secs(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            state_path: default_state_path(),
            resolver_urls: default_resolver_urls(),
            record: RecordConfig::default(),
        }
    }
}

/// The managed DNS record, addressed zone/record by provider id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    #[serde(default)]
    pub zone_id: String,

    #[serde(default)]
    pub record_id: String,

    /// Fully qualified record name (e.g. "cloud.example.org")
    #[serde(default)]
    pub record_name: String,

    /// Record TTL in seconds; 1 means "automatic" at Cloudflare
    #[serde(default = "default_record_ttl")]
    pub ttl: u32,

    /// Whether the record is proxied through the provider's edge
    #[serde(default = "default_proxied")]
    pub proxied: bool,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            zone_id: String::new(),
            record_id: String::new(),
            record_name: String::new(),
            ttl: default_record_ttl(),
            proxied: default_proxied(),
        }
    }
}

/// System probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SysConfig {
    #[serde(default = "default_sys_check_secs")]
    pub check_interval_secs: u64,

    /// Cadence of the INFO heartbeat line; owned by the probe itself
    #[serde(default = "default_sys_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_ram_percent")]
    pub ram_percent: f32,

    #[serde(default = "default_cpu_percent")]
    pub cpu_percent: f32,

    #[serde(default = "default_cpu_temp")]
    pub cpu_temp_celsius: f32,
}

impl Default for SysConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_sys_check_secs(),
            heartbeat_interval_secs: default_sys_heartbeat_secs(),
            ram_percent: default_ram_percent(),
            cpu_percent: default_cpu_percent(),
            cpu_temp_celsius: default_cpu_temp(),
        }
    }
}

/// Disk probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    #[serde(default = "default_disk_check_secs")]
    pub check_interval_secs: u64,

    /// Usage percentage above which a drive is reported as filling up
    #[serde(default = "default_disk_percent")]
    pub usage_percent: f32,

    #[serde(default)]
    pub drives: Vec<DriveConfig>,
}

impl DiskConfig {
    fn validate(&self) -> Result<()> {
        for drive in &self.drives {
            if drive.name.is_empty() {
                return Err(crate::Error::config("disks.drives[].name must not be empty"));
            }
            if drive.mount.as_os_str().is_empty() {
                return Err(crate::Error::config(format!(
                    "drive '{}' has no mount point",
                    drive.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_disk_check_secs(),
            usage_percent: default_disk_percent(),
            drives: Vec::new(),
        }
    }
}

/// One monitored drive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Display name used in log lines and alerts
    pub name: String,

    /// Mount point the usage reading is taken from
    pub mount: PathBuf,

    #[serde(flatten)]
    pub kind: DriveKind,
}

/// Health-check flavor of a drive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriveKind {
    /// SMART-capable disk, checked via `smartctl -H <device>`
    Smart { device: PathBuf },

    /// SD card, checked with a write test that detects read-only lockup
    SdCard { write_test_file: PathBuf },
}

/// Daily report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_enabled")]
    pub enabled: bool,

    /// Local hour (0-23) at which the previous day's report is sent
    #[serde(default = "default_trigger_hour")]
    pub trigger_hour: u32,

    /// Severities included in the digest
    #[serde(default = "default_report_levels")]
    pub levels: Vec<Severity>,
}

impl ReportConfig {
    fn validate(&self) -> Result<()> {
        if self.trigger_hour > 23 {
            return Err(crate::Error::config(
                "report.trigger_hour must be between 0 and 23",
            ));
        }
        Ok(())
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: default_report_enabled(),
            trigger_hour: default_trigger_hour(),
            levels: default_report_levels(),
        }
    }
}

/// Outbound email settings (credentials are env-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub smtp_server: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub sender: String,

    #[serde(default)]
    pub receiver: String,
}

impl EmailConfig {
    fn validate(&self) -> Result<()> {
        if self.enabled
            && (self.smtp_server.is_empty() || self.sender.is_empty() || self.receiver.is_empty())
        {
            return Err(crate::Error::config(
                "email.smtp_server, email.sender and email.receiver are required when email is enabled",
            ));
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            sender: String::new(),
            receiver: String::new(),
        }
    }
}

fn default_timezone() -> String {
    "Europe/Vienna".to_string()
}

fn default_log_root() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hostwatch.logs")
}

fn default_state_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ip-state.json")
}

fn default_tick_secs() -> u64 {
    10
}

fn default_hung_task_warn_secs() -> u64 {
    1800
}

fn default_dns_check_secs() -> u64 {
    60 * 5
}

fn default_force_refresh_secs() -> u64 {
    60 * 60 * 24
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    30
}

fn default_resolver_urls() -> Vec<String> {
    vec![
        "https://ifconfig.me".to_string(),
        "https://api.ipify.org".to_string(),
    ]
}

fn default_record_ttl() -> u32 {
    1
}

fn default_proxied() -> bool {
    true
}

fn default_sys_check_secs() -> u64 {
    10
}

fn default_sys_heartbeat_secs() -> u64 {
    60 * 60
}

fn default_ram_percent() -> f32 {
    80.0
}

fn default_cpu_percent() -> f32 {
    80.0
}

fn default_cpu_temp() -> f32 {
    75.0
}

fn default_disk_check_secs() -> u64 {
    60 * 60 * 24
}

fn default_disk_percent() -> f32 {
    80.0
}

fn default_report_enabled() -> bool {
    true
}

fn default_trigger_hour() -> u32 {
    1
}

fn default_report_levels() -> Vec<Severity> {
    vec![Severity::Warning, Severity::Error, Severity::Critical]
}

fn default_smtp_port() -> u16 {
    465
}
