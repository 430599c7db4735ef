//! System resource probe
//!
//! Samples CPU usage, RAM usage, CPU temperature and clock speed, plus the
//! firmware throttle bitmask (`vcgencmd get_throttled`), then walks a
//! severity ladder:
//!
//! 1. Under-voltage right now → CRITICAL, and nothing else is evaluated
//! 2. Throttled / frequency-capped / soft temperature limit → one WARNING
//! 3. RAM, CPU or temperature over threshold → WARNING
//! 4. Heartbeat window elapsed → INFO line with the full reading
//!
//! The heartbeat cadence is owned here, not by the scheduler, so the task
//! body stays zero-argument.

use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use hostwatch_core::config::SysConfig;
use hostwatch_core::{ServiceLog, Severity};
use sysinfo::{Components, System};

/// Timeout for one `vcgencmd` invocation
const VCGENCMD_TIMEOUT: Duration = Duration::from_secs(5);

/// Thermal sensor labels checked in order, Raspberry Pi first
const CPU_SENSOR_LABELS: &[&str] = &["cpu_thermal", "soc_thermal", "bcm2835_thermal"];

/// Decoded `get_throttled` bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleStatus {
    /// Under-voltage right now
    pub undervolt: bool,
    /// Actively throttled right now
    pub throttled: bool,
    /// ARM frequency capped by firmware right now
    pub capped: bool,
    /// Soft temperature limit active right now
    pub soft_limit: bool,
    /// Under-voltage happened since boot
    pub had_undervolt: bool,
    /// Throttling happened since boot
    pub had_throttle: bool,
}

impl ThrottleStatus {
    /// Decode the firmware bitmask
    pub fn from_bitmask(bits: u32) -> Self {
        Self {
            undervolt: bits & 0x1 != 0,
            capped: bits & 0x2 != 0,
            throttled: bits & 0x4 != 0,
            soft_limit: bits & 0x8 != 0,
            had_undervolt: bits & 0x1_0000 != 0,
            had_throttle: bits & 0x4_0000 != 0,
        }
    }
}

/// One sampled set of readings
#[derive(Debug, Clone)]
struct Readings {
    cpu_percent: f32,
    ram_percent: f32,
    temp_celsius: Option<f32>,
    clock_mhz: u64,
    throttle: Option<ThrottleStatus>,
}

impl Readings {
    fn summary(&self) -> String {
        let temp = match self.temp_celsius {
            Some(t) => format!("{t:.1}°C"),
            None => "n/a".to_string(),
        };
        format!(
            "CPU: {:.1}% @ {}MHz | RAM: {:.1}% | Temp: {}",
            self.cpu_percent, self.clock_mhz, self.ram_percent, temp
        )
    }
}

/// The system resource probe
pub struct SysProbe {
    config: SysConfig,
    log: ServiceLog,
    // Kept across runs so CPU usage is measured since the previous sample
    system: Mutex<System>,
    last_heartbeat: Mutex<Option<Instant>>,
}

impl SysProbe {
    pub fn new(config: SysConfig, log: ServiceLog) -> Self {
        Self {
            config,
            log,
            system: Mutex::new(System::new()),
            last_heartbeat: Mutex::new(None),
        }
    }

    /// One probe run: sample, classify, log.
    pub async fn run(&self) {
        let throttle = read_throttle_status().await;
        let clock_mhz = read_clock_mhz().await;
        let readings = {
            let mut system = self.system.lock().unwrap_or_else(|p| p.into_inner());
            system.refresh_memory();
            system.refresh_cpu_usage();

            let ram_percent = if system.total_memory() > 0 {
                system.used_memory() as f32 / system.total_memory() as f32 * 100.0
            } else {
                0.0
            };

            Readings {
                cpu_percent: system.global_cpu_usage(),
                ram_percent,
                temp_celsius: read_cpu_temp(),
                clock_mhz,
                throttle,
            }
        };

        let heartbeat = self.heartbeat_due();
        for (level, line) in evaluate(&readings, &self.config, heartbeat) {
            self.log.log(level, &line);
        }
    }

    fn heartbeat_due(&self) -> bool {
        let interval = Duration::from_secs(self.config.heartbeat_interval_secs);
        let mut last = self.last_heartbeat.lock().unwrap_or_else(|p| p.into_inner());
        let due = last.is_none_or(|at| at.elapsed() > interval);
        if due {
            *last = Some(Instant::now());
        }
        due
    }
}

/// Severity ladder over one set of readings
fn evaluate(readings: &Readings, config: &SysConfig, heartbeat: bool) -> Vec<(Severity, String)> {
    let msg = readings.summary();
    let mut lines = Vec::new();

    let Some(status) = readings.throttle else {
        lines.push((
            Severity::Error,
            format!("Failed to get hardware status. {msg}"),
        ));
        return lines;
    };

    // Immediate hardware risk trumps everything else.
    if status.undervolt {
        lines.push((
            Severity::Critical,
            format!("POWER CRITICAL: Under-voltage detected! {msg}"),
        ));
        return lines;
    }

    if status.throttled {
        lines.push((
            Severity::Warning,
            format!("THERMAL THROTTLE: CPU speed is being forced down! {msg}"),
        ));
    } else if status.capped {
        lines.push((
            Severity::Warning,
            format!("PERFORMANCE CAPPED: ARM frequency limited by firmware. {msg}"),
        ));
    } else if status.soft_limit {
        lines.push((
            Severity::Warning,
            format!("SOFT LIMIT REACHED: Temperature high, slight throttling active. {msg}"),
        ));
    }

    let over_temp = readings
        .temp_celsius
        .is_some_and(|t| t > config.cpu_temp_celsius);
    if readings.ram_percent > config.ram_percent
        || readings.cpu_percent > config.cpu_percent
        || over_temp
    {
        lines.push((
            Severity::Warning,
            format!("RESOURCE ALERT: Threshold exceeded. {msg}"),
        ));
    }

    if heartbeat {
        lines.push((Severity::Info, format!("Heartbeat: {msg}")));
    }

    lines
}

fn read_cpu_temp() -> Option<f32> {
    let components = Components::new_with_refreshed_list();
    for label in CPU_SENSOR_LABELS {
        if let Some(component) = components
            .iter()
            .find(|c| c.label().contains(label))
        {
            return component.temperature();
        }
    }
    None
}

async fn read_throttle_status() -> Option<ThrottleStatus> {
    let raw = run_vcgencmd(&["get_throttled"]).await?;
    parse_vcgencmd_value(&raw)
        .and_then(|v| u32::from_str_radix(v.trim_start_matches("0x"), 16).ok())
        .map(ThrottleStatus::from_bitmask)
}

async fn read_clock_mhz() -> u64 {
    let Some(raw) = run_vcgencmd(&["measure_clock", "arm"]).await else {
        return 0;
    };
    parse_vcgencmd_value(&raw)
        .and_then(|v| v.parse::<u64>().ok())
        .map(|hz| hz / 1_000_000)
        .unwrap_or(0)
}

async fn run_vcgencmd(args: &[&str]) -> Option<String> {
    let child = tokio::process::Command::new("vcgencmd")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output();

    match tokio::time::timeout(VCGENCMD_TIMEOUT, child).await {
        Ok(Ok(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        _ => None,
    }
}

/// Extract the value from `key=value` vcgencmd output
fn parse_vcgencmd_value(raw: &str) -> Option<&str> {
    raw.split('=').nth(1).map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(throttle: Option<ThrottleStatus>) -> Readings {
        Readings {
            cpu_percent: 12.5,
            ram_percent: 43.0,
            temp_celsius: Some(51.2),
            clock_mhz: 1500,
            throttle,
        }
    }

    fn nominal() -> ThrottleStatus {
        ThrottleStatus::from_bitmask(0)
    }

    #[test]
    fn bitmask_decodes_current_and_historical_bits() {
        let status = ThrottleStatus::from_bitmask(0x5_0005);
        assert!(status.undervolt);
        assert!(status.throttled);
        assert!(!status.capped);
        assert!(!status.soft_limit);
        assert!(status.had_undervolt);
        assert!(status.had_throttle);

        let clean = ThrottleStatus::from_bitmask(0x0);
        assert_eq!(
            clean,
            ThrottleStatus {
                undervolt: false,
                throttled: false,
                capped: false,
                soft_limit: false,
                had_undervolt: false,
                had_throttle: false,
            }
        );
    }

    #[test]
    fn vcgencmd_output_parses() {
        assert_eq!(parse_vcgencmd_value("throttled=0x50000\n"), Some("0x50000"));
        assert_eq!(
            parse_vcgencmd_value("frequency(48)=1500345728\n"),
            Some("1500345728")
        );
        assert_eq!(parse_vcgencmd_value("garbage"), None);
    }

    #[test]
    fn missing_hardware_status_is_a_single_error() {
        let lines = evaluate(&readings(None), &SysConfig::default(), false);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Severity::Error);
        assert!(lines[0].1.contains("Failed to get hardware status"));
    }

    #[test]
    fn undervolt_is_critical_and_stops_evaluation() {
        let mut status = nominal();
        status.undervolt = true;
        status.throttled = true; // would otherwise warn too

        let lines = evaluate(&readings(Some(status)), &SysConfig::default(), true);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Severity::Critical);
        assert!(lines[0].1.contains("POWER CRITICAL"));
    }

    #[test]
    fn throttle_states_warn_first_match_only() {
        let mut status = nominal();
        status.capped = true;
        status.soft_limit = true;

        let lines = evaluate(&readings(Some(status)), &SysConfig::default(), false);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.contains("PERFORMANCE CAPPED"));
    }

    #[test]
    fn threshold_breach_warns() {
        let mut r = readings(Some(nominal()));
        r.ram_percent = 93.0;

        let lines = evaluate(&r, &SysConfig::default(), false);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Severity::Warning);
        assert!(lines[0].1.contains("RESOURCE ALERT"));
    }

    #[test]
    fn quiet_reading_with_heartbeat_logs_one_info_line() {
        let lines = evaluate(&readings(Some(nominal())), &SysConfig::default(), true);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, Severity::Info);
        assert!(lines[0].1.contains("Heartbeat"));
    }

    #[test]
    fn quiet_reading_without_heartbeat_is_silent() {
        let lines = evaluate(&readings(Some(nominal())), &SysConfig::default(), false);
        assert!(lines.is_empty());
    }
}
