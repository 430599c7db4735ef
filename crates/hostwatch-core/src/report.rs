//! Daily digest built from the per-service log streams.
//!
//! Scans every service directory under the log root for that day's stream
//! file and keeps the lines whose severity tag is in the requested set.
//! Pure text filtering; the only state involved is the files on disk.

use std::path::Path;

use chrono::NaiveDate;

use crate::clock::LOG_DATE_FORMAT;
use crate::logstore::Severity;

/// Build the digest for one local day.
///
/// Matching lines are prefixed with their upper-cased service name. Days
/// with no log files at all and days where everything was below the
/// reported severities get their own messages so the report is never empty.
pub fn build_report(log_root: &Path, date: NaiveDate, levels: &[Severity]) -> String {
    let date_str = date.format(LOG_DATE_FORMAT).to_string();
    let level_names: Vec<&str> = levels.iter().map(Severity::as_str).collect();

    let mut services_logged: Vec<String> = Vec::new();
    let mut report_lines: Vec<String> = Vec::new();

    let mut service_dirs: Vec<_> = match std::fs::read_dir(log_root) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .collect(),
        Err(_) => Vec::new(),
    };
    service_dirs.sort_by_key(|e| e.file_name());

    for dir in service_dirs {
        let service_name = dir.file_name().to_string_lossy().into_owned();
        let log_file = dir.path().join(format!("service.log.{date_str}"));

        let Ok(raw) = std::fs::read(&log_file) else {
            continue;
        };
        services_logged.push(service_name.clone());

        for line in String::from_utf8_lossy(&raw).lines() {
            if level_names
                .iter()
                .any(|level| line.contains(&format!("[{level}]")))
            {
                report_lines.push(format!("[{}] {}", service_name.to_uppercase(), line.trim()));
            }
        }
    }

    if services_logged.is_empty() {
        return format!("No log files found for {date_str}.");
    }

    if report_lines.is_empty() {
        return format!(
            "All systems nominal for {date_str}. No issues detected. \
             Read log files for services: {services_logged:?}. \
             Reporting log levels: {level_names:?}"
        );
    }

    format!(
        "Report for {date_str}, including services {services_logged:?} and log levels {level_names:?}\n\n\n{}",
        report_lines.join("\n")
    )
}
