// # hostwatchd - Host Monitoring Daemon
//
// Thin integration layer: reads configuration, wires the components from
// the library crates together, registers the periodic tasks and hands
// control to the scheduler. All monitoring and reconciliation logic lives
// in hostwatch-core.
//
// ## Configuration
//
// Structured configuration comes from an optional JSON file; secrets come
// from the environment only and never live in the file:
//
// - `HOSTWATCH_CONFIG`: path to the JSON configuration file. Unset means
//   built-in defaults for every field.
// - `HOSTWATCH_LOG_LEVEL`: trace | debug | info | warn | error (default info)
// - `HOSTWATCH_CLOUDFLARE_TOKEN`: API token with Zone:DNS:Edit permission
// - `HOSTWATCH_SMTP_USERNAME` / `HOSTWATCH_SMTP_PASSWORD`: SMTP credentials,
//   required only when email is enabled
//
// ## Example
//
// ```bash
// export HOSTWATCH_CONFIG=/etc/hostwatch/config.json
// export HOSTWATCH_CLOUDFLARE_TOKEN=your_token
// export HOSTWATCH_SMTP_USERNAME=agent@example.org
// export HOSTWATCH_SMTP_PASSWORD=app_password
//
// hostwatchd
// ```

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hostwatch_core::scheduler::TaskFuture;
use hostwatch_core::traits::DiscardNotifier;
use hostwatch_core::{
    FileStateStore, LocalClock, MonitorConfig, Notifier, Reconciler, Scheduler, ServiceLog, Task,
    report,
};
use hostwatch_ip_http::HttpAddressResolver;
use hostwatch_notify_smtp::SmtpNotifier;
use hostwatch_probes::{DiskProbe, SysProbe};
use hostwatch_provider_cloudflare::CloudflareUpdater;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes following systemd conventions
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Environment-supplied settings: log level plus every secret
struct EnvSettings {
    log_level: String,
    cloudflare_token: String,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
}

impl EnvSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: env::var("HOSTWATCH_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            cloudflare_token: env::var("HOSTWATCH_CLOUDFLARE_TOKEN").context(
                "HOSTWATCH_CLOUDFLARE_TOKEN is required. \
                 Set it via: export HOSTWATCH_CLOUDFLARE_TOKEN=your_token",
            )?,
            smtp_username: env::var("HOSTWATCH_SMTP_USERNAME").ok(),
            smtp_password: env::var("HOSTWATCH_SMTP_PASSWORD").ok(),
        })
    }

    fn validate(&self, config: &MonitorConfig) -> Result<()> {
        if self.cloudflare_token.len() < 20 {
            anyhow::bail!(
                "HOSTWATCH_CLOUDFLARE_TOKEN appears too short ({} chars). \
                 Cloudflare tokens are typically 40 characters.",
                self.cloudflare_token.len()
            );
        }

        if config.email.enabled && (self.smtp_username.is_none() || self.smtp_password.is_none()) {
            anyhow::bail!(
                "HOSTWATCH_SMTP_USERNAME and HOSTWATCH_SMTP_PASSWORD are required \
                 when email is enabled"
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => anyhow::bail!(
                "HOSTWATCH_LOG_LEVEL '{other}' is not valid. \
                 Valid levels: trace, debug, info, warn, error"
            ),
        }
    }
}

fn load_config() -> Result<MonitorConfig> {
    let config = match env::var_os("HOSTWATCH_CONFIG") {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => MonitorConfig::default(),
    };

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> ExitCode {
    let env_settings = match EnvSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return DaemonExitCode::ConfigError.into();
        }
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return DaemonExitCode::ConfigError.into();
        }
    };

    if let Err(e) = env_settings.validate(&config) {
        eprintln!("Configuration validation error: {e:#}");
        return DaemonExitCode::ConfigError.into();
    }

    let log_level = match env_settings.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting hostwatchd");

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config, env_settings).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Daemon error: {e:#}");
                DaemonExitCode::RuntimeError.into()
            }
        }
    })
}

/// Wire components together and run the control loop
async fn run_daemon(config: MonitorConfig, env_settings: EnvSettings) -> Result<()> {
    let clock = LocalClock::from_name(&config.timezone)?;

    // The process must not run with an unwritable log target.
    std::fs::create_dir_all(&config.log_root).with_context(|| {
        format!("cannot create log root {}", config.log_root.display())
    })?;

    let main_log = ServiceLog::open(&config.log_root, "main", clock)?;
    let dns_log = ServiceLog::open(&config.log_root, "dns", clock)?;
    let sys_log = ServiceLog::open(&config.log_root, "sys", clock)?;
    let disks_log = ServiceLog::open(&config.log_root, "disks", clock)?;
    let email_log = ServiceLog::open(&config.log_root, "email", clock)?;

    let notifier: Arc<dyn Notifier> = if config.email.enabled {
        info!("Email notifications enabled via {}", config.email.smtp_server);
        Arc::new(SmtpNotifier::new(
            &config.email,
            env_settings.smtp_username.unwrap_or_default(),
            env_settings.smtp_password.unwrap_or_default(),
            email_log,
        )?)
    } else {
        info!("Email notifications disabled");
        Arc::new(DiscardNotifier)
    };

    let reconciler = Arc::new(Reconciler::new(
        Box::new(HttpAddressResolver::new(
            config.dns.resolver_urls.clone(),
            dns_log.clone(),
        )),
        Box::new(CloudflareUpdater::new(
            env_settings.cloudflare_token,
            config.dns.record.clone(),
            dns_log.clone(),
        )?),
        Box::new(FileStateStore::new(&config.dns.state_path, dns_log.clone())),
        Arc::clone(&notifier),
        clock,
        dns_log,
        &config.dns,
    ));

    let sys_probe = Arc::new(SysProbe::new(config.sys.clone(), sys_log));
    let disk_probe = Arc::new(DiskProbe::new(
        config.disks.clone(),
        disks_log,
        Arc::clone(&notifier),
        clock,
    ));

    let mut scheduler = Scheduler::new(
        &config.scheduler,
        config.log_root.clone(),
        clock,
        main_log.clone(),
        Arc::clone(&notifier),
    );

    scheduler.register(Task::new(
        "dns",
        Duration::from_secs(config.dns.check_interval_secs),
        move || {
            let reconciler = Arc::clone(&reconciler);
            Box::pin(async move {
                reconciler.run_cycle().await;
            }) as TaskFuture
        },
    ));

    scheduler.register(Task::new(
        "sys",
        Duration::from_secs(config.sys.check_interval_secs),
        move || {
            let probe = Arc::clone(&sys_probe);
            Box::pin(async move {
                probe.run().await;
            }) as TaskFuture
        },
    ));

    scheduler.register(Task::new(
        "disks",
        Duration::from_secs(config.disks.check_interval_secs),
        move || {
            let probe = Arc::clone(&disk_probe);
            Box::pin(async move {
                probe.run().await;
            }) as TaskFuture
        },
    ));

    if config.report.enabled {
        let log_root = config.log_root.clone();
        let levels = config.report.levels.clone();
        let report_notifier = Arc::clone(&notifier);
        let report_log = main_log;
        scheduler.set_daily_report(
            config.report.trigger_hour,
            Arc::new(move |day: NaiveDate| {
                let log_root = log_root.clone();
                let levels = levels.clone();
                let notifier = Arc::clone(&report_notifier);
                let log = report_log.clone();
                Box::pin(async move {
                    let digest = report::build_report(&log_root, day, &levels);
                    let subject = format!("Host report for {}", day.format("%d.%m.%Y"));
                    if let Err(e) = notifier.send(&subject, &digest).await {
                        log.error(format!("Failed to send daily report: {e}"));
                    }
                }) as TaskFuture
            }),
        );
    }

    info!(
        "All tasks registered (dns every {}s, sys every {}s, disks every {}s)",
        config.dns.check_interval_secs,
        config.sys.check_interval_secs,
        config.disks.check_interval_secs
    );

    scheduler.run().await?;
    Ok(())
}
