// # Notifier Trait
//
// Defines the interface for delivering human-facing messages (alerts and
// daily reports).
//
// ## Implementations
//
// - SMTP email: `hostwatch-notify-smtp` crate
//
// Delivery failures are an outcome, not an exception: callers log them and
// carry on. Nothing in the agent ever aborts because an email did not go
// out.

use async_trait::async_trait;

use crate::clock::{HUMAN_DATETIME_FORMAT, LocalClock};
use crate::logstore::ServiceLog;

/// Trait for notification sinks
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message
    async fn send(&self, subject: &str, body: &str) -> Result<(), crate::Error>;
}

/// Notifier that drops every message, for running with email disabled
#[derive(Debug, Default)]
pub struct DiscardNotifier;

#[async_trait]
impl Notifier for DiscardNotifier {
    async fn send(&self, subject: &str, _body: &str) -> Result<(), crate::Error> {
        tracing::debug!("email disabled, dropping message: {subject}");
        Ok(())
    }
}

/// Log a CRITICAL line and send an alert email for it.
///
/// `email_body` replaces the log message in the email when the recipient
/// needs more context than the one-liner (e.g. manual recovery steps).
pub async fn alert_critical(
    log: &ServiceLog,
    notifier: &dyn Notifier,
    clock: &LocalClock,
    message: &str,
    email_body: Option<&str>,
) {
    log.critical(message);

    let subject = format!(
        "CRITICAL ERROR {}",
        clock.now().format(HUMAN_DATETIME_FORMAT)
    );
    let body = email_body.unwrap_or(message);

    if let Err(e) = notifier.send(&subject, body).await {
        log.error(format!("Failed to send alert email: {e}"));
    }
}
