// # SMTP Notifier
//
// Delivers alert and report emails over SMTP with implicit TLS
// (submissions, port 465 by default).
//
// The transport is blocking, so each send runs on the tokio blocking pool.
// Delivery failure is returned as an outcome and logged to the email
// service stream; nothing upstream ever aborts because an email did not
// go out.
//
// ## Credentials
//
// SMTP username and password are supplied by the daemon from the
// environment; they never appear in configuration files, logs or Debug
// output.

use std::time::Duration;

use async_trait::async_trait;
use hostwatch_core::config::EmailConfig;
use hostwatch_core::traits::Notifier;
use hostwatch_core::{Error, Result, ServiceLog};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Connection/send timeout for one delivery
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// SMTP notifier with a fixed sender/receiver pair
pub struct SmtpNotifier {
    transport: SmtpTransport,
    sender: Mailbox,
    receiver: Mailbox,
    log: ServiceLog,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("sender", &self.sender.to_string())
            .field("receiver", &self.receiver.to_string())
            .finish()
    }
}

impl SmtpNotifier {
    /// Build a notifier from the email configuration plus env-supplied
    /// credentials.
    pub fn new(
        config: &EmailConfig,
        username: impl Into<String>,
        password: impl Into<String>,
        log: ServiceLog,
    ) -> Result<Self> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|e| Error::config(format!("invalid sender address: {e}")))?;
        let receiver: Mailbox = config
            .receiver
            .parse()
            .map_err(|e| Error::config(format!("invalid receiver address: {e}")))?;

        let transport = SmtpTransport::relay(&config.smtp_server)
            .map_err(|e| Error::config(format!("invalid SMTP server: {e}")))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username.into(), password.into()))
            .timeout(Some(SEND_TIMEOUT))
            .build();

        Ok(Self {
            transport,
            sender,
            receiver,
            log,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        self.log.info(format!("Trying to send email: {subject}"));

        let email = Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| Error::notify(format!("failed to build message: {e}")))?;

        let transport = self.transport.clone();
        let outcome = tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| Error::notify(format!("send task failed: {e}")))?;

        match outcome {
            Ok(_) => {
                self.log.info("Message sent successfully");
                Ok(())
            }
            Err(e) => {
                self.log.error(format!("Error sending email: {e}"));
                Err(Error::notify(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostwatch_core::LocalClock;
    use tempfile::tempdir;

    fn test_log(root: &std::path::Path) -> ServiceLog {
        ServiceLog::open(root, "email", LocalClock::new(chrono_tz::Europe::Vienna)).unwrap()
    }

    fn config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_server: "smtp.example.org".to_string(),
            smtp_port: 465,
            sender: "agent@example.org".to_string(),
            receiver: "admin@example.org".to_string(),
        }
    }

    #[test]
    fn builds_from_valid_config() {
        let dir = tempdir().unwrap();
        assert!(SmtpNotifier::new(&config(), "user", "pass", test_log(dir.path())).is_ok());
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let dir = tempdir().unwrap();
        let mut config = config();
        config.sender = "not an address".to_string();
        assert!(SmtpNotifier::new(&config, "user", "pass", test_log(dir.path())).is_err());
    }

    #[test]
    fn credentials_not_exposed_in_debug() {
        let dir = tempdir().unwrap();
        let notifier =
            SmtpNotifier::new(&config(), "user", "hunter2", test_log(dir.path())).unwrap();
        let debug_str = format!("{notifier:?}");
        assert!(!debug_str.contains("hunter2"));
    }
}
