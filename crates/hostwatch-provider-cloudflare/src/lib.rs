// # Cloudflare Record Updater
//
// Updates one pre-identified DNS A record via the Cloudflare API v4.
//
// ## Scope
//
// The zone and record ids come from configuration, so a single
// authenticated PUT per invocation is all this crate ever does:
//
// ```http
// PUT /zones/:zone_id/dns_records/:record_id
// Authorization: Bearer <token>
// {"name": "...", "ttl": 1, "type": "A", "content": "1.2.3.4", "proxied": true}
// ```
//
// The response body carries a `success` flag; only an explicit `true`
// counts. Retry policy is owned by the reconciler; this updater makes one
// call and reports what happened.
//
// ## Security
//
// The API token never appears in logs or Debug output.
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hostwatch_core::config::RecordConfig;
use hostwatch_core::traits::RecordUpdater;
use hostwatch_core::{Error, Result, ServiceLog};
use serde_json::Value;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for the update call
const UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Cloudflare updater for one record
pub struct CloudflareUpdater {
    api_token: String,
    record: RecordConfig,
    log: ServiceLog,
    client: reqwest::Client,
}

// Debug implementation that keeps the API token out of output
impl std::fmt::Debug for CloudflareUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareUpdater")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.record.zone_id)
            .field("record_id", &self.record.record_id)
            .field("record_name", &self.record.record_name)
            .finish()
    }
}

impl CloudflareUpdater {
    /// Create an updater for the configured record.
    ///
    /// `api_token` needs Zone:DNS:Edit permission and must come from the
    /// environment, never from a config file.
    pub fn new(api_token: impl Into<String>, record: RecordConfig, log: ServiceLog) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if record.zone_id.is_empty() || record.record_id.is_empty() {
            return Err(Error::config(
                "Cloudflare zone_id and record_id are required",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(UPDATE_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_token,
            record,
            log,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/zones/{}/dns_records/{}",
            CLOUDFLARE_API_BASE, self.record.zone_id, self.record.record_id
        )
    }
}

#[async_trait]
impl RecordUpdater for CloudflareUpdater {
    async fn update(&self, address: IpAddr) -> Result<()> {
        let payload = serde_json::json!({
            "name": self.record.record_name,
            "ttl": self.record.ttl,
            "type": "A",
            "content": address.to_string(),
            "proxied": self.record.proxied,
        });

        let response = self
            .client
            .put(self.endpoint())
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::update(format!("network error updating DNS: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(Error::update(format!(
                "Cloudflare returned {status}: {error_text}"
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| Error::update(format!("failed to parse response: {e}")))?;

        // Cloudflare reports failures with HTTP 200 and success=false, so
        // the flag is authoritative, not the status code.
        if data.get("success").and_then(Value::as_bool) == Some(true) {
            Ok(())
        } else {
            self.log
                .error(format!("Cloudflare API returned failure: {data}"));
            Err(Error::update("Cloudflare API returned failure"))
        }
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostwatch_core::LocalClock;
    use tempfile::tempdir;

    fn test_log(root: &std::path::Path) -> ServiceLog {
        ServiceLog::open(root, "dns", LocalClock::new(chrono_tz::Europe::Vienna)).unwrap()
    }

    fn record() -> RecordConfig {
        RecordConfig {
            zone_id: "zone123".to_string(),
            record_id: "rec456".to_string(),
            record_name: "cloud.example.org".to_string(),
            ttl: 1,
            proxied: true,
        }
    }

    #[test]
    fn empty_token_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(CloudflareUpdater::new("", record(), test_log(dir.path())).is_err());
    }

    #[test]
    fn missing_record_ids_are_rejected() {
        let dir = tempdir().unwrap();
        let mut record = record();
        record.record_id = String::new();
        assert!(CloudflareUpdater::new("token", record, test_log(dir.path())).is_err());
    }

    #[test]
    fn endpoint_is_record_scoped() {
        let dir = tempdir().unwrap();
        let updater = CloudflareUpdater::new("token", record(), test_log(dir.path())).unwrap();
        assert_eq!(
            updater.endpoint(),
            "https://api.cloudflare.com/client/v4/zones/zone123/dns_records/rec456"
        );
    }

    #[test]
    fn api_token_not_exposed_in_debug() {
        let dir = tempdir().unwrap();
        let updater =
            CloudflareUpdater::new("secret_token_12345", record(), test_log(dir.path())).unwrap();

        let debug_str = format!("{updater:?}");
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("<REDACTED>"));
    }
}
