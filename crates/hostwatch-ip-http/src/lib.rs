// # HTTP Address Resolver
//
// Resolves the host's public address by asking external echo services
// (e.g. ifconfig.me, api.ipify.org) over plain HTTP GET.
//
// ## Fallback
//
// Endpoints are tried in the configured order; the first one that answers
// with a 2xx and a parsable address wins. Each attempt carries its own short
// timeout so one dead provider cannot eat the whole cycle. Only when every
// endpoint has failed does `resolve` return an error, and in that case the
// reconciler aborts its cycle rather than guessing.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hostwatch_core::traits::AddressResolver;
use hostwatch_core::{Error, Result, ServiceLog};

/// Per-endpoint request timeout
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Echo-service resolver with ordered provider fallback
pub struct HttpAddressResolver {
    urls: Vec<String>,
    log: ServiceLog,
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a resolver over the given endpoints, tried in order.
    pub fn new(urls: Vec<String>, log: ServiceLog) -> Self {
        let client = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self { urls, log, client }
    }

    async fn fetch(&self, url: &str) -> Result<IpAddr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::resolution(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::resolution(format!("failed to read response: {e}")))?;

        let trimmed = body.trim();
        trimmed
            .parse()
            .map_err(|_| Error::resolution(format!("invalid address in response: {trimmed:?}")))
    }
}

#[async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        for url in &self.urls {
            match self.fetch(url).await {
                Ok(address) => return Ok(address),
                Err(e) => {
                    self.log
                        .warning(format!("Failed to get address from {url}: {e}"));
                }
            }
        }

        Err(Error::resolution(
            "could not retrieve public address from any provider",
        ))
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

    #[tokio::test]
    async fn empty_endpoint_list_fails_resolution() {
        let dir = tempdir().unwrap();
        let resolver = HttpAddressResolver::new(Vec::new(), test_log(dir.path()));

        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoints_fall_through_to_an_error() {
        let dir = tempdir().unwrap();
        // TEST-NET-1 addresses are guaranteed unroutable; with the 5s
        // per-attempt timeout this exercises the full fallback chain.
        let resolver = HttpAddressResolver::new(
            vec![
                "http://192.0.2.1:9/".to_string(),
                "http://192.0.2.2:9/".to_string(),
            ],
            test_log(dir.path()),
        );

        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }
}
