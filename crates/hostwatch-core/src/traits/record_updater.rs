// # Record Updater Trait
//
// Defines the interface for pushing a new address to the DNS provider.
//
// ## Implementations
//
// - Cloudflare: `hostwatch-provider-cloudflare` crate
//
// Updaters execute exactly one provider call per invocation and report the
// outcome. Retry policy, delays and escalation are owned by the reconciler;
// an updater that sleeps or loops internally breaks the bounded retry
// ladder.

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for DNS record updater implementations
#[async_trait]
pub trait RecordUpdater: Send + Sync {
    /// Set the managed record to `address`.
    ///
    /// Only an explicit success indication from the provider counts as
    /// success; anything else (transport error, non-2xx status, a response
    /// whose success flag is not `true`) is [`crate::Error::Update`].
    async fn update(&self, address: IpAddr) -> Result<(), crate::Error>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
