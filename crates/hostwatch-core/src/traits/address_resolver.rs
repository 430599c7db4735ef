// # Address Resolver Trait
//
// Defines the interface for determining the host's public address.
//
// ## Implementations
//
// - HTTP echo services with provider fallback: `hostwatch-ip-http` crate
//
// Resolvers are observers: they report the address and nothing else. Whether
// anything needs updating is decided by the reconciler.

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for public-address resolver implementations
///
/// A resolver attempt either yields the current address or fails with
/// [`crate::Error::Resolution`]. The reconciler must never read a failure as
/// "no change"; it aborts the cycle instead.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Determine the host's current public address
    async fn resolve(&self) -> Result<IpAddr, crate::Error>;
}
