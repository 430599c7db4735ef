//! Persisted reconciliation state
//!
//! [`DnsState`] is the only durable entity in the agent: the last address
//! successfully written to the DNS provider, and when. Everything else
//! (schedule bookkeeping, in-flight runs) is process-lifetime and resets on
//! restart.

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use std::net::IpAddr;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// The persisted `{address, observed_at}` pair.
///
/// Serialized form:
///
/// ```json
/// {
///   "address": "203.0.113.7",
///   "observed_at": "2026-03-14T09:26:53+01:00"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsState {
    /// Last address successfully written to the provider; empty in the
    /// sentinel
    pub address: String,

    /// Local time of the last successful update, ISO-8601 with offset
    pub observed_at: DateTime<FixedOffset>,
}

impl DnsState {
    /// The "never updated" sentinel: empty address, minimum timestamp.
    ///
    /// Guarantees the next reconciliation treats any resolved address as
    /// changed.
    pub fn sentinel() -> Self {
        Self {
            address: String::new(),
            observed_at: DateTime::<Utc>::MIN_UTC.fixed_offset(),
        }
    }

    /// State recording `address` as successfully written at `now`
    pub fn observed(address: IpAddr, now: DateTime<Tz>) -> Self {
        Self {
            address: address.to_string(),
            observed_at: now.fixed_offset(),
        }
    }

    /// Whether the persisted address equals `address`
    pub fn matches(&self, address: IpAddr) -> bool {
        self.address == address.to_string()
    }

    /// Time elapsed since the last successful update
    pub fn age(&self, now: DateTime<Tz>) -> TimeDelta {
        now.signed_duration_since(self.observed_at)
    }
}
