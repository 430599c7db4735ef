// # State Store Trait
//
// Defines the interface for the persisted reconciliation state.
//
// ## Purpose
//
// The store remembers the last address successfully written to the DNS
// provider and when. This is what makes reconciliation idempotent: a cycle
// that sees the same address with a fresh timestamp does nothing at all.
//
// ## Implementations
//
// - File-based JSON: [`crate::state::FileStateStore`]
// - In-memory (tests, embedding): [`crate::state::MemoryStateStore`]

use async_trait::async_trait;

use crate::state::DnsState;

/// Trait for state store implementations
///
/// Loading never fails: an absent or unreadable backing file yields
/// [`DnsState::sentinel`], which guarantees the next reconciliation treats
/// the current address as changed.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state, or the sentinel if there is none
    async fn load(&self) -> DnsState;

    /// Replace the persisted state.
    ///
    /// A failed write is reported but not retried; the reconciler logs it
    /// and lets the next cycle re-detect the change.
    async fn save(&self, state: &DnsState) -> Result<(), crate::Error>;
}
