// # Memory State Store
//
// In-memory implementation of StateStore. Nothing survives a restart, which
// makes it useful for tests and for embedding the reconciler without a
// writable filesystem.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::state::DnsState;
use crate::traits::StateStore;

/// In-memory state store (not persistent)
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<DnsState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the store, as if a previous run had persisted `state`
    pub fn with_state(state: DnsState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> DnsState {
        self.state
            .lock()
            .await
            .clone()
            .unwrap_or_else(DnsState::sentinel)
    }

    async fn save(&self, state: &DnsState) -> Result<()> {
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Vienna;

    #[tokio::test]
    async fn empty_store_yields_sentinel() {
        let store = MemoryStateStore::new();
        assert_eq!(store.load().await, DnsState::sentinel());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = MemoryStateStore::new();
        let now = Vienna.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let state = DnsState::observed("203.0.113.7".parse().unwrap(), now);

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await, state);
    }
}
