// # File State Store
//
// File-backed implementation of StateStore.
//
// ## Corruption policy
//
// A file that is missing, unreadable, or not parsable as `DnsState` is
// treated identically: warn and return the sentinel. Corruption is never
// fatal; the price is one redundant provider update on the next cycle.
//
// ## Write path
//
// Serialized to a temporary file and renamed into place so a crash mid-write
// cannot leave a half-written state file behind.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::logstore::ServiceLog;
use crate::state::DnsState;
use crate::traits::StateStore;

/// File-backed state store
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    log: ServiceLog,
}

impl FileStateStore {
    /// Create a store backed by `path`.
    ///
    /// The file is not touched until the first `save`; a missing file is a
    /// valid "never updated" state.
    pub fn new(path: impl Into<PathBuf>, log: ServiceLog) -> Self {
        Self {
            path: path.into(),
            log,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> DnsState {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return DnsState::sentinel();
            }
            Err(e) => {
                self.log.warning(format!(
                    "Could not read state file {}: {e}. Resetting.",
                    self.path.display()
                ));
                return DnsState::sentinel();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                let err = Error::state_corruption(e.to_string());
                self.log.warning(format!("{err}. Resetting."));
                DnsState::sentinel()
            }
        }
    }

    async fn save(&self, state: &DnsState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| Error::write(format!("failed to serialize state: {e}")))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::write(format!("failed to create {}: {e}", temp_path.display()))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::write(format!("failed to write {}: {e}", temp_path.display()))
            })?;
            file.flush().await.map_err(|e| {
                Error::write(format!("failed to flush {}: {e}", temp_path.display()))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::write(format!(
                "failed to rename {} to {}: {e}",
                temp_path.display(),
                self.path.display()
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::LocalClock;
    use chrono::TimeZone;
    use chrono_tz::Europe::Vienna;
    use tempfile::tempdir;

    fn test_log(root: &std::path::Path) -> ServiceLog {
        ServiceLog::open(root, "dns", LocalClock::new(Vienna)).unwrap()
    }

    #[tokio::test]
    async fn round_trip_preserves_address_and_timestamp() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"), test_log(dir.path()));

        let now = Vienna.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let state = DnsState::observed("203.0.113.7".parse().unwrap(), now);
        store.save(&state).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.address, "203.0.113.7");
        assert_eq!(loaded.observed_at, state.observed_at);
    }

    #[tokio::test]
    async fn missing_file_yields_sentinel() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("absent.json"), test_log(dir.path()));

        assert_eq!(store.load().await, DnsState::sentinel());
    }

    #[tokio::test]
    async fn corrupt_file_yields_sentinel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = FileStateStore::new(&path, test_log(dir.path()));
        assert_eq!(store.load().await, DnsState::sentinel());
    }

    #[tokio::test]
    async fn missing_fields_yield_sentinel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, br#"{"address": "203.0.113.7"}"#).unwrap();

        let store = FileStateStore::new(&path, test_log(dir.path()));
        assert_eq!(store.load().await, DnsState::sentinel());
    }

    #[tokio::test]
    async fn save_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"), test_log(dir.path()));

        let t1 = Vienna.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let t2 = Vienna.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap();
        store
            .save(&DnsState::observed("203.0.113.7".parse().unwrap(), t1))
            .await
            .unwrap();
        store
            .save(&DnsState::observed("198.51.100.1".parse().unwrap(), t2))
            .await
            .unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.address, "198.51.100.1");
    }
}
