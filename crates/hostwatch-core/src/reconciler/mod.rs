//! DNS reconciliation engine
//!
//! One reconciliation cycle walks a fixed ladder:
//!
//! ```text
//! IDLE → RESOLVING → DECIDING → UPDATING → (RETRYING)* → DONE | ESCALATED
//! ```
//!
//! 1. **RESOLVING**: ask the [`AddressResolver`] for the current public
//!    address. Failure aborts the cycle; the next scheduled cycle starts
//!    from scratch.
//! 2. **DECIDING**: load persisted [`DnsState`] and compare. Same address
//!    and fresh state: nothing to do. Same address but older than the
//!    force-refresh window: re-assert the record, best-effort. Different
//!    address: a critical refresh.
//! 3. **UPDATING**: one call to the [`RecordUpdater`]. Success persists the
//!    new state. A failed best-effort refresh is only a warning.
//! 4. **RETRYING**: a failed critical refresh gets a bounded number of
//!    retries, each after the same fixed delay, each with the address
//!    resolved at the start of the cycle.
//! 5. **ESCALATED**: every retry failed, CRITICAL log plus alert email
//!    carrying the unpersisted address so a human can fix the record by
//!    hand. State is deliberately not persisted, so the next cycle sees
//!    "changed" again and the whole ladder re-runs.
//!
//! The cycle never returns an error: every failure mode is a
//! [`CycleOutcome`] variant, and nothing escapes to the scheduler.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;

use crate::clock::LocalClock;
use crate::config::DnsConfig;
use crate::logstore::ServiceLog;
use crate::state::DnsState;
use crate::traits::{AddressResolver, Notifier, RecordUpdater, StateStore, alert_critical};

/// Terminal outcome of one reconciliation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Address unchanged and state fresh; no provider call was made
    NoChange,

    /// Address changed and the record was updated
    Updated,

    /// Same address, stale state; the record was re-asserted
    Refreshed,

    /// No address provider was reachable; cycle aborted
    ResolutionFailed,

    /// A best-effort refresh failed; the record still holds the correct
    /// address, so no retry
    RefreshFailed,

    /// A critical update failed through every retry; a human was alerted
    Escalated,
}

/// The reconciliation engine.
///
/// Collaborators come in at construction (no globals); cycles are mutually
/// exclusive by the scheduler's overlap guard, so the engine itself needs no
/// locking around the state file.
pub struct Reconciler {
    resolver: Box<dyn AddressResolver>,
    updater: Box<dyn RecordUpdater>,
    store: Box<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    clock: LocalClock,
    log: ServiceLog,
    force_refresh: TimeDelta,
    max_retries: u32,
    retry_delay: Duration,
}

impl Reconciler {
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        updater: Box<dyn RecordUpdater>,
        store: Box<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        clock: LocalClock,
        log: ServiceLog,
        config: &DnsConfig,
    ) -> Self {
        Self {
            resolver,
            updater,
            store,
            notifier,
            clock,
            log,
            force_refresh: TimeDelta::seconds(config.force_refresh_secs as i64),
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }

    /// Run one reconciliation cycle to completion.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.log.info("Starting DNS record check.");

        // RESOLVING
        let current = match self.resolver.resolve().await {
            Ok(address) => {
                self.log.info(format!("Current WAN address: {address}"));
                address
            }
            Err(e) => {
                self.log
                    .error(format!("Failed to determine public address. Aborting. Error: {e}"));
                return CycleOutcome::ResolutionFailed;
            }
        };

        // DECIDING
        let persisted = self.store.load().await;
        let age = persisted.age(self.clock.now());

        let critical = if persisted.matches(current) {
            self.log.info("Address has not changed.");

            if age <= self.force_refresh {
                self.log
                    .info(format!("Nothing to do (last update {age} ago)."));
                return CycleOutcome::NoChange;
            }
            self.log
                .info(format!("Force refresh triggered (last update {age} ago)."));
            false
        } else {
            self.log.info(format!(
                "Address changed from '{}' to {current}.",
                persisted.address
            ));
            true
        };

        // UPDATING
        match self.updater.update(current).await {
            Ok(()) => {
                self.log.info("DNS record successfully updated.");
                self.persist(current).await;
                if critical {
                    CycleOutcome::Updated
                } else {
                    CycleOutcome::Refreshed
                }
            }
            Err(e) if !critical => {
                // The record still holds the correct address; staleness is
                // acceptable until the next force-refresh window.
                self.log.warning(format!(
                    "Failed to refresh DNS record, but address did not change ({e}). \
                     Should not be a problem for now."
                ));
                CycleOutcome::RefreshFailed
            }
            Err(e) => {
                self.log
                    .error(format!("Failed to update DNS record to new address ({e}). Retrying..."));
                self.retry_ladder(current).await
            }
        }
    }

    /// RETRYING: bounded attempts with a fixed delay before each, same
    /// address throughout. First success persists and ends the cycle.
    async fn retry_ladder(&self, address: IpAddr) -> CycleOutcome {
        for attempt in 1..=self.max_retries {
            tokio::time::sleep(self.retry_delay).await;

            match self.updater.update(address).await {
                Ok(()) => {
                    self.log.info(format!("Retry #{attempt} successful."));
                    self.persist(address).await;
                    return CycleOutcome::Updated;
                }
                Err(e) => {
                    self.log.error(format!("Retry #{attempt} failed: {e}"));
                }
            }
        }

        // ESCALATED: state stays unpersisted so the next cycle sees
        // "changed" again and re-runs the ladder.
        let exhausted = crate::Error::RetryExhausted {
            attempts: self.max_retries,
        };
        alert_critical(
            &self.log,
            self.notifier.as_ref(),
            &self.clock,
            &format!("{exhausted}. Service is now unreachable. Immediate action must be taken."),
            Some(&format!(
                "Failed to update the DNS record to the new address multiple times.\n\
                 If everything still works, a later attempt was successful.\n\
                 If not, manually edit the DNS record. Current address is {address}"
            )),
        )
        .await;

        CycleOutcome::Escalated
    }

    async fn persist(&self, address: IpAddr) {
        let state = DnsState::observed(address, self.clock.now());
        if let Err(e) = self.store.save(&state).await {
            // Stale state self-heals: the next cycle re-detects "changed".
            self.log.error(format!("Failed to persist DNS state: {e}"));
        }
    }
}
