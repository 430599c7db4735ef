//! Test doubles and common utilities for contract tests
//!
//! Minimal controllable implementations of the core traits, plus a harness
//! that wires a reconciler against them.

#![allow(dead_code)]

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hostwatch_core::config::DnsConfig;
use hostwatch_core::traits::{AddressResolver, Notifier, RecordUpdater};
use hostwatch_core::{Error, LocalClock, Result, ServiceLog};

/// Resolver that always returns the same address, or always fails
pub struct ScriptedResolver {
    address: Option<IpAddr>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn returning(address: IpAddr) -> Self {
        Self {
            address: Some(address),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            address: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl AddressResolver for ScriptedResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.address
            .ok_or_else(|| Error::resolution("no provider reachable"))
    }
}

/// Updater that records every call (address and paused-clock instant) and
/// fails the first `fail_first` calls before succeeding. `fail_first =
/// usize::MAX` never succeeds.
pub struct RecordingUpdater {
    fail_first: usize,
    calls: Arc<Mutex<Vec<(IpAddr, tokio::time::Instant)>>>,
}

impl RecordingUpdater {
    pub fn succeeding() -> Self {
        Self::failing_first(0)
    }

    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    pub fn failing_first(fail_first: usize) -> Self {
        Self {
            fail_first,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<(IpAddr, tokio::time::Instant)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl RecordUpdater for RecordingUpdater {
    async fn update(&self, address: IpAddr) -> Result<()> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((address, tokio::time::Instant::now()));
            calls.len()
        };
        if count <= self.fail_first {
            Err(Error::update("provider unavailable"))
        } else {
            Ok(())
        }
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Notifier that records every message
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Arc<Mutex<Vec<(String, String)>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Notifier whose delivery always fails
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _subject: &str, _body: &str) -> Result<()> {
        Err(Error::notify("smtp unreachable"))
    }
}

pub fn test_clock() -> LocalClock {
    LocalClock::new(chrono_tz::Europe::Vienna)
}

pub fn test_log(root: &std::path::Path, service: &str) -> ServiceLog {
    ServiceLog::open(root, service, test_clock()).unwrap()
}

/// DnsConfig with the production retry shape (3 retries, 30s fixed delay,
/// 24h force-refresh window)
pub fn dns_config() -> DnsConfig {
    DnsConfig::default()
}
