//! Core traits for the monitoring agent
//!
//! These are the seams between the reconciler/scheduler and the outside
//! world:
//!
//! - [`AddressResolver`]: determine the host's current public address
//! - [`RecordUpdater`]: push an address to the DNS provider
//! - [`StateStore`]: durable `{address, observed_at}` state
//! - [`Notifier`]: deliver alert and report emails

pub mod address_resolver;
pub mod notifier;
pub mod record_updater;
pub mod state_store;

pub use address_resolver::AddressResolver;
pub use notifier::{DiscardNotifier, Notifier, alert_critical};
pub use record_updater::RecordUpdater;
pub use state_store::StateStore;
