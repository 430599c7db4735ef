//! Error types for the monitoring agent.
//!
//! All failures inside a task body are contained there; none of these
//! variants ever reaches the scheduler's control loop. The single fatal
//! error is the log-root creation failure at startup.

use thiserror::Error;

/// Result type alias for hostwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the monitoring agent
#[derive(Error, Debug)]
pub enum Error {
    /// No address-echo provider was reachable. The cycle is aborted; absence
    /// of a result must never be read as "no change".
    #[error("address resolution failed: {0}")]
    Resolution(String),

    /// The persisted state file exists but is not parsable. The state store
    /// treats this like an absent file and returns the sentinel.
    #[error("state file corrupted: {0}")]
    StateCorruption(String),

    /// A provider update call failed or returned non-success.
    #[error("DNS update failed: {0}")]
    Update(String),

    /// All bounded retries of a critical update failed.
    #[error("all {attempts} update retries exhausted")]
    RetryExhausted {
        /// Number of retry attempts that were made
        attempts: u32,
    },

    /// Persisting state failed. The next cycle sees stale state and simply
    /// re-detects "changed".
    #[error("state write failed: {0}")]
    Write(String),

    /// Notification delivery failed
    #[error("notification failed: {0}")]
    Notify(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an address resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a state corruption error
    pub fn state_corruption(msg: impl Into<String>) -> Self {
        Self::StateCorruption(msg.into())
    }

    /// Create an update error
    pub fn update(msg: impl Into<String>) -> Self {
        Self::Update(msg.into())
    }

    /// Create a state write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(err.to_string())
    }
}
