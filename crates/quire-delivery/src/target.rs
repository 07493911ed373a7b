//! Delivery destination descriptors.

use quire_types::{Artifact, CredentialsRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The transport family a target is reached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    RemoteFileTransfer,
    ObjectStorage,
    Email,
    InMemory,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::RemoteFileTransfer => "remote-file-transfer",
            TransportKind::ObjectStorage => "object-storage",
            TransportKind::Email => "email",
            TransportKind::InMemory => "in-memory",
        };
        write!(f, "{name}")
    }
}

/// Per-target retry policy for transient errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each retry.
    pub base_backoff: Duration,
    /// Upper bound on any single backoff delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Exponential delay before the retry following `attempt` (1-based),
    /// without jitter; the dispatcher adds that.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// One delivery destination: transport kind, address, credentials
/// reference and its own retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub id: String,
    pub transport: TransportKind,
    /// Transport-specific address: a directory URL, a bucket with an
    /// optional key prefix, a store name.
    pub address: String,
    pub credentials: CredentialsRef,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl DeliveryTarget {
    /// The deterministic destination name for an artifact at this target.
    ///
    /// Delivering the same artifact twice lands on the same name, so
    /// overwrite semantics make repeated dispatch idempotent.
    pub fn destination_for(&self, artifact: &Artifact) -> String {
        format!(
            "{}/{}",
            self.address.trim_end_matches('/'),
            artifact.filename()
        )
    }
}
