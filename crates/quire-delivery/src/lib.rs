//! Delivery dispatch: transmitting a rendered artifact to one or more
//! destinations with per-target retry and partial-failure reporting.
//!
//! The [`Dispatcher`] fans an artifact out to every [`DeliveryTarget`] in
//! parallel. One target's failure never blocks or cancels another's; the
//! batch call always returns a [`DeliveryBatchReport`] with exactly one
//! outcome per target, and callers decide whether partial success is
//! acceptable.
//!
//! Transports are opaque capabilities behind the [`Transport`] trait.
//! Their one obligation beyond sending is the transient-vs-permanent
//! error split, which drives the retry policy: transient errors retry
//! with exponential backoff, permanent ones fail immediately.
//!
//! Idempotence comes from deterministic destination naming (target
//! address plus artifact filename) with overwrite semantics, not from
//! dispatcher-side deduplication.

mod dispatcher;
mod report;
mod target;
pub mod transports;

pub use dispatcher::{CancelToken, Dispatcher};
pub use report::{DeliveryBatchReport, DeliveryOutcome, DeliveryReport, Receipt};
pub use target::{DeliveryTarget, RetryPolicy, TransportKind};

use quire_types::Artifact;
use thiserror::Error;

/// A transport-level failure, split by retry-worthiness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Retry-worthy: network timeouts, transient auth-service hiccups.
    #[error("transient transport error: {0}")]
    Transient(String),

    /// Not retry-worthy: bad credentials, rejected payloads.
    #[error("permanent transport error: {0}")]
    Permanent(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

/// The consumed transport capability: send an artifact to a target.
///
/// Implementations must write to the deterministic destination derived
/// from the target and the artifact filename, overwriting any previous
/// payload, so a repeated delivery never corrupts destination state.
pub trait Transport: Send + Sync {
    /// The transport family this implementation serves.
    fn kind(&self) -> TransportKind;

    /// Perform one send attempt. Never retries internally.
    fn send(&self, artifact: &Artifact, target: &DeliveryTarget)
    -> Result<Receipt, TransportError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}
