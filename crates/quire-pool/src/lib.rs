//! Bounded, health-checked connection pooling.
//!
//! A [`Pool`] owns every live connection for one
//! [`ConnectionProfile`](quire_types::ConnectionProfile). Callers lease
//! connections through [`Pool::acquire`], which blocks until a connection
//! is free or the profile's acquire timeout elapses. The lease is a
//! [`PooledConnection`] guard; dropping it runs a lightweight liveness
//! probe and either returns the connection to the pool or discards it.
//!
//! The pool is generic over a [`Connector`], the seam to the opaque
//! backend driver: the pool never knows what a connection *is*, only how
//! to open, probe and close one.

mod pool;

pub use pool::{Pool, PooledConnection};

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("timed out after {waited:?} waiting for a '{profile}' connection")]
    Timeout { profile: String, waited: Duration },

    #[error("backend connection error: {0}")]
    Backend(String),

    #[error("connection pool lock poisoned")]
    Poisoned,
}

/// The seam between the pool and an opaque backend driver.
///
/// Implementations wrap a driver's connect/probe/close capability set.
/// `close` must be cheap and non-blocking; slow teardown belongs in the
/// driver, not the pool's critical path.
pub trait Connector: Send + Sync {
    type Conn: Send;

    /// Open a fresh connection. Called lazily, never under the pool lock.
    fn open(&self) -> Result<Self::Conn, PoolError>;

    /// Lightweight liveness probe, run when a lease is returned.
    ///
    /// Returning `false` discards the connection; the pool does not retry
    /// the probe. A replacement is opened lazily on the next acquire.
    fn probe(&self, conn: &mut Self::Conn) -> bool;

    /// Close a connection that failed its probe or was evicted.
    fn close(&self, conn: Self::Conn);
}
