//! Consumed backend capability traits and the pool adapter.

use crate::{ChunkStream, QuerySpec, SourceError};
use quire_pool::{Connector, PoolError};
use quire_types::{BackendKind, ConnectionProfile};
use std::sync::Arc;

/// A live backend session, obtained from a [`SourceBackend`].
///
/// This is the opaque capability set every driver adapter exposes:
/// execute a spec, answer a liveness probe, close. The core never depends
/// on any one backend's wire protocol.
pub trait Session: Send {
    /// Execute a query spec, returning a chunked row stream.
    ///
    /// The stream is non-restartable; re-iterating requires calling
    /// `execute` again.
    fn execute(&mut self, spec: &QuerySpec) -> Result<ChunkStream, SourceError>;

    /// Lightweight liveness check used by the connection pool.
    fn probe(&mut self) -> bool;

    /// Tear the session down.
    fn close(self: Box<Self>);
}

impl std::fmt::Debug for dyn Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// Factory for [`Session`]s against one backend technology.
pub trait SourceBackend: Send + Sync {
    /// The backend family this implementation serves.
    fn kind(&self) -> BackendKind;

    /// Open a session for the given profile.
    fn connect(&self, profile: &ConnectionProfile) -> Result<Box<dyn Session>, SourceError>;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;
}

/// Adapts a ([`SourceBackend`], [`ConnectionProfile`]) pair to the pool's
/// [`Connector`] seam, so pooled connections *are* backend sessions.
pub struct SessionConnector {
    backend: Arc<dyn SourceBackend>,
    profile: ConnectionProfile,
}

impl SessionConnector {
    pub fn new(backend: Arc<dyn SourceBackend>, profile: ConnectionProfile) -> Self {
        Self { backend, profile }
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }
}

impl Connector for SessionConnector {
    type Conn = Box<dyn Session>;

    fn open(&self) -> Result<Self::Conn, PoolError> {
        self.backend
            .connect(&self.profile)
            .map_err(|e| PoolError::Backend(e.to_string()))
    }

    fn probe(&self, conn: &mut Self::Conn) -> bool {
        conn.probe()
    }

    fn close(&self, conn: Self::Conn) {
        conn.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use quire_pool::Pool;
    use quire_types::{CredentialsRef, PoolBounds};

    fn profile() -> ConnectionProfile {
        ConnectionProfile {
            id: "mem".into(),
            backend: BackendKind::Document,
            host: "localhost".into(),
            port: 0,
            database: None,
            credentials: CredentialsRef::new("none"),
            pool: PoolBounds::default(),
        }
    }

    #[test]
    fn test_pooled_sessions_probe_through_backend() {
        let backend = Arc::new(MemoryBackend::new(BackendKind::Document));
        let connector = SessionConnector::new(backend.clone(), profile());
        let pool = Pool::new("mem", PoolBounds::default(), connector);

        let session = pool.acquire().unwrap();
        drop(session);
        assert_eq!(pool.idle(), 1);

        // An unhealthy backend fails the release probe and the pooled
        // session is discarded.
        let _session = pool.acquire().unwrap();
        backend.set_healthy(false);
        drop(_session);
        assert_eq!(pool.idle(), 0);
    }
}
