//! Backend identity and pool sizing descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The backend family a connection profile talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// A relational database queried with SQL text and bound parameters.
    Relational,
    /// A document store queried with a filter expression.
    Document,
    /// A tabular file (delimited text, workbook, columnar) read by path.
    TabularFile,
}

impl BackendKind {
    /// URI scheme used when rendering a profile as a connection string.
    pub fn scheme(&self) -> &'static str {
        match self {
            BackendKind::Relational => "relational",
            BackendKind::Document => "document",
            BackendKind::TabularFile => "file",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scheme())
    }
}

/// An opaque reference into an external credential store.
///
/// The pipeline never holds secret material; it passes this reference to
/// the backend driver or transport client, which resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialsRef(pub String);

impl CredentialsRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn key(&self) -> &str {
        &self.0
    }
}

/// Pool sizing and timing bounds for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBounds {
    /// Idle connections kept open beyond this count are eviction candidates.
    pub min_idle: usize,
    /// Hard cap on live connections for the profile.
    pub max_size: usize,
    /// How long `acquire` blocks before failing with a timeout.
    pub acquire_timeout: Duration,
    /// Inactivity window after which surplus idle connections are closed.
    pub idle_timeout: Duration,
}

impl Default for PoolBounds {
    fn default() -> Self {
        Self {
            min_idle: 1,
            max_size: 8,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// The identity of one data backend: kind, address, credentials reference
/// and pool bounds. Immutable once created; owned by the connection pool
/// for its process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub id: String,
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub credentials: CredentialsRef,
    #[serde(default)]
    pub pool: PoolBounds,
}

impl ConnectionProfile {
    /// Render the profile as a connection string, credentials elided.
    ///
    /// Only the credentials *reference* exists in the first place, but it
    /// is still left out so the string is safe for logs.
    pub fn connection_string(&self) -> String {
        match &self.database {
            Some(db) => format!("{}://{}:{}/{}", self.backend.scheme(), self.host, self.port, db),
            None => format!("{}://{}:{}", self.backend.scheme(), self.host, self.port),
        }
    }
}
