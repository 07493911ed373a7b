//! An in-memory backend implementing the full capability set.
//!
//! Datasets are registered up front, keyed by the spec's identifying
//! component (SQL text, collection name, or file path). This is the
//! reference [`SourceBackend`] used in tests and for embedding
//! pre-loaded data without a live backend.

use crate::{
    ChunkStream, QuerySpec, RawChunk, Session, SourceBackend, SourceCause, SourceError,
};
use quire_types::{BackendKind, ConnectionProfile};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Inner {
    datasets: RwLock<HashMap<String, Vec<RawChunk>>>,
    healthy: AtomicBool,
    refuse_connect: AtomicBool,
}

/// In-memory source backend with pre-registered datasets.
pub struct MemoryBackend {
    kind: BackendKind,
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new(kind: BackendKind) -> Self {
        let inner = Inner {
            healthy: AtomicBool::new(true),
            ..Default::default()
        };
        Self {
            kind,
            inner: Arc::new(inner),
        }
    }

    /// Register a dataset under a spec key (builder style).
    pub fn with_dataset(self, key: impl Into<String>, chunks: Vec<RawChunk>) -> Self {
        self.add_dataset(key, chunks);
        self
    }

    /// Register a dataset under a spec key.
    pub fn add_dataset(&self, key: impl Into<String>, chunks: Vec<RawChunk>) {
        if let Ok(mut datasets) = self.inner.datasets.write() {
            datasets.insert(key.into(), chunks);
        }
    }

    /// Control the probe outcome of every open session.
    pub fn set_healthy(&self, healthy: bool) {
        self.inner.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make subsequent `connect` calls fail.
    pub fn set_refuse_connect(&self, refuse: bool) {
        self.inner.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    /// The key a spec resolves against the dataset table.
    fn spec_key(spec: &QuerySpec) -> String {
        match spec {
            QuerySpec::Sql { text, .. } => text.clone(),
            QuerySpec::DocumentFilter { collection, .. } => collection.clone(),
            QuerySpec::FileRange { path, .. } => path.display().to_string(),
        }
    }
}

impl SourceBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn connect(&self, profile: &ConnectionProfile) -> Result<Box<dyn Session>, SourceError> {
        if self.inner.refuse_connect.load(Ordering::SeqCst) {
            return Err(SourceError::new(
                self.kind,
                SourceCause::Connect(format!(
                    "refused connection to {}",
                    profile.connection_string()
                )),
            ));
        }
        Ok(Box::new(MemorySession {
            kind: self.kind,
            inner: Arc::clone(&self.inner),
        }))
    }

    fn name(&self) -> &'static str {
        "MemoryBackend"
    }
}

struct MemorySession {
    kind: BackendKind,
    inner: Arc<Inner>,
}

impl Session for MemorySession {
    fn execute(&mut self, spec: &QuerySpec) -> Result<ChunkStream, SourceError> {
        let key = MemoryBackend::spec_key(spec);
        let datasets = self.inner.datasets.read().map_err(|_| {
            SourceError::new(self.kind, SourceCause::Execute("dataset lock poisoned".into()))
        })?;
        match datasets.get(&key) {
            Some(chunks) => Ok(ChunkStream::from_chunks(chunks.clone())),
            None => Err(SourceError::new(
                self.kind,
                SourceCause::Execute(format!("unknown dataset '{key}'")),
            )),
        }
    }

    fn probe(&mut self) -> bool {
        self.inner.healthy.load(Ordering::SeqCst)
    }

    fn close(self: Box<Self>) {}
}
