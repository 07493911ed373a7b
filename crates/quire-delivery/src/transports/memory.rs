//! In-process transport backed by a shared map, for tests and local runs.

use crate::report::Receipt;
use crate::target::{DeliveryTarget, TransportKind};
use crate::{Transport, TransportError};
use quire_types::Artifact;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Stores deliveries in a map keyed by destination name. Writing to an
/// existing destination overwrites it, matching the idempotence contract
/// real transports are held to.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    /// When set, sends whose target credentials do not match fail
    /// permanently. Lets tests stage a misconfigured target.
    required_credentials: Option<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.required_credentials = Some(credentials.into());
        self
    }

    pub fn stored(&self, destination: &str) -> Option<Vec<u8>> {
        self.store.read().ok()?.get(destination).cloned()
    }

    pub fn delivery_count(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl Transport for MemoryTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::InMemory
    }

    fn send(
        &self,
        artifact: &Artifact,
        target: &DeliveryTarget,
    ) -> Result<Receipt, TransportError> {
        if let Some(required) = &self.required_credentials
            && target.credentials.key() != required
        {
            return Err(TransportError::Permanent(format!(
                "credentials rejected for target '{}'",
                target.id
            )));
        }
        let destination = target.destination_for(artifact);
        let mut store = self
            .store
            .write()
            .map_err(|_| TransportError::Permanent("store lock poisoned".into()))?;
        store.insert(destination.clone(), artifact.bytes().to_vec());
        Ok(Receipt {
            destination,
            bytes: artifact.len(),
        })
    }

    fn name(&self) -> &'static str {
        "MemoryTransport"
    }
}
