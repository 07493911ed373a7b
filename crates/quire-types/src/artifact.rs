//! The rendered, deliverable byte payload.

use std::fmt;
use std::sync::Arc;

/// An immutable rendered document: a byte payload plus a content-type tag
/// and a suggested filename.
///
/// Artifacts are produced by a renderer and consumed by the delivery
/// dispatcher; the payload is reference-counted so a single render can fan
/// out to many targets without copying.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Arc<Vec<u8>>,
    content_type: String,
    filename: String,
}

impl Artifact {
    pub fn new(
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            bytes: Arc::new(bytes),
            content_type: content_type.into(),
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the payload, for transports that need ownership.
    pub fn shared_bytes(&self) -> Arc<Vec<u8>> {
        Arc::clone(&self.bytes)
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}
