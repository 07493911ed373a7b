// src/registry.rs
//! Process-scoped lookup tables for pluggable pipeline components.

use quire_render::{OutputFormat, Renderer};
use quire_source::SourceBackend;
use quire_types::BackendKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps backend kinds to source backends and output formats to renderers.
///
/// Built once at startup and handed to the [`Pipeline`](crate::Pipeline);
/// there is no module-level mutable state, so two pipelines with different
/// registries coexist in one process.
#[derive(Default)]
pub struct Registry {
    backends: HashMap<BackendKind, Arc<dyn SourceBackend>>,
    renderers: HashMap<OutputFormat, Arc<dyn Renderer>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: Arc<dyn SourceBackend>) -> Self {
        self.backends.insert(backend.kind(), backend);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderers.insert(renderer.format(), renderer);
        self
    }

    pub fn backend(&self, kind: BackendKind) -> Option<Arc<dyn SourceBackend>> {
        self.backends.get(&kind).cloned()
    }

    pub fn renderer(&self, format: OutputFormat) -> Option<Arc<dyn Renderer>> {
        self.renderers.get(&format).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_render::DocumentRenderer;
    use quire_source::MemoryBackend;

    #[test]
    fn test_lookup_by_kind_and_format() {
        let registry = Registry::new()
            .with_backend(Arc::new(MemoryBackend::new(BackendKind::Relational)))
            .with_renderer(Arc::new(DocumentRenderer::new("report")));

        assert!(registry.backend(BackendKind::Relational).is_some());
        assert!(registry.backend(BackendKind::Document).is_none());
        assert!(registry.renderer(OutputFormat::PaginatedDocument).is_some());
        assert!(registry.renderer(OutputFormat::Spreadsheet).is_none());
    }
}
