// src/pipeline.rs
//! The synchronous pipeline run: acquire, fetch, normalize, resolve,
//! render, dispatch.

use crate::error::PipelineError;
use crate::registry::Registry;
use log::{debug, info, warn};
use quire_delivery::{
    CancelToken, DeliveryBatchReport, DeliveryTarget, Dispatcher, Transport,
};
use quire_normalize::{NormalizeOptions, Normalizer, SchemaHint};
use quire_pool::{Pool, PoolError};
use quire_render::{OutputFormat, Renderer};
use quire_source::{QuerySpec, SessionConnector, SourceBackend, SourceConnector};
use quire_template::{Bindings, Template, TemplateManager};
use quire_types::ConnectionProfile;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Everything one report run needs: where the data lives, how to query
/// it, the template to bind it into, the output format and the delivery
/// targets.
#[derive(Clone)]
pub struct RunRequest {
    pub profile: ConnectionProfile,
    pub query: QuerySpec,
    pub template: Template,
    /// Caller-supplied scalar bindings (report title, generation
    /// timestamp). The fetched rows are added under [`rows_binding`].
    ///
    /// [`rows_binding`]: RunRequest::rows_binding
    pub bindings: Bindings,
    /// The binding name the normalized row set is attached to.
    pub rows_binding: String,
    pub hint: Option<SchemaHint>,
    pub format: OutputFormat,
    pub targets: Vec<DeliveryTarget>,
}

impl RunRequest {
    pub fn new(
        profile: ConnectionProfile,
        query: QuerySpec,
        template: Template,
        format: OutputFormat,
    ) -> Self {
        Self {
            profile,
            query,
            template,
            bindings: Bindings::new(),
            rows_binding: "rows".to_string(),
            hint: None,
            format,
            targets: Vec::new(),
        }
    }

    pub fn with_bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_rows_binding(mut self, name: impl Into<String>) -> Self {
        self.rows_binding = name.into();
        self
    }

    pub fn with_hint(mut self, hint: SchemaHint) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn with_target(mut self, target: DeliveryTarget) -> Self {
        self.targets.push(target);
        self
    }
}

/// The report pipeline: one instance per process, shared across runs.
///
/// Connection pools are created lazily per profile id and reused, so
/// backpressure across concurrent runs against the same backend comes
/// from pool acquisition.
pub struct Pipeline {
    registry: Registry,
    dispatcher: Dispatcher,
    normalizer: Normalizer,
    manager: TemplateManager,
    pools: Mutex<HashMap<String, Arc<Pool<SessionConnector>>>>,
}

impl Pipeline {
    pub fn new(registry: Registry, dispatcher: Dispatcher) -> Self {
        Self {
            registry,
            dispatcher,
            normalizer: Normalizer::new(NormalizeOptions::default()),
            manager: TemplateManager::new(),
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Execute one run end to end.
    ///
    /// Stages before delivery fail fast: an error means no artifact was
    /// produced and nothing was sent. Delivery fails soft; inspect the
    /// returned report for per-target outcomes.
    pub fn run(&self, request: &RunRequest) -> Result<DeliveryBatchReport, PipelineError> {
        self.run_with_cancel(request, &CancelToken::new())
    }

    /// Like [`run`](Pipeline::run), with a token that can cancel the
    /// delivery stage.
    pub fn run_with_cancel(
        &self,
        request: &RunRequest,
        cancel: &CancelToken,
    ) -> Result<DeliveryBatchReport, PipelineError> {
        let backend = self
            .registry
            .backend(request.profile.backend)
            .ok_or_else(|| {
                PipelineError::Unconfigured(format!(
                    "no source backend registered for kind '{}'",
                    request.profile.backend
                ))
            })?;
        let renderer = self.registry.renderer(request.format).ok_or_else(|| {
            PipelineError::Unconfigured(format!(
                "no renderer registered for format '{}'",
                request.format
            ))
        })?;

        info!(
            "[SOURCE] Fetching {} spec from {}",
            request.query.kind_name(),
            request.profile.connection_string()
        );
        let pool = self.pool_for(&request.profile, backend)?;
        let connector = SourceConnector::for_kind(request.profile.backend);
        let mut session = pool.acquire()?;
        let chunks = connector.fetch(&request.query, session.as_mut())?;

        let normalized = self.normalizer.normalize(chunks, request.hint.as_ref())?;
        drop(session);
        for warning in &normalized.warnings {
            warn!("[NORMALIZE] {warning}");
        }
        debug!(
            "[NORMALIZE] Produced {} row(s), {} column(s)",
            normalized.row_set.len(),
            normalized.row_set.columns().len()
        );

        let bindings = request
            .bindings
            .clone()
            .table(request.rows_binding.clone(), normalized.row_set);
        let resolved = self.manager.resolve(&request.template, &bindings)?;
        for warning in &resolved.warnings {
            warn!("[TEMPLATE] {warning}");
        }

        info!(
            "[RENDER] Rendering {} output via {}",
            request.format,
            renderer.name()
        );
        let artifact = renderer.render(&resolved.model)?;

        // Delivery is the only async stage; drive it on a local runtime
        // so the pipeline stays synchronous for callers.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        Ok(runtime.block_on(self.dispatcher.dispatch(&artifact, &request.targets, cancel)))
    }

    /// The shared pool for a profile, created on first use.
    fn pool_for(
        &self,
        profile: &ConnectionProfile,
        backend: Arc<dyn SourceBackend>,
    ) -> Result<Arc<Pool<SessionConnector>>, PipelineError> {
        let mut pools = self.pools.lock().map_err(|_| PoolError::Poisoned)?;
        let pool = pools.entry(profile.id.clone()).or_insert_with(|| {
            Arc::new(Pool::new(
                profile.id.clone(),
                profile.pool.clone(),
                SessionConnector::new(backend, profile.clone()),
            ))
        });
        Ok(Arc::clone(pool))
    }
}

/// Builder for assembling a [`Pipeline`] from its pluggable parts.
pub struct PipelineBuilder {
    registry: Registry,
    dispatcher: Dispatcher,
    options: NormalizeOptions,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            dispatcher: Dispatcher::new(),
            options: NormalizeOptions::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn SourceBackend>) -> Self {
        self.registry = self.registry.with_backend(backend);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.registry = self.registry.with_renderer(renderer);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.dispatcher = self.dispatcher.with_transport(transport);
        self
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Pipeline {
        let mut pipeline = Pipeline::new(self.registry, self.dispatcher);
        pipeline.normalizer = Normalizer::new(self.options);
        pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_delivery::transports::MemoryTransport;
    use quire_delivery::{RetryPolicy, TransportKind};
    use quire_render::DocumentRenderer;
    use quire_source::{MemoryBackend, RawChunk, RawValue};
    use quire_types::{BackendKind, CredentialsRef, PoolBounds};

    fn profile() -> ConnectionProfile {
        ConnectionProfile {
            id: "orders-db".into(),
            backend: BackendKind::Relational,
            host: "localhost".into(),
            port: 5432,
            database: Some("orders".into()),
            credentials: CredentialsRef::new("vault/orders"),
            pool: PoolBounds::default(),
        }
    }

    fn backend() -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::new(BackendKind::Relational).with_dataset(
            "select name, total from orders",
            vec![RawChunk::new(
                vec!["Name".into(), "Total".into()],
                vec![
                    vec![RawValue::Text("widget".into()), RawValue::Integer(12)],
                    vec![RawValue::Text("gadget".into()), RawValue::Integer(3)],
                ],
            )],
        ))
    }

    fn target(id: &str) -> DeliveryTarget {
        DeliveryTarget {
            id: id.into(),
            transport: TransportKind::InMemory,
            address: format!("mem://{id}"),
            credentials: CredentialsRef::new("none"),
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn test_end_to_end_run_delivers_rendered_document() {
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = PipelineBuilder::new()
            .with_backend(backend())
            .with_renderer(Arc::new(DocumentRenderer::new("orders")))
            .with_transport(Arc::clone(&transport) as Arc<dyn Transport>)
            .build();

        let template = Template::parse(
            "Report: {{title}}\n{{#each rows}}{{name}}: {{total}}\n{{/each}}",
        )
        .unwrap();
        let request = RunRequest::new(
            profile(),
            QuerySpec::Sql {
                text: "select name, total from orders".into(),
                params: vec![],
            },
            template,
            OutputFormat::PaginatedDocument,
        )
        .with_bindings(Bindings::new().scalar("title", "Orders"))
        .with_target(target("inbox"));

        let report = pipeline.run(&request).unwrap();
        assert!(report.all_delivered());

        let stored = transport.stored("mem://inbox/orders.txt").unwrap();
        let text = String::from_utf8(stored).unwrap();
        assert!(text.contains("Report: Orders"));
        assert!(text.contains("widget: 12"));
        assert!(text.contains("gadget: 3"));
    }

    #[test]
    fn test_missing_renderer_fails_before_any_side_effect() {
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = PipelineBuilder::new()
            .with_backend(backend())
            .with_transport(Arc::clone(&transport) as Arc<dyn Transport>)
            .build();

        let request = RunRequest::new(
            profile(),
            QuerySpec::Sql {
                text: "select name, total from orders".into(),
                params: vec![],
            },
            Template::parse("{{#each rows}}{{name}}{{/each}}").unwrap(),
            OutputFormat::Spreadsheet,
        )
        .with_target(target("inbox"));

        let err = pipeline.run(&request).unwrap_err();
        assert!(matches!(err, PipelineError::Unconfigured(_)));
        assert_eq!(transport.delivery_count(), 0);
    }

    #[test]
    fn test_template_failure_prevents_delivery() {
        let transport = Arc::new(MemoryTransport::new());
        let pipeline = PipelineBuilder::new()
            .with_backend(backend())
            .with_renderer(Arc::new(DocumentRenderer::new("orders")))
            .with_transport(Arc::clone(&transport) as Arc<dyn Transport>)
            .build();

        // `{{title}}` has no binding and no default.
        let request = RunRequest::new(
            profile(),
            QuerySpec::Sql {
                text: "select name, total from orders".into(),
                params: vec![],
            },
            Template::parse("{{title}}").unwrap(),
            OutputFormat::PaginatedDocument,
        )
        .with_target(target("inbox"));

        let err = pipeline.run(&request).unwrap_err();
        assert!(matches!(err, PipelineError::Template(_)));
        assert_eq!(transport.delivery_count(), 0);
    }

    #[test]
    fn test_pools_are_reused_across_runs() {
        let pipeline = PipelineBuilder::new()
            .with_backend(backend())
            .with_renderer(Arc::new(DocumentRenderer::new("orders")))
            .with_transport(Arc::new(MemoryTransport::new()))
            .build();

        let request = RunRequest::new(
            profile(),
            QuerySpec::Sql {
                text: "select name, total from orders".into(),
                params: vec![],
            },
            Template::parse("{{#each rows}}{{name}}\n{{/each}}").unwrap(),
            OutputFormat::PaginatedDocument,
        );

        pipeline.run(&request).unwrap();
        pipeline.run(&request).unwrap();
        let pools = pipeline.pools.lock().unwrap();
        assert_eq!(pools.len(), 1);
        // Both runs leased from the same pool and returned the session.
        assert_eq!(pools["orders-db"].idle(), 1);
    }
}
