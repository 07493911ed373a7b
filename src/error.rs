// src/error.rs
use quire_normalize::NormalizeError;
use quire_pool::PoolError;
use quire_render::RenderError;
use quire_source::SourceError;
use quire_template::TemplateError;
use thiserror::Error;

/// A comprehensive error type for the entire report pipeline.
///
/// Stages one through four (acquire, fetch, normalize, resolve, render)
/// fail fast through this type; the delivery stage fails soft and reports
/// per-target outcomes instead of erroring.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Connection pooling failed: {0}")]
    Pool(#[from] PoolError),

    #[error("Source fetch failed: {0}")]
    Source(#[from] SourceError),

    #[error("Normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("Template resolution failed: {0}")]
    Template(#[from] TemplateError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Pipeline is missing a registration: {0}")]
    Unconfigured(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
