//! quire: a tabular report pipeline.
//!
//! Fetches tabular data from a pluggable backend through a bounded
//! connection pool, normalizes it into a canonical row set, binds it into
//! a validated template, renders an immutable artifact and delivers it to
//! one or more targets with per-target retry.
//!
//! The integration surface lives here: [`Pipeline`] / [`PipelineBuilder`]
//! for running reports, [`Registry`] for registering backends and
//! renderers, and [`PipelineError`] aggregating every stage's failures.
//! The stage implementations live in the member crates, re-exported below.

pub mod error;
pub mod pipeline;
pub mod registry;

pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineBuilder, RunRequest};
pub use registry::Registry;

// Re-export the member crates so callers depend on `quire` alone.
pub use quire_delivery as delivery;
pub use quire_normalize as normalize;
pub use quire_pool as pool;
pub use quire_render as render;
pub use quire_source as source;
pub use quire_template as template;
pub use quire_types as types;
