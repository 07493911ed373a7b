//! Template management: binding retrieved data into a document template
//! with validated placeholders.
//!
//! A [`Template`] is opaque markup owned by the caller; the only syntax
//! parsed here is the placeholder syntax:
//!
//! - `{{name}}`: a scalar placeholder;
//! - `{{#each name}} ... {{/each}}`: a repeated section bound to a
//!   [`RowSet`](quire_types::RowSet); idents inside the section refer to
//!   the row set's columns.
//!
//! [`TemplateManager::resolve`] matches placeholders against a
//! [`Bindings`] map and produces a [`RenderModel`] atomically: a missing
//! required binding fails the whole resolution and no model is returned.

mod model;
mod template;

pub use model::{Bindings, RenderModel, Resolved, TemplateWarning};
pub use template::{Placeholder, Template};

use thiserror::Error;

/// Errors from template parsing and resolution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("missing binding for required placeholder '{name}'")]
    MissingBinding { name: String },

    #[error("placeholder '{0}' is declared both as a scalar and a repeated section")]
    DuplicateName(String),

    #[error("invalid placeholder expression '{0}'")]
    InvalidPlaceholder(String),

    #[error("unbalanced repeated section: {0}")]
    UnbalancedSection(String),

    #[error("unknown placeholder '{0}'")]
    UnknownPlaceholder(String),

    #[error("placeholder '{name}' expects a {expected} binding")]
    KindMismatch { name: String, expected: &'static str },
}

/// Resolves templates against data bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateManager;

impl TemplateManager {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a template against bindings, producing a render model.
    ///
    /// Validation is atomic: any required placeholder without a binding
    /// and without a default fails the whole call. Unreferenced bindings
    /// are ignored and reported as warnings.
    pub fn resolve(
        &self,
        template: &Template,
        bindings: &Bindings,
    ) -> Result<Resolved, TemplateError> {
        model::resolve(template, bindings)
    }
}
