//! The paginated-document renderer.

use crate::{OutputFormat, RenderError, Renderer};
use handlebars::{no_escape, Handlebars};
use log::debug;
use quire_template::RenderModel;
use quire_types::Artifact;

const DEFAULT_LINES_PER_PAGE: usize = 60;

/// Renders a model into a paginated plain-text document.
///
/// The template markup is substituted via handlebars (strict mode, no
/// escaping, since the output is not HTML) and the result is split into
/// pages
/// of a fixed line count, separated by form feeds. Visual layout is out of
/// scope; pagination here is the deterministic line-count kind.
pub struct DocumentRenderer {
    document_name: String,
    lines_per_page: usize,
}

impl DocumentRenderer {
    pub fn new(document_name: impl Into<String>) -> Self {
        Self {
            document_name: document_name.into(),
            lines_per_page: DEFAULT_LINES_PER_PAGE,
        }
    }

    pub fn with_lines_per_page(mut self, lines: usize) -> Self {
        self.lines_per_page = lines.max(1);
        self
    }

    fn substitute(&self, model: &RenderModel) -> Result<String, RenderError> {
        let mut engine = Handlebars::new();
        engine.set_strict_mode(true);
        engine.register_escape_fn(no_escape);
        Ok(engine.render_template(model.template_text(), &model.to_binding_json())?)
    }

    fn paginate(&self, text: &str) -> String {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() <= self.lines_per_page {
            return text.to_string();
        }
        let mut paged = lines
            .chunks(self.lines_per_page)
            .map(|page| page.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\u{0c}");
        // Pagination only inserts form feeds; the original terminator stays.
        if text.ends_with('\n') {
            paged.push('\n');
        }
        paged
    }
}

impl Renderer for DocumentRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::PaginatedDocument
    }

    fn render(&self, model: &RenderModel) -> Result<Artifact, RenderError> {
        let substituted = self.substitute(model)?;
        let paginated = self.paginate(&substituted);
        debug!(
            "[RENDER] Document '{}': {} bytes",
            self.document_name,
            paginated.len()
        );
        Ok(Artifact::new(
            paginated.into_bytes(),
            self.format().content_type(),
            format!("{}.{}", self.document_name, self.format().extension()),
        ))
    }

    fn name(&self) -> &'static str {
        "DocumentRenderer"
    }
}
