//! Template parsing: the placeholder scanner.

use crate::TemplateError;
use quire_types::CellValue;
use std::collections::BTreeMap;

/// A named slot in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub name: String,
    /// Required placeholders without a binding or default fail resolution.
    pub required: bool,
    /// Fallback value used when no binding is provided.
    pub default: Option<CellValue>,
    /// Repeated-section placeholders bind a row set instead of a scalar.
    pub repeated: bool,
}

/// A parsed template: opaque markup plus the placeholders scanned from it.
///
/// Placeholder names are unique within one template; a name cannot be both
/// a scalar and a repeated section.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    text: String,
    placeholders: BTreeMap<String, Placeholder>,
}

impl Template {
    /// Scan the template text for placeholder syntax.
    ///
    /// Every scanned placeholder starts out required with no default; use
    /// [`Template::with_default`] and [`Template::with_optional`] to relax
    /// individual slots.
    pub fn parse(text: impl Into<String>) -> Result<Self, TemplateError> {
        let text = text.into();
        let placeholders = scan(&text)?;
        Ok(Self { text, placeholders })
    }

    /// Declare a default value for a scanned scalar placeholder.
    pub fn with_default(
        mut self,
        name: &str,
        value: impl Into<CellValue>,
    ) -> Result<Self, TemplateError> {
        let slot = self.scalar_slot(name)?;
        slot.default = Some(value.into());
        Ok(self)
    }

    /// Mark a scanned scalar placeholder optional: missing bindings
    /// resolve to null instead of failing.
    pub fn with_optional(mut self, name: &str) -> Result<Self, TemplateError> {
        let slot = self.scalar_slot(name)?;
        slot.required = false;
        Ok(self)
    }

    fn scalar_slot(&mut self, name: &str) -> Result<&mut Placeholder, TemplateError> {
        let slot = self
            .placeholders
            .get_mut(name)
            .ok_or_else(|| TemplateError::UnknownPlaceholder(name.to_string()))?;
        if slot.repeated {
            return Err(TemplateError::KindMismatch {
                name: name.to_string(),
                expected: "row set",
            });
        }
        Ok(slot)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.placeholders.values()
    }

    pub fn placeholder(&self, name: &str) -> Option<&Placeholder> {
        self.placeholders.get(name)
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Scan `text` for `{{...}}` expressions.
///
/// Idents inside a `{{#each}}` section are column references, not
/// template placeholders, so they are deliberately not recorded.
fn scan(text: &str) -> Result<BTreeMap<String, Placeholder>, TemplateError> {
    let mut placeholders: BTreeMap<String, Placeholder> = BTreeMap::new();
    let mut open_section: Option<String> = None;
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(TemplateError::InvalidPlaceholder(
                after.chars().take(24).collect(),
            ));
        };
        let expr = after[..end].trim();
        rest = &after[end + 2..];

        if let Some(section) = expr.strip_prefix("#each ") {
            let name = section.trim();
            if !is_ident(name) {
                return Err(TemplateError::InvalidPlaceholder(expr.to_string()));
            }
            if open_section.is_some() {
                return Err(TemplateError::UnbalancedSection(format!(
                    "section '{name}' opened inside another section"
                )));
            }
            insert(&mut placeholders, name, true)?;
            open_section = Some(name.to_string());
        } else if expr == "/each" {
            if open_section.take().is_none() {
                return Err(TemplateError::UnbalancedSection(
                    "'{{/each}}' without an open section".to_string(),
                ));
            }
        } else {
            if !is_ident(expr) {
                return Err(TemplateError::InvalidPlaceholder(expr.to_string()));
            }
            if open_section.is_none() {
                insert(&mut placeholders, expr, false)?;
            }
        }
    }

    if let Some(name) = open_section {
        return Err(TemplateError::UnbalancedSection(format!(
            "section '{name}' is never closed"
        )));
    }
    Ok(placeholders)
}

fn insert(
    placeholders: &mut BTreeMap<String, Placeholder>,
    name: &str,
    repeated: bool,
) -> Result<(), TemplateError> {
    if let Some(existing) = placeholders.get(name) {
        if existing.repeated != repeated {
            return Err(TemplateError::DuplicateName(name.to_string()));
        }
        return Ok(());
    }
    placeholders.insert(
        name.to_string(),
        Placeholder {
            name: name.to_string(),
            required: true,
            default: None,
            repeated,
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_scalars() {
        let t = Template::parse("Hello {{name}}, total: {{total}}").unwrap();
        let names: Vec<&str> = t.placeholders().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "total"]);
        assert!(t.placeholder("name").unwrap().required);
        assert!(!t.placeholder("name").unwrap().repeated);
    }

    #[test]
    fn test_scan_repeated_section() {
        let t = Template::parse("{{#each rows}}{{id}}: {{label}}\n{{/each}}").unwrap();
        assert!(t.placeholder("rows").unwrap().repeated);
        // Column refs inside the section are not template placeholders.
        assert!(t.placeholder("id").is_none());
        assert!(t.placeholder("label").is_none());
    }

    #[test]
    fn test_same_scalar_twice_is_one_placeholder() {
        let t = Template::parse("{{name}} and {{name}}").unwrap();
        assert_eq!(t.placeholders().count(), 1);
    }

    #[test]
    fn test_name_as_scalar_and_section_rejected() {
        let err = Template::parse("{{rows}} {{#each rows}}{{/each}}").unwrap_err();
        assert_eq!(err, TemplateError::DuplicateName("rows".into()));
    }

    #[test]
    fn test_unclosed_section_rejected() {
        let err = Template::parse("{{#each rows}}{{id}}").unwrap_err();
        assert!(matches!(err, TemplateError::UnbalancedSection(_)));
    }

    #[test]
    fn test_stray_close_rejected() {
        let err = Template::parse("text {{/each}}").unwrap_err();
        assert!(matches!(err, TemplateError::UnbalancedSection(_)));
    }

    #[test]
    fn test_nested_sections_rejected() {
        let err =
            Template::parse("{{#each a}}{{#each b}}{{/each}}{{/each}}").unwrap_err();
        assert!(matches!(err, TemplateError::UnbalancedSection(_)));
    }

    #[test]
    fn test_invalid_ident_rejected() {
        let err = Template::parse("{{9lives}}").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidPlaceholder(_)));
    }

    #[test]
    fn test_unterminated_braces_rejected() {
        let err = Template::parse("Hello {{name").unwrap_err();
        assert!(matches!(err, TemplateError::InvalidPlaceholder(_)));
    }

    #[test]
    fn test_with_default_and_optional() {
        let t = Template::parse("{{greeting}} {{name}}")
            .unwrap()
            .with_default("greeting", "Hello")
            .unwrap()
            .with_optional("name")
            .unwrap();
        assert_eq!(
            t.placeholder("greeting").unwrap().default,
            Some(CellValue::Text("Hello".into()))
        );
        assert!(!t.placeholder("name").unwrap().required);
    }

    #[test]
    fn test_with_default_on_unknown_placeholder() {
        let err = Template::parse("{{a}}")
            .unwrap()
            .with_default("b", 1i64)
            .unwrap_err();
        assert_eq!(err, TemplateError::UnknownPlaceholder("b".into()));
    }

    #[test]
    fn test_plain_markup_has_no_placeholders() {
        let t = Template::parse("no slots here").unwrap();
        assert_eq!(t.placeholders().count(), 0);
    }
}
