//! Partial include resolution.
//!
//! Templates include partials with a marker, bare or wrapped in an HTML
//! comment so the source stays valid markup:
//!
//! ```text
//! @header.partial.html
//! <!-- @header.partial.html -->
//! ```
//!
//! Each partial renders with its own merged scope
//! (`common` → `"<name>_"` → page scope) and its output replaces the marker.
//!
//! ## Failure handling
//!
//! A marker that cannot be resolved or rendered is left in the output
//! verbatim, so the problem is visible in the generated file, and a
//! [`PartialError`] is recorded. The enclosing template still renders.
//!
//! ## Single pass
//!
//! Match spans are collected from the input text first and the output is
//! rebuilt left to right. Rendered partial text is never rescanned, so a
//! partial cannot include another partial.

use crate::data::DataDocument;
use crate::discover::PartialSet;
use crate::engine::{MergedContext, TemplateEngine};
use regex::Regex;
use serde_json::{Map, Value};
use std::fs;
use std::ops::Range;
use thiserror::Error;

/// Per-marker, non-fatal partial failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartialError {
    #[error("Partial not found: {file_name} (included by \"{template}\")")]
    NotFound { file_name: String, template: String },
    #[error("Error rendering partial {file_name} (included by \"{template}\"): {message}")]
    Render {
        file_name: String,
        template: String,
        message: String,
    },
}

/// One include marker located in template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Byte span of the whole marker, comment wrapper included.
    pub span: Range<usize>,
    /// `<name>.partial.<ext>`
    pub file_name: String,
}

/// Result of substituting partials into one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substituted {
    pub content: String,
    /// File names of partials that rendered successfully, in marker order.
    pub included: Vec<String>,
    pub errors: Vec<PartialError>,
}

/// Locates include markers for a fixed extension set.
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    pattern: Regex,
}

impl MarkerScanner {
    pub fn new(extensions: &[String]) -> Self {
        let alternatives = extensions
            .iter()
            .map(|ext| regex::escape(ext))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?:<!--\s*)?@([^.\s]+\.partial\.(?:{alternatives}))(?:\s*-->)?");
        Self {
            pattern: Regex::new(&pattern).expect("escaped extension pattern is valid"),
        }
    }

    /// All markers in `text`, left to right, non-overlapping.
    pub fn scan(&self, text: &str) -> Vec<Marker> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                Some(Marker {
                    span: whole.range(),
                    file_name: name.as_str().to_string(),
                })
            })
            .collect()
    }
}

/// Substitutes partial includes using a per-build partial index.
pub struct PartialResolver<'a, E: TemplateEngine + ?Sized> {
    engine: &'a E,
    document: &'a DataDocument,
    partials: &'a PartialSet,
    scanner: MarkerScanner,
}

impl<'a, E: TemplateEngine + ?Sized> PartialResolver<'a, E> {
    pub fn new(
        engine: &'a E,
        document: &'a DataDocument,
        partials: &'a PartialSet,
        extensions: &[String],
    ) -> Self {
        Self {
            engine,
            document,
            partials,
            scanner: MarkerScanner::new(extensions),
        }
    }

    /// Replace every marker in `text` with its rendered partial.
    ///
    /// `template` names the including unit in error messages; `page_scope`
    /// is that unit's page data (highest precedence in the partial's context).
    pub fn substitute(
        &self,
        text: &str,
        template: &str,
        page_scope: Option<&Map<String, Value>>,
    ) -> Substituted {
        let markers = self.scanner.scan(text);
        if markers.is_empty() {
            return Substituted {
                content: text.to_string(),
                ..Substituted::default()
            };
        }

        let mut out = Substituted {
            content: String::with_capacity(text.len()),
            ..Substituted::default()
        };
        let mut cursor = 0;
        for marker in markers {
            out.content.push_str(&text[cursor..marker.span.start]);
            match self.render_partial(&marker.file_name, template, page_scope) {
                Ok(rendered) => {
                    out.content.push_str(&rendered);
                    out.included.push(marker.file_name);
                }
                Err(err) => {
                    out.content.push_str(&text[marker.span.clone()]);
                    out.errors.push(err);
                }
            }
            cursor = marker.span.end;
        }
        out.content.push_str(&text[cursor..]);
        out
    }

    fn render_partial(
        &self,
        file_name: &str,
        template: &str,
        page_scope: Option<&Map<String, Value>>,
    ) -> Result<String, PartialError> {
        let Some(partial) = self.partials.get(file_name) else {
            return Err(PartialError::NotFound {
                file_name: file_name.to_string(),
                template: template.to_string(),
            });
        };
        let render_err = |message: String| PartialError::Render {
            file_name: file_name.to_string(),
            template: template.to_string(),
            message,
        };

        let source = fs::read_to_string(&partial.full_path).map_err(|e| render_err(e.to_string()))?;
        let scope_key = format!("{}_", partial.name);
        let context = MergedContext::new(self.document)
            .layer(self.document.object(&scope_key))
            .layer(page_scope);
        self.engine
            .render(&source, &context)
            .map_err(|e| render_err(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::discover;
    use crate::engine::HandlebarsEngine;
    use crate::engine::tests::MockEngine;
    use crate::test_helpers::{exts, write_file};
    use serde_json::json;
    use tempfile::TempDir;

    fn scanner() -> MarkerScanner {
        MarkerScanner::new(&exts(&["html", "css"]))
    }

    #[test]
    fn scan_bare_and_commented_markers() {
        let text = "a @header.partial.html b <!-- @footer.partial.html --> c";
        let markers = scanner().scan(text);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].file_name, "header.partial.html");
        assert_eq!(&text[markers[0].span.clone()], "@header.partial.html");
        assert_eq!(markers[1].file_name, "footer.partial.html");
        assert_eq!(&text[markers[1].span.clone()], "<!-- @footer.partial.html -->");
    }

    #[test]
    fn scan_only_configured_extensions() {
        let markers = scanner().scan("@a.partial.css @b.partial.json @c.partial.html");
        let names: Vec<&str> = markers.iter().map(|m| m.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.partial.css", "c.partial.html"]);
    }

    #[test]
    fn scan_ignores_non_markers() {
        assert!(scanner().scan("email me@example.com, @decorator, header.partial.html").is_empty());
    }

    #[test]
    fn scan_escapes_extension_metacharacters() {
        let scanner = MarkerScanner::new(&exts(&["h+ml"]));
        assert_eq!(scanner.scan("@x.partial.h+ml").len(), 1);
        assert!(scanner.scan("@x.partial.hhml").is_empty());
    }

    struct Site {
        _tmp: TempDir,
        partials: PartialSet,
    }

    fn site(files: &[(&str, &str)]) -> Site {
        let tmp = TempDir::new().unwrap();
        for (path, content) in files {
            write_file(tmp.path(), path, content);
        }
        let partials = discover(tmp.path(), &exts(&["html"])).unwrap().partials;
        Site { _tmp: tmp, partials }
    }

    #[test]
    fn partial_scope_precedence() {
        let site = site(&[("header.partial.html", "<h1>{{x}}</h1>")]);
        let doc = DataDocument::from_value(json!({
            "common": {"x": 1},
            "header_": {"x": 2},
            "index": {"x": 3}
        }))
        .unwrap();
        let engine = HandlebarsEngine::new();
        let resolver = PartialResolver::new(&engine, &doc, &site.partials, &exts(&["html"]));

        let out = resolver.substitute("@header.partial.html", "index", doc.object("index"));
        assert_eq!(out.content, "<h1>3</h1>");
        assert!(out.errors.is_empty());

        // Without page data, the partial scope wins over common.
        let out = resolver.substitute("@header.partial.html", "index", None);
        assert_eq!(out.content, "<h1>2</h1>");
    }

    #[test]
    fn missing_partial_keeps_marker_text() {
        let site = site(&[("header.partial.html", "H")]);
        let doc = DataDocument::from_value(json!({"common": {}})).unwrap();
        let engine = MockEngine::default();
        let resolver = PartialResolver::new(&engine, &doc, &site.partials, &exts(&["html"]));

        let text = "<!-- @missing.partial.html -->|@header.partial.html|tail";
        let out = resolver.substitute(text, "index", None);
        assert_eq!(out.content, "<!-- @missing.partial.html -->|H|tail");
        assert_eq!(out.included, vec!["header.partial.html"]);
        assert_eq!(
            out.errors,
            vec![PartialError::NotFound {
                file_name: "missing.partial.html".into(),
                template: "index".into(),
            }]
        );
    }

    #[test]
    fn render_failure_keeps_marker_text() {
        let site = site(&[("bad.partial.html", "BOOM")]);
        let doc = DataDocument::from_value(json!({"common": {}})).unwrap();
        let engine = MockEngine::failing_on("BOOM");
        let resolver = PartialResolver::new(&engine, &doc, &site.partials, &exts(&["html"]));

        let out = resolver.substitute("a @bad.partial.html b", "page", None);
        assert_eq!(out.content, "a @bad.partial.html b");
        assert!(matches!(&out.errors[..], [PartialError::Render { file_name, .. }] if file_name == "bad.partial.html"));
    }

    #[test]
    fn repeated_markers_each_substituted() {
        let site = site(&[("hr.partial.html", "<hr>")]);
        let doc = DataDocument::from_value(json!({"common": {}})).unwrap();
        let engine = MockEngine::default();
        let resolver = PartialResolver::new(&engine, &doc, &site.partials, &exts(&["html"]));

        let out = resolver.substitute("@hr.partial.html x @hr.partial.html", "p", None);
        assert_eq!(out.content, "<hr> x <hr>");
        assert_eq!(out.included.len(), 2);
    }

    #[test]
    fn rendered_output_is_not_rescanned() {
        // The partial's output looks like a marker; it must stay literal.
        let site = site(&[
            ("a.partial.html", "@b.partial.html"),
            ("b.partial.html", "B"),
        ]);
        let doc = DataDocument::from_value(json!({"common": {}})).unwrap();
        let engine = MockEngine::default();
        let resolver = PartialResolver::new(&engine, &doc, &site.partials, &exts(&["html"]));

        let out = resolver.substitute("[@a.partial.html]", "p", None);
        assert_eq!(out.content, "[@b.partial.html]");
        assert_eq!(out.included, vec!["a.partial.html"]);
    }

    #[test]
    fn text_without_markers_is_unchanged() {
        let site = site(&[]);
        let doc = DataDocument::from_value(json!({"common": {}})).unwrap();
        let engine = MockEngine::default();
        let resolver = PartialResolver::new(&engine, &doc, &site.partials, &exts(&["html"]));

        let out = resolver.substitute("plain {{text}}", "p", None);
        assert_eq!(out.content, "plain {{text}}");
        assert!(engine.rendered.lock().unwrap().is_empty());
    }
}
