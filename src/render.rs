//! Rendering a single unit.
//!
//! A unit is one template in regular mode, or one `(template, sub_key)` pair
//! in wildcard mode. Rendering is:
//!
//! 1. look up page data ([`wildcard::page_data`])
//! 2. read the template file
//! 3. substitute partial includes ([`PartialResolver`])
//! 4. render through the engine with `$database` → `common` → page data
//!
//! Every failure comes back as a [`RenderError`] value; nothing panics and
//! nothing is written here.

use crate::data::DataDocument;
use crate::discover::{PartialSet, TemplateDescriptor};
use crate::engine::{MergedContext, TemplateEngine};
use crate::partials::{PartialError, PartialResolver};
use crate::wildcard;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(
        "Missing data for template \"{key}\". No matching key found in JSON data file."
    )]
    TemplateDataMissing { key: String },
    #[error("Missing data for wildcard template \"{key}\" with sub-key \"{sub_key}\".")]
    SubKeyDataMissing { key: String, sub_key: String },
    #[error("Cannot read template {}: {source}", path.display())]
    TemplateUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to render template \"{label}\": {message}")]
    Engine { label: String, message: String },
}

/// Successful render of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub content: String,
    /// Partials substituted into this unit, in marker order.
    pub partials: Vec<String>,
    /// Markers left in place because they could not be resolved or rendered.
    pub partial_errors: Vec<PartialError>,
}

pub type RenderResult = Result<Rendered, RenderError>;

/// Renders units against one data document with one engine.
pub struct Renderer<'a, E: TemplateEngine + ?Sized> {
    engine: &'a E,
    document: &'a DataDocument,
    partials: Option<PartialResolver<'a, E>>,
}

impl<'a, E: TemplateEngine + ?Sized> Renderer<'a, E> {
    /// A renderer without partial support: markers pass through to the engine.
    pub fn new(engine: &'a E, document: &'a DataDocument) -> Self {
        Self {
            engine,
            document,
            partials: None,
        }
    }

    /// Enable partial substitution using a per-build partial index.
    pub fn with_partials(mut self, partials: &'a PartialSet, extensions: &[String]) -> Self {
        self.partials = Some(PartialResolver::new(
            self.engine,
            self.document,
            partials,
            extensions,
        ));
        self
    }

    pub fn render(&self, template: &TemplateDescriptor, sub_key: Option<&str>) -> RenderResult {
        let key = &template.key_name;
        let page = wildcard::page_data(self.document, key, sub_key).ok_or_else(|| {
            match sub_key {
                Some(sub) => RenderError::SubKeyDataMissing {
                    key: key.clone(),
                    sub_key: sub.to_string(),
                },
                None => RenderError::TemplateDataMissing { key: key.clone() },
            }
        })?;

        let source = fs::read_to_string(&template.full_path).map_err(|source| {
            RenderError::TemplateUnreadable {
                path: template.full_path.clone(),
                source,
            }
        })?;

        let label = match sub_key {
            Some(sub) => format!("{key}[{sub}]"),
            None => key.clone(),
        };

        let (source, partials, partial_errors) = match &self.partials {
            Some(resolver) => {
                let substituted = resolver.substitute(&source, &label, Some(page));
                (
                    substituted.content,
                    substituted.included,
                    substituted.errors,
                )
            }
            None => (source, Vec::new(), Vec::new()),
        };

        let context = MergedContext::new(self.document).layer(Some(page));
        let content = self
            .engine
            .render(&source, &context)
            .map_err(|e| RenderError::Engine {
                label,
                message: e.to_string(),
            })?;

        Ok(Rendered {
            content,
            partials,
            partial_errors,
        })
    }
}
