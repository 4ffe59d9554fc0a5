//! Template engine port and merged render context.
//!
//! The [`TemplateEngine`] trait is the seam between Minty's orchestration and
//! the template language. Minty only shapes data; interpolation, conditionals
//! and iteration belong to the engine. The production implementation is
//! [`HandlebarsEngine`].
//!
//! ## Helpers
//!
//! Helpers are registered on the engine instance when it is constructed. One
//! registry per build, no process-wide state. The one helper that is part of
//! Minty's contract is `range`:
//!
//! ```text
//! {{#each (range 3)}}<li>{{this}}</li>{{/each}}   →   <li>0</li><li>1</li><li>2</li>
//! ```
//!
//! ## Context layering
//!
//! [`MergedContext`] is built in increasing precedence, each layer shadowing
//! the previous one key-by-key (shallow):
//!
//! ```text
//! $database  →  common  →  partial scope ("<name>_")  →  page scope
//! ```

use crate::data::DataDocument;
use handlebars::{Handlebars, handlebars_helper};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Key under which the whole raw data document is exposed to templates.
pub const DATABASE_KEY: &str = "$database";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Handlebars(#[from] Box<handlebars::RenderError>),
    #[error("{0}")]
    Other(String),
}

/// Compiles template text and executes it against a context.
///
/// Implementations must be `Sync`: one engine instance is shared by every
/// render worker in a build.
pub trait TemplateEngine: Sync {
    fn render(&self, source: &str, context: &MergedContext<'_>) -> Result<String, EngineError>;
}

handlebars_helper!(range: |n: u64| (0..n).collect::<Vec<u64>>());

/// Handlebars-backed engine with Minty's helpers registered.
pub struct HandlebarsEngine {
    registry: Handlebars<'static>,
}

impl HandlebarsEngine {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_helper("range", Box::new(range));
        Self { registry }
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, source: &str, context: &MergedContext<'_>) -> Result<String, EngineError> {
        self.registry
            .render_template(source, context)
            .map_err(|e| EngineError::Handlebars(Box::new(e)))
    }
}

/// The key-value mapping handed to the engine for one render.
///
/// Borrows from the data document; nothing is cloned until the engine
/// serializes it.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct MergedContext<'a> {
    entries: BTreeMap<&'a str, &'a Value>,
}

impl<'a> MergedContext<'a> {
    /// Base context: `$database` plus the `common` layer.
    pub fn new(document: &'a DataDocument) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(DATABASE_KEY, document.as_value());
        let ctx = Self { entries };
        ctx.layer(Some(document.common()))
    }

    /// Shadow existing keys with `scope`. `None` leaves the context unchanged.
    pub fn layer(mut self, scope: Option<&'a Map<String, Value>>) -> Self {
        if let Some(scope) = scope {
            for (key, value) in scope {
                self.entries.insert(key.as_str(), value);
            }
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.entries.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.keys().copied()
    }
}
