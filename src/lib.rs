//! # Minty
//!
//! A data-driven static site generator. A directory of templates plus one
//! JSON data document go in; a directory of rendered files comes out.
//!
//! ```text
//! site/                               data.json
//! ├── index.template.html      ◄───   "index":    {...}
//! ├── shop/product.template.html ◄─   "product*": {"laptop": {...}, "phone": {...}}
//! ├── header.partial.html      ◄───   "header_":  {...}
//! └── logo.svg                        "common":   {...}   (every page)
//!
//!                  minty build
//!                       ▼
//! dist/
//! ├── index.html
//! ├── shop/product.laptop.html
//! ├── shop/product.phone.html
//! ├── header.partial.html
//! └── logo.svg
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `minty.toml` loading, stock defaults, merging, validation |
//! | [`data`] | Loads and validates the JSON data document (local file or URL) |
//! | [`discover`] | Walks the root directory for `*.template.<ext>` and `*.partial.<ext>` |
//! | [`wildcard`] | Regular vs wildcard mode; fans a template out into render units |
//! | [`engine`] | Template engine port, Handlebars implementation, merged render context |
//! | [`partials`] | Finds include markers and substitutes rendered partials |
//! | [`render`] | Renders one unit: page data, partials, engine |
//! | [`files`] | Dist cleaning, static asset copying, output writers |
//! | [`build`] | Orchestrates a build and produces a [`build::BuildReport`] |
//! | [`output`] | CLI output formatting for progress events and the summary |
//!
//! # Design Decisions
//!
//! ## Data Shapes, the Engine Renders
//!
//! Minty never interprets template syntax. It decides *which* data a template
//! sees (`$database` → `common` → partial scope → page scope, shallow) and
//! hands that context to a [`engine::TemplateEngine`]. Conditionals,
//! iteration and escaping belong to the engine.
//!
//! ## One Engine Per Build
//!
//! Helpers such as `range` are registered on the engine instance when it is
//! created. Nothing is registered globally, so two builds in one process can
//! never see each other's helpers.
//!
//! ## Errors Are Data
//!
//! Setup problems (bad config, unreadable data, unreadable root) abort the
//! build. Everything after that is per unit: a template with no data, a
//! missing partial or a failed write is recorded in the report and the rest
//! of the site still renders. The CLI exits non-zero if anything was recorded.
//!
//! ## Plan, Then Render in Parallel
//!
//! Units are planned sequentially, so output collisions are rejected before
//! any file is written. Rendering then runs on a rayon pool over shared,
//! read-only inputs, and results are collected back in plan order.

pub mod build;
pub mod config;
pub mod data;
pub mod discover;
pub mod engine;
pub mod files;
pub mod output;
pub mod partials;
pub mod render;
pub mod wildcard;

#[cfg(test)]
pub(crate) mod test_helpers;
