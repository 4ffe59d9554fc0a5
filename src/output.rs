//! CLI output formatting for builds.
//!
//! # Output Format
//!
//! ## Progress
//!
//! Printed as events arrive from render workers, so unit lines may interleave
//! in any order:
//!
//! ```text
//! Found 3 templates, 2 partials
//! product* → 2 pages
//! ✓ index.html
//!     Partial: header.partial.html
//! ✓ shop/product.laptop.html
//! ✗ Missing data for template "about". No matching key found in JSON data file.
//! ```
//!
//! ## Summary
//!
//! ```text
//! Build Summary
//!     Templates found: 3
//!     Partials found: 2
//!     Rendered: 3 (2 from wildcards)
//!     Skipped: 1
//!     Partials used: header.partial.html
//!     Time: 12ms
//!
//! Errors (1)
//!     Missing data for template "about". No matching key found in JSON data file.
//!
//! Build completed with 1 error
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::build::{BuildEvent, BuildReport};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 template`, `2 templates`.
fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// Output paths always display with `/`, whatever the platform.
fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

// ============================================================================
// Progress events
// ============================================================================

/// Format a single build progress event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::TemplatesDiscovered {
            templates,
            partials,
        } => vec![format!(
            "Found {}, {}",
            count(*templates, "template"),
            count(*partials, "partial")
        )],
        BuildEvent::WildcardExpanded { key, count: n } => {
            vec![format!("{key}* → {}", count(*n, "page"))]
        }
        BuildEvent::UnitRendered { output, partials } => {
            let mut lines = vec![format!("✓ {}", display_path(output))];
            lines.extend(
                partials
                    .iter()
                    .map(|p| format!("{}Partial: {p}", indent(1))),
            );
            lines
        }
        BuildEvent::UnitFailed { message } => vec![format!("✗ {message}")],
        BuildEvent::PartialFailed { message } => {
            vec![format!("{}✗ {message}", indent(1))]
        }
    }
}

pub fn print_build_event(event: &BuildEvent) {
    for line in format_build_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the end-of-build summary: counts, then every error verbatim.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = vec!["Build Summary".to_string()];
    let i = indent(1);
    lines.push(format!("{i}Templates found: {}", report.templates_found));
    lines.push(format!("{i}Partials found: {}", report.partials_found));
    if report.wildcard_generated > 0 {
        lines.push(format!(
            "{i}Rendered: {} ({} from wildcards)",
            report.rendered, report.wildcard_generated
        ));
    } else {
        lines.push(format!("{i}Rendered: {}", report.rendered));
    }
    if report.skipped > 0 {
        lines.push(format!("{i}Skipped: {}", report.skipped));
    }
    if !report.partials_used.is_empty() {
        let used: Vec<&str> = report.partials_used.iter().map(String::as_str).collect();
        lines.push(format!("{i}Partials used: {}", used.join(", ")));
    }
    lines.push(format!("{i}Time: {}", format_elapsed(report.elapsed)));

    if !report.errors.is_empty() {
        lines.push(String::new());
        lines.push(format!("Errors ({})", report.errors.len()));
        for err in &report.errors {
            lines.push(format!("{i}{err}"));
        }
    }

    lines.push(String::new());
    if report.is_success() {
        lines.push("Build completed successfully".to_string());
    } else {
        lines.push(format!(
            "Build completed with {}",
            count(report.errors.len(), "error")
        ));
    }
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
