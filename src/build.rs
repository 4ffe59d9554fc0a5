//! Build orchestration.
//!
//! ```text
//! config ──► load data ──► clear dist ──► copy static ──► discover
//!                                                            │
//!        ┌───────────────────────────────────────────────────┘
//!        ▼
//!   plan units (wildcard fan-out, sub-key + collision checks)   sequential
//!        ▼
//!   render + write each unit                                    rayon
//!        ▼
//!   BuildReport (counts, errors in plan order, elapsed)
//! ```
//!
//! Setup failures (config, data, discovery, dist preparation) abort the build
//! with a [`BuildError`]. Everything after planning is per-unit: a failing unit
//! is recorded as a [`UnitError`] and skipped, and all other units still
//! render. A failed unit never produces an output file.
//!
//! Planning runs before the parallel phase, so every output path is claimed
//! exactly once and no two workers ever write the same file.

use crate::config::SiteConfig;
use crate::data::{self, DataDocument, DataError};
use crate::discover::{self, DiscoverError, Discovery};
use crate::engine::{HandlebarsEngine, TemplateEngine};
use crate::files::{self, DiscardWriter, DistWriter, OutputWriter};
use crate::partials::PartialError;
use crate::render::{RenderError, Renderer};
use crate::wildcard::{self, RenderUnit};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Fatal errors: the build stops before rendering anything.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Discovery error: {0}")]
    Discover(#[from] DiscoverError),
    #[error("Cannot prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Non-fatal, per-unit (or per-marker) errors collected into the report.
#[derive(Error, Debug)]
pub enum UnitError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Partial(#[from] PartialError),
    #[error("Invalid sub-key \"{sub_key}\" in \"{key}*\": {reason}")]
    InvalidSubKey {
        key: String,
        sub_key: String,
        reason: &'static str,
    },
    #[error("Output {} from \"{label}\" collides with \"{claimed_by}\"", path.display())]
    OutputCollision {
        path: PathBuf,
        label: String,
        claimed_by: String,
    },
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Progress events emitted while rendering.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    TemplatesDiscovered { templates: usize, partials: usize },
    WildcardExpanded { key: String, count: usize },
    UnitRendered { output: PathBuf, partials: Vec<String> },
    UnitFailed { message: String },
    PartialFailed { message: String },
}

/// Aggregate outcome of a build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub templates_found: usize,
    pub partials_found: usize,
    /// Units written successfully (including wildcard units).
    pub rendered: usize,
    /// Units that failed and were not written.
    pub skipped: usize,
    /// Units produced by wildcard templates (subset of `rendered`).
    pub wildcard_generated: usize,
    /// Partial file names substituted at least once.
    pub partials_used: BTreeSet<String>,
    /// Outputs written, in plan order.
    pub outputs: Vec<PathBuf>,
    pub errors: Vec<UnitError>,
    pub elapsed: Duration,
}

impl BuildReport {
    /// A build succeeds only with zero non-fatal errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

fn emit(events: &Option<Sender<BuildEvent>>, event: BuildEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

/// Outcome of one planned unit, produced on a worker.
enum UnitOutcome {
    Written {
        output: PathBuf,
        wildcard: bool,
        partials: Vec<String>,
        partial_errors: Vec<PartialError>,
    },
    Failed(UnitError),
}

/// Plan every unit: wildcard fan-out, sub-key validation, collision checks.
fn plan<'a>(
    templates: &'a [discover::TemplateDescriptor],
    document: &DataDocument,
    events: &Option<Sender<BuildEvent>>,
    errors: &mut Vec<UnitError>,
) -> Vec<RenderUnit<'a>> {
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();
    let mut planned = Vec::new();

    for template in templates {
        let (units, rejected) = wildcard::expand(template, document);
        if matches!(
            wildcard::detect(&template.key_name, document),
            wildcard::RenderMode::Wildcard { .. }
        ) {
            emit(
                events,
                BuildEvent::WildcardExpanded {
                    key: template.key_name.clone(),
                    count: units.len(),
                },
            );
        }
        for r in rejected {
            errors.push(UnitError::InvalidSubKey {
                key: template.key_name.clone(),
                sub_key: r.sub_key,
                reason: r.reason,
            });
        }
        for unit in units {
            let label = unit.label();
            if let Some(claimed_by) = claimed.get(&unit.output_path) {
                errors.push(UnitError::OutputCollision {
                    path: unit.output_path.clone(),
                    label,
                    claimed_by: claimed_by.clone(),
                });
                continue;
            }
            claimed.insert(unit.output_path.clone(), label);
            planned.push(unit);
        }
    }
    planned
}

/// Render every discovered template and hand the results to `writer`.
///
/// Never fails: every problem ends up in [`BuildReport::errors`].
pub fn render_site<E, W>(
    engine: &E,
    document: &DataDocument,
    discovery: &Discovery,
    extensions: &[String],
    writer: &W,
    events: Option<Sender<BuildEvent>>,
) -> BuildReport
where
    E: TemplateEngine + ?Sized,
    W: OutputWriter + ?Sized,
{
    let start = Instant::now();
    let mut report = BuildReport {
        templates_found: discovery.templates.len(),
        partials_found: discovery.partials.len(),
        ..BuildReport::default()
    };
    emit(
        &events,
        BuildEvent::TemplatesDiscovered {
            templates: report.templates_found,
            partials: report.partials_found,
        },
    );

    let mut planning_errors = Vec::new();
    let units = plan(&discovery.templates, document, &events, &mut planning_errors);
    report.skipped += planning_errors.len();
    for err in &planning_errors {
        emit(&events, BuildEvent::UnitFailed { message: err.to_string() });
    }
    report.errors.extend(planning_errors);

    let renderer = Renderer::new(engine, document).with_partials(&discovery.partials, extensions);

    let outcomes: Vec<UnitOutcome> = units
        .par_iter()
        .map(|unit| {
            let outcome = render_unit(&renderer, unit, writer);
            match &outcome {
                UnitOutcome::Written {
                    output,
                    partials,
                    partial_errors,
                    ..
                } => {
                    for err in partial_errors {
                        emit(&events, BuildEvent::PartialFailed { message: err.to_string() });
                    }
                    emit(
                        &events,
                        BuildEvent::UnitRendered {
                            output: output.clone(),
                            partials: partials.clone(),
                        },
                    );
                }
                UnitOutcome::Failed(err) => {
                    emit(&events, BuildEvent::UnitFailed { message: err.to_string() });
                }
            }
            outcome
        })
        .collect();

    for outcome in outcomes {
        match outcome {
            UnitOutcome::Written {
                output,
                wildcard,
                partials,
                partial_errors,
            } => {
                report.rendered += 1;
                if wildcard {
                    report.wildcard_generated += 1;
                }
                report.partials_used.extend(partials);
                report
                    .errors
                    .extend(partial_errors.into_iter().map(UnitError::from));
                report.outputs.push(output);
            }
            UnitOutcome::Failed(err) => {
                report.skipped += 1;
                report.errors.push(err);
            }
        }
    }

    report.elapsed = start.elapsed();
    report
}

fn render_unit<E, W>(renderer: &Renderer<'_, E>, unit: &RenderUnit<'_>, writer: &W) -> UnitOutcome
where
    E: TemplateEngine + ?Sized,
    W: OutputWriter + ?Sized,
{
    let rendered = match renderer.render(unit.template, unit.sub_key.as_deref()) {
        Ok(rendered) => rendered,
        Err(err) => return UnitOutcome::Failed(err.into()),
    };
    if let Err(source) = writer.write(&unit.output_path, &rendered.content) {
        return UnitOutcome::Failed(UnitError::Write {
            path: unit.output_path.clone(),
            source,
        });
    }
    UnitOutcome::Written {
        output: unit.output_path.clone(),
        wildcard: unit.sub_key.is_some(),
        partials: rendered.partials,
        partial_errors: rendered.partial_errors,
    }
}

/// Load data and discover templates for `config`.
fn prepare(config: &SiteConfig) -> Result<(DataDocument, Discovery), BuildError> {
    let document = data::load_data(&config.data_source)?;
    let discovery = discover::discover(&config.root_dir, &config.extensions)?;
    Ok((document, discovery))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Full build: load data, clean `dist_dir`, copy static assets, render.
pub fn build(
    config: &SiteConfig,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    config.validate()?;
    let (document, discovery) = prepare(config)?;

    files::clear_dist(&config.dist_dir).map_err(io_err(&config.dist_dir))?;
    files::copy_static(&config.root_dir, &config.dist_dir, &config.extensions)
        .map_err(io_err(&config.root_dir))?;

    let engine = HandlebarsEngine::new();
    let writer = DistWriter::new(&config.dist_dir);
    Ok(render_site(
        &engine,
        &document,
        &discovery,
        &config.extensions,
        &writer,
        events,
    ))
}

/// Dry run: everything `build` does except touching the dist directory.
pub fn check(
    config: &SiteConfig,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildReport, BuildError> {
    config.validate()?;
    let (document, discovery) = prepare(config)?;
    let engine = HandlebarsEngine::new();
    Ok(render_site(
        &engine,
        &document,
        &discovery,
        &config.extensions,
        &DiscardWriter,
        events,
    ))
}
