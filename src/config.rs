//! Site configuration module.
//!
//! Handles loading, validating, and merging `minty.toml`. Stock defaults are
//! the base layer; the user file is merged on top, and CLI flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! data_source = "data.json"  # Path to the JSON data file, or an http(s) URL
//! root_dir = "site"          # Directory holding templates, partials and assets
//! dist_dir = "dist"          # Output directory (cleared on every build)
//! extensions = ["html"]      # Recognized *.template.<ext> / *.partial.<ext>
//!
//! [processing]
//! max_processes = 4          # Max parallel render workers (omit for auto = CPU cores)
//! ```
//!
//! Relative paths are resolved against the directory containing the config
//! file, so a build behaves the same regardless of the working directory.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `minty.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// JSON data document: a local path or an `http(s)://` URL.
    pub data_source: String,
    /// Root of the source tree (templates, partials, static assets).
    pub root_dir: PathBuf,
    /// Distribution directory receiving rendered and copied files.
    pub dist_dir: PathBuf,
    /// Ordered set of recognized template/partial extensions.
    /// The first matching extension wins during discovery.
    pub extensions: Vec<String>,
    /// Parallel rendering settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            data_source: "data.json".to_string(),
            root_dir: PathBuf::from("site"),
            dist_dir: PathBuf::from("dist"),
            extensions: vec!["html".to_string()],
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are usable for a build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_source.trim().is_empty() {
            return Err(ConfigError::Validation(
                "data_source must not be empty".into(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "extensions must not be empty".into(),
            ));
        }
        for (i, ext) in self.extensions.iter().enumerate() {
            if ext.is_empty()
                || ext
                    .chars()
                    .any(|c| c == '.' || c == '/' || c == '\\' || c.is_whitespace())
            {
                return Err(ConfigError::Validation(format!(
                    "invalid extension {ext:?}: use bare names like \"html\""
                )));
            }
            if self.extensions[..i].contains(ext) {
                return Err(ConfigError::Validation(format!(
                    "duplicate extension {ext:?}"
                )));
            }
        }
        let root = absolute(&self.root_dir);
        let dist = absolute(&self.dist_dir);
        if root == dist {
            return Err(ConfigError::Validation(
                "dist_dir must differ from root_dir".into(),
            ));
        }
        if dist.starts_with(&root) {
            return Err(ConfigError::Validation(format!(
                "dist_dir {} must not be inside root_dir {}",
                self.dist_dir.display(),
                self.root_dir.display()
            )));
        }
        // dist_dir is deleted on every build.
        if root.starts_with(&dist) {
            return Err(ConfigError::Validation(format!(
                "dist_dir {} must not contain root_dir {}",
                self.dist_dir.display(),
                self.root_dir.display()
            )));
        }
        if !is_remote_source(&self.data_source)
            && absolute(Path::new(&self.data_source)).starts_with(&dist)
        {
            return Err(ConfigError::Validation(format!(
                "data_source {} must not be inside dist_dir {}",
                self.data_source,
                self.dist_dir.display()
            )));
        }
        Ok(())
    }

    /// Apply command-line overrides on top of file values.
    ///
    /// Override paths stay as given (relative to the working directory).
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if let Some(root) = &overrides.root_dir {
            self.root_dir = root.clone();
        }
        if let Some(dist) = &overrides.dist_dir {
            self.dist_dir = dist.clone();
        }
        if let Some(data) = &overrides.data_source {
            self.data_source = data.clone();
        }
        if !overrides.extensions.is_empty() {
            self.extensions = overrides.extensions.clone();
        }
        self
    }

    /// Resolve relative paths against `base` (the config file's directory).
    ///
    /// URL data sources are left untouched.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.root_dir.is_relative() {
            self.root_dir = base.join(&self.root_dir);
        }
        if self.dist_dir.is_relative() {
            self.dist_dir = base.join(&self.dist_dir);
        }
        if !is_remote_source(&self.data_source) && Path::new(&self.data_source).is_relative() {
            self.data_source = base.join(&self.data_source).to_string_lossy().into_owned();
        }
        self
    }
}

/// True for `http://` and `https://` data sources.
pub fn is_remote_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Values given on the command line. `None` or empty keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root_dir: Option<PathBuf>,
    pub dist_dir: Option<PathBuf>,
    pub data_source: Option<String>,
    /// Replaces the configured list when non-empty.
    pub extensions: Vec<String>,
}

/// Absolute, lexically normalized form of `path` for containment checks.
///
/// Relative paths are anchored at the working directory. `.` is dropped and
/// `..` folded; symlinks are not resolved.
fn absolute(path: &Path) -> PathBuf {
    let anchored = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut out = PathBuf::new();
    for component in anchored.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Parallel rendering settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize.
///
/// Validation is left to the caller, after any overrides are applied.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    Ok(merged.try_into()?)
}

/// Read config from the given file path without validating it.
///
/// Merges user values on top of stock defaults, rejects unknown keys, and
/// resolves relative paths against the file's directory. A missing file
/// yields the stock defaults.
pub fn read_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    let config = resolve_config(base, overlay)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.resolve_paths(base_dir))
}

/// [`read_config`], then [`SiteConfig::validate`].
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let config = read_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `minty.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Minty Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Relative paths are resolved against the directory containing this file.
# Unknown keys will cause an error.

# JSON data document. Must contain a "common" object.
# May also be an http:// or https:// URL (fetched with a 10 second timeout).
data_source = "data.json"

# Source tree: *.template.<ext> files are rendered, *.partial.<ext> files are
# includable fragments, everything else is copied verbatim.
root_dir = "site"

# Output directory. Cleared and rebuilt on every build.
# Must not be inside root_dir.
dist_dir = "dist"

# Recognized template/partial extensions, in priority order.
extensions = ["html"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers. Omit to use all CPU cores.
# Values above the core count are clamped down.
# max_processes = 4
"##
}
