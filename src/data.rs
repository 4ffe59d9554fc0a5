//! JSON data document loading.
//!
//! The data document is the single source of page content. It is a JSON
//! object that must contain a `common` object; every other top-level key is
//! one of:
//!
//! ```text
//! "about"      → page data for about.template.<ext>
//! "product*"   → wildcard bucket: one page per sub-key (product.<sub>.<ext>)
//! "header_"    → extra scope visible only while rendering header.partial.<ext>
//! ```
//!
//! The document is loaded once per build and shared read-only by every render.
//! It is never normalized or defaulted: what is on disk is what templates see.

use crate::config::is_remote_source;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Remote fetches are bounded independently of the render pipeline.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("minty/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum DataError {
    #[error("JSON data file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in data source: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid data document: {0}")]
    Schema(String),
    #[error("Failed to fetch remote JSON from {url}: {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },
}

/// A validated data document.
///
/// Invariant: the root is an object whose `common` key holds an object.
#[derive(Debug, Clone)]
pub struct DataDocument {
    root: Value,
}

impl DataDocument {
    /// Validate a parsed JSON value and wrap it.
    pub fn from_value(root: Value) -> Result<Self, DataError> {
        let Some(map) = root.as_object() else {
            return Err(DataError::Schema(
                "top-level value must be an object".into(),
            ));
        };
        match map.get("common") {
            Some(Value::Object(_)) => Ok(Self { root }),
            Some(_) => Err(DataError::Schema(
                "\"common\" must be an object with data shared by all pages".into(),
            )),
            None => Err(DataError::Schema(
                "missing required \"common\" key with data shared by all pages".into(),
            )),
        }
    }

    /// The whole document, exposed to templates as `$database`.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    fn map(&self) -> &Map<String, Value> {
        self.root
            .as_object()
            .expect("DataDocument root is validated as an object")
    }

    /// The shared `common` layer.
    pub fn common(&self) -> &Map<String, Value> {
        self.map()
            .get("common")
            .and_then(Value::as_object)
            .expect("DataDocument common is validated as an object")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map().get(key)
    }

    /// Look up a key whose value is an object; anything else counts as absent.
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    /// Top-level keys other than `common`.
    pub fn page_keys(&self) -> impl Iterator<Item = &str> {
        self.map()
            .keys()
            .map(String::as_str)
            .filter(|k| *k != "common")
    }
}

/// Load the data document from a local path or an `http(s)` URL.
pub fn load_data(source: &str) -> Result<DataDocument, DataError> {
    let value = if is_remote_source(source) {
        fetch_remote(source, FETCH_TIMEOUT)?
    } else {
        read_local(Path::new(source))?
    };
    DataDocument::from_value(value)
}

fn read_local(path: &Path) -> Result<Value, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

fn fetch_remote(url: &str, timeout: Duration) -> Result<Value, DataError> {
    let fetch_err = |source| DataError::Fetch {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(fetch_err)?;
    let body = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.text())
        .map_err(fetch_err)?;
    Ok(serde_json::from_str(&body)?)
}
