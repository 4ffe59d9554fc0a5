//! Shared test utilities for the minty test suite.
//!
//! Provides file builders, a fixture site, descriptor constructors, and an
//! in-memory [`OutputWriter`] that records what a build would have written.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let config = site_config(tmp.path());
//! let writer = MemoryWriter::default();
//! // ... render_site(..., &writer, None)
//! assert_eq!(writer.get("index.html").as_deref(), Some("..."));
//! ```

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use crate::config::SiteConfig;
use crate::discover::TemplateDescriptor;
use crate::files::OutputWriter;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/` (a `site/` tree plus `data.json`) to a temp directory.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Config rooted at `base`: `base/site`, `base/dist`, `base/data.json`.
pub fn site_config(base: &Path) -> SiteConfig {
    SiteConfig {
        data_source: base.join("data.json").to_string_lossy().into_owned(),
        root_dir: base.join("site"),
        dist_dir: base.join("dist"),
        ..SiteConfig::default()
    }
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

// =========================================================================
// Builders
// =========================================================================

pub fn exts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// A template descriptor that does not exist on disk.
pub fn template(key: &str, ext: &str, output_dir: &str) -> TemplateDescriptor {
    let output_dir = PathBuf::from(output_dir);
    let relative_path = output_dir.join(format!("{key}.template.{ext}"));
    TemplateDescriptor {
        full_path: Path::new("/nonexistent").join(&relative_path),
        relative_path,
        key_name: key.to_string(),
        extension: ext.to_string(),
        output_name: format!("{key}.{ext}"),
        output_dir,
    }
}

// =========================================================================
// In-memory output
// =========================================================================

/// Records writes instead of touching the filesystem.
#[derive(Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<PathBuf, String>>,
    fail_on: Option<PathBuf>,
}

impl MemoryWriter {
    /// A writer that returns an IO error for one relative path.
    pub fn failing_on(path: &str) -> Self {
        Self {
            fail_on: Some(PathBuf::from(path)),
            ..Self::default()
        }
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }

    /// Written paths, sorted, as `/`-separated strings.
    pub fn paths(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .keys()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect()
    }
}

impl OutputWriter for MemoryWriter {
    fn write(&self, relative: &Path, content: &str) -> io::Result<()> {
        if self.fail_on.as_deref() == Some(relative) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated write failure",
            ));
        }
        self.files
            .lock()
            .unwrap()
            .insert(relative.to_path_buf(), content.to_string());
        Ok(())
    }
}
