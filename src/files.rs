//! Filesystem side of a build: cleaning `dist/`, copying static assets, and
//! writing rendered units.
//!
//! Rendering never touches the output tree directly; it hands
//! `(relative path, content)` pairs to an [`OutputWriter`]. [`DistWriter`]
//! writes them under the dist directory, [`DiscardWriter`] drops them (used by
//! `minty check`), and tests substitute an in-memory recorder.

use crate::discover::is_template_file;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Receives rendered output. Must be `Sync`: units are written from rayon
/// workers.
pub trait OutputWriter: Sync {
    /// Write `content` to `relative` (relative to the output root),
    /// creating parent directories and overwriting existing files.
    fn write(&self, relative: &Path, content: &str) -> io::Result<()>;
}

/// Writes units under a dist directory.
#[derive(Debug, Clone)]
pub struct DistWriter {
    dist_dir: PathBuf,
}

impl DistWriter {
    pub fn new(dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            dist_dir: dist_dir.into(),
        }
    }
}

impl OutputWriter for DistWriter {
    fn write(&self, relative: &Path, content: &str) -> io::Result<()> {
        let full_path = self.dist_dir.join(relative);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full_path, content)
    }
}

/// Accepts and drops every unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardWriter;

impl OutputWriter for DiscardWriter {
    fn write(&self, _relative: &Path, _content: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Remove `dist_dir` (if present) and recreate it empty.
pub fn clear_dist(dist_dir: &Path) -> io::Result<()> {
    if dist_dir.exists() {
        fs::remove_dir_all(dist_dir)?;
    }
    fs::create_dir_all(dist_dir)
}

/// Mirror every file under `root` into `dist`, except templates for the
/// configured extensions (those are rendered instead).
///
/// Returns the number of files copied.
pub fn copy_static(root: &Path, dist: &Path, extensions: &[String]) -> io::Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let target = dist.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if is_template_file(&file_name, extensions) {
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        copied += 1;
    }
    Ok(copied)
}
