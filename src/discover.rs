//! Template and partial discovery.
//!
//! Walks the root directory and classifies files by suffix against the
//! configured extension set:
//!
//! ```text
//! site/
//! ├── index.template.html        # template, key "index" → index.html
//! ├── styles.template.css        # template only if "css" is configured
//! ├── header.partial.html        # partial, included as @header.partial.html
//! ├── logo.png                   # static asset (not discovered)
//! └── blog/
//!     └── post.template.html     # template, key "post" → blog/post.html
//! ```
//!
//! Entries are visited depth-first and sorted by file name, so discovery
//! order (and everything derived from it) is reproducible across platforms.
//! Symlinks are followed; a symlink cycle is reported as an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Cannot read {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// A renderable `<key>.template.<ext>` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    pub full_path: PathBuf,
    /// Path relative to the root directory.
    pub relative_path: PathBuf,
    /// Data key: the filename with `.template.<ext>` stripped.
    pub key_name: String,
    pub extension: String,
    /// Output subdirectory (empty for files at the root).
    pub output_dir: PathBuf,
    /// `<key>.<ext>`
    pub output_name: String,
}

impl TemplateDescriptor {
    /// Output path relative to the dist directory in regular mode.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }

    /// Output path for one wildcard unit: `<key>.<sub_key>.<ext>`.
    pub fn wildcard_output_path(&self, sub_key: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}.{}", self.key_name, sub_key, self.extension))
    }
}

/// An includable `<name>.partial.<ext>` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialDescriptor {
    pub full_path: PathBuf,
    /// Name used for the `<name>_` data scope.
    pub name: String,
    /// Lookup key for include markers, e.g. `header.partial.html`.
    pub file_name: String,
    pub extension: String,
}

/// Immutable filename → partial index, built once per build.
#[derive(Debug, Clone, Default)]
pub struct PartialSet {
    by_file_name: BTreeMap<String, PartialDescriptor>,
}

impl PartialSet {
    /// Index partials by file name. When two partials share a file name in
    /// different directories, the first in discovery order wins.
    pub fn new(partials: impl IntoIterator<Item = PartialDescriptor>) -> Self {
        let mut by_file_name = BTreeMap::new();
        for partial in partials {
            by_file_name
                .entry(partial.file_name.clone())
                .or_insert(partial);
        }
        Self { by_file_name }
    }

    pub fn get(&self, file_name: &str) -> Option<&PartialDescriptor> {
        self.by_file_name.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.by_file_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartialDescriptor> {
        self.by_file_name.values()
    }
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub templates: Vec<TemplateDescriptor>,
    pub partials: PartialSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Template,
    Partial,
}

/// Classify a file name against the extension set.
///
/// Returns the kind, the stripped name, and the matching extension. The first
/// matching extension wins. A file whose stripped name would be empty is not
/// classified.
pub fn classify<'a>(
    file_name: &'a str,
    extensions: &'a [String],
) -> Option<(FileKind, &'a str, &'a str)> {
    for ext in extensions {
        for (kind, marker) in [(FileKind::Template, "template"), (FileKind::Partial, "partial")] {
            let suffix = format!(".{marker}.{ext}");
            if let Some(stem) = file_name.strip_suffix(suffix.as_str()) {
                if stem.is_empty() {
                    return None;
                }
                return Some((kind, stem, ext.as_str()));
            }
        }
    }
    None
}

/// True if `file_name` is a template for one of `extensions`.
///
/// Used by the static copier to skip files that will be rendered instead.
pub fn is_template_file(file_name: &str, extensions: &[String]) -> bool {
    matches!(
        classify(file_name, extensions),
        Some((FileKind::Template, _, _))
    )
}

/// Walk `root` and collect templates and partials.
///
/// Any unreadable directory aborts discovery; no partial results are returned.
pub fn discover(root: &Path, extensions: &[String]) -> Result<Discovery, DiscoverError> {
    let mut templates = Vec::new();
    let mut partials = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| DiscoverError::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        let Some((kind, stem, ext)) = classify(&file_name, extensions) else {
            continue;
        };
        let full_path = entry.path().to_path_buf();
        match kind {
            FileKind::Template => {
                let relative_path = full_path
                    .strip_prefix(root)
                    .unwrap_or(&full_path)
                    .to_path_buf();
                let output_dir = relative_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                templates.push(TemplateDescriptor {
                    relative_path,
                    key_name: stem.to_string(),
                    extension: ext.to_string(),
                    output_dir,
                    output_name: format!("{stem}.{ext}"),
                    full_path,
                });
            }
            FileKind::Partial => partials.push(PartialDescriptor {
                name: stem.to_string(),
                file_name: file_name.to_string(),
                extension: ext.to_string(),
                full_path,
            }),
        }
    }

    Ok(Discovery {
        templates,
        partials: PartialSet::new(partials),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{exts, write_file};
    use tempfile::TempDir;

    #[test]
    fn classify_template_and_partial() {
        let e = exts(&["html"]);
        assert_eq!(
            classify("index.template.html", &e),
            Some((FileKind::Template, "index", "html"))
        );
        assert_eq!(
            classify("header.partial.html", &e),
            Some((FileKind::Partial, "header", "html"))
        );
        assert_eq!(classify("index.html", &e), None);
        assert_eq!(classify("notes.template.txt", &e), None);
    }

    #[test]
    fn classify_respects_extension_set() {
        assert_eq!(classify("foo.template.css", &exts(&["html"])), None);
        assert_eq!(
            classify("foo.template.css", &exts(&["html", "css"])),
            Some((FileKind::Template, "foo", "css"))
        );
    }

    #[test]
    fn classify_first_extension_wins() {
        let e = exts(&["html", "partial.html"]);
        assert_eq!(
            classify("x.template.partial.html", &e),
            Some((FileKind::Partial, "x.template", "html"))
        );
        let e = exts(&["partial.html", "html"]);
        assert_eq!(
            classify("x.template.partial.html", &e),
            Some((FileKind::Template, "x", "partial.html"))
        );
    }

    #[test]
    fn classify_rejects_empty_key() {
        assert_eq!(classify(".template.html", &exts(&["html"])), None);
    }

    #[test]
    fn classify_keeps_dots_in_key() {
        assert_eq!(
            classify("blog.post.template.html", &exts(&["html"])),
            Some((FileKind::Template, "blog.post", "html"))
        );
    }

    #[test]
    fn discover_walks_nested_tree() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "index.template.html", "");
        write_file(tmp.path(), "header.partial.html", "");
        write_file(tmp.path(), "logo.png", "");
        write_file(tmp.path(), "blog/post.template.html", "");
        write_file(tmp.path(), "blog/deep/footer.partial.html", "");

        let found = discover(tmp.path(), &exts(&["html"])).unwrap();

        let keys: Vec<&str> = found.templates.iter().map(|t| t.key_name.as_str()).collect();
        // Sorted depth-first: blog/ sorts before index.template.html
        assert_eq!(keys, vec!["post", "index"]);

        let post = &found.templates[0];
        assert_eq!(post.relative_path, PathBuf::from("blog/post.template.html"));
        assert_eq!(post.output_dir, PathBuf::from("blog"));
        assert_eq!(post.output_name, "post.html");
        assert_eq!(post.output_path(), PathBuf::from("blog/post.html"));
        assert_eq!(post.full_path, tmp.path().join("blog/post.template.html"));

        let index = &found.templates[1];
        assert_eq!(index.output_dir, PathBuf::new());
        assert_eq!(index.output_path(), PathBuf::from("index.html"));

        assert_eq!(found.partials.len(), 2);
        let footer = found.partials.get("footer.partial.html").unwrap();
        assert_eq!(footer.name, "footer");
        assert_eq!(footer.extension, "html");
    }

    #[test]
    fn discover_multiple_extensions() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "styles.template.css", "");
        write_file(tmp.path(), "vars.partial.css", "");
        write_file(tmp.path(), "feed.template.json", "");

        let found = discover(tmp.path(), &exts(&["html", "css"])).unwrap();
        assert_eq!(found.templates.len(), 1);
        assert_eq!(found.templates[0].extension, "css");
        assert!(found.partials.get("vars.partial.css").is_some());
    }

    #[test]
    fn duplicate_partial_names_first_wins() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a/nav.partial.html", "first");
        write_file(tmp.path(), "b/nav.partial.html", "second");

        let found = discover(tmp.path(), &exts(&["html"])).unwrap();
        assert_eq!(found.partials.len(), 1);
        assert_eq!(
            found.partials.get("nav.partial.html").unwrap().full_path,
            tmp.path().join("a/nav.partial.html")
        );
    }

    #[test]
    fn wildcard_output_path_uses_sub_key() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "shop/product.template.html", "");
        let found = discover(tmp.path(), &exts(&["html"])).unwrap();
        assert_eq!(
            found.templates[0].wildcard_output_path("laptop"),
            PathBuf::from("shop/product.laptop.html")
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_is_error() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "a/index.template.html", "");
        std::os::unix::fs::symlink(tmp.path().join("a"), tmp.path().join("a/loop")).unwrap();

        let result = discover(tmp.path(), &exts(&["html"]));
        assert!(matches!(result, Err(DiscoverError::Walk { .. })));
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = discover(&tmp.path().join("absent"), &exts(&["html"]));
        assert!(matches!(result, Err(DiscoverError::Walk { .. })));
    }

    #[test]
    fn is_template_file_only_for_configured_extensions() {
        assert!(is_template_file("foo.template.css", &exts(&["css"])));
        assert!(!is_template_file("foo.template.css", &exts(&["html"])));
        assert!(!is_template_file("foo.partial.css", &exts(&["css"])));
    }
}
