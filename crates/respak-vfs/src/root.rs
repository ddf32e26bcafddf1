//! Content-root contract.
//!
//! Every backing store (memory, plain directory, content pack, single
//! injected stream) implements [`ContentRoot`]. The manager never special-
//! cases a variant; the only variant-specific query is [`ContentRoot::real_path`],
//! which only directory-backed roots answer.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::VfsResult;
use crate::path::ResPath;
use crate::stream::ContentStream;

/// Owned, lazy sequence of paths relative to a content root.
pub type PathIter = Box<dyn Iterator<Item = ResPath> + Send>;

/// Predicate over relative directory paths (with trailing separator).
pub type DirectoryFilter = Arc<dyn Fn(&ResPath) -> bool + Send + Sync>;

/// Build a filter matching directories whose final segment is `name`.
pub fn directory_named(name: impl Into<String>) -> DirectoryFilter {
    let name = name.into();
    Arc::new(move |dir: &ResPath| dir.filename() == name)
}

/// A pluggable backing store.
///
/// All paths passed in and returned are relative to the root. Directory
/// paths carry a trailing separator. Implementations must be safe to call
/// from many threads at once.
pub trait ContentRoot: Send + Sync {
    /// One-time setup, called by the manager before publication.
    ///
    /// Fails if the backing medium is unavailable.
    fn mount(&self) -> VfsResult<()> {
        Ok(())
    }

    /// Short variant name for diagnostics.
    fn kind(&self) -> &'static str;

    /// Open an independent read-only stream for an exact file path.
    ///
    /// Returns `None` if the file is absent or the path denotes a directory.
    fn try_get_file(&self, path: &ResPath) -> Option<ContentStream>;

    /// Check if a file exists.
    fn file_exists(&self, path: &ResPath) -> bool {
        self.try_get_file(path).is_some()
    }

    /// Enumerate files under `path`. `recursive = false` restricts the
    /// result to direct children.
    fn find_files(&self, path: &ResPath, recursive: bool) -> PathIter;

    /// Enumerate directories under `path`, optionally filtered.
    fn find_directories(&self, path: &ResPath, filter: Option<DirectoryFilter>) -> PathIter;

    /// Immediate child names of `path`. Directory names end with `/`.
    fn get_entries(&self, path: &ResPath) -> BTreeSet<String>;

    /// Every file this root serves, sorted, for diagnostics.
    ///
    /// Files only: directories (explicit or implied) are never listed, and
    /// an unmounted root lists nothing.
    fn get_relative_file_paths(&self) -> Vec<String>;

    /// Real on-disk path backing a file, for roots backed by the real
    /// filesystem. Virtual roots return `None`.
    fn real_path(&self, path: &ResPath) -> Option<PathBuf> {
        let _ = path;
        None
    }

    /// On-disk directory this root serves, if any.
    fn disk_root(&self) -> Option<&Path> {
        None
    }
}

/// True if `path` is a direct child of `base`.
pub(crate) fn is_direct_child(path: &ResPath, base: &ResPath) -> bool {
    path.try_relative_to(base)
        .is_some_and(|rest| rest.segments().count() == 1)
}

// ============================================================================
// Selection helpers for roots that keep an in-memory index of their paths
// ============================================================================

/// Files (non-directory paths) under `base`, sorted.
pub(crate) fn select_files<'a>(
    candidates: impl IntoIterator<Item = &'a ResPath>,
    base: &ResPath,
    recursive: bool,
) -> Vec<ResPath> {
    let base = base.to_relative().as_directory();
    let mut found: Vec<ResPath> = candidates
        .into_iter()
        .filter(|p| !p.is_directory())
        .filter(|p| {
            if recursive {
                p.is_relative_to(&base)
            } else {
                is_direct_child(p, &base)
            }
        })
        .cloned()
        .collect();
    found.sort();
    found
}

/// Directories strictly below `base` that pass `filter`, sorted.
pub(crate) fn select_directories<'a>(
    candidates: impl IntoIterator<Item = &'a ResPath>,
    base: &ResPath,
    filter: Option<&DirectoryFilter>,
) -> Vec<ResPath> {
    let base = base.to_relative().as_directory();
    let mut found: Vec<ResPath> = candidates
        .into_iter()
        .filter(|d| d.try_relative_to(&base).is_some_and(|rest| !rest.is_empty()))
        .filter(|d| filter.is_none_or(|f| f(d)))
        .cloned()
        .collect();
    found.sort();
    found
}

/// Immediate child names of `base`; directories get a trailing `/`.
///
/// A candidate nested more than one level down contributes its first
/// segment as a directory.
pub(crate) fn child_entries<'a>(
    candidates: impl IntoIterator<Item = &'a ResPath>,
    base: &ResPath,
) -> BTreeSet<String> {
    let base = base.to_relative().as_directory();
    let mut entries = BTreeSet::new();
    for candidate in candidates {
        let Some(rest) = candidate.try_relative_to(&base) else {
            continue;
        };
        let mut segments = rest.segments();
        let Some(first) = segments.next() else {
            continue;
        };
        if segments.next().is_some() || rest.is_directory() {
            entries.insert(format!("{}/", first));
        } else {
            entries.insert(first.to_string());
        }
    }
    entries
}

/// Every ancestor directory of a relative file path, outermost first.
///
/// `a/b/c.txt` yields `a/` and `a/b/`.
pub(crate) fn ancestor_directories(path: &ResPath) -> Vec<ResPath> {
    let segments: Vec<&str> = path.segments().collect();
    let Some((_, parents)) = segments.split_last() else {
        return Vec::new();
    };
    (1..=parents.len())
        .map(|n| ResPath::new(format!("{}/", parents[..n].join("/"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_named() {
        let filter = directory_named("Textures");
        assert!(filter(&ResPath::new("a/Textures/")));
        assert!(filter(&ResPath::new("Textures/")));
        assert!(!filter(&ResPath::new("Textures/sub/")));
    }

    #[test]
    fn test_ancestor_directories() {
        assert_eq!(
            ancestor_directories(&ResPath::new("a/b/c.txt")),
            vec![ResPath::new("a/"), ResPath::new("a/b/")]
        );
        assert!(ancestor_directories(&ResPath::new("top.txt")).is_empty());
    }

    #[test]
    fn test_child_entries() {
        let paths = [
            ResPath::new("a.txt"),
            ResPath::new("dir/b.txt"),
            ResPath::new("dir/deeper/c.txt"),
            ResPath::new("empty/"),
        ];
        let top: Vec<_> = child_entries(&paths, &ResPath::empty()).into_iter().collect();
        assert_eq!(top, vec!["a.txt", "dir/", "empty/"]);

        let inner: Vec<_> = child_entries(&paths, &ResPath::new("dir")).into_iter().collect();
        assert_eq!(inner, vec!["b.txt", "deeper/"]);
    }

    #[test]
    fn test_is_direct_child() {
        let base = ResPath::new("a/");
        assert!(is_direct_child(&ResPath::new("a/b.txt"), &base));
        assert!(is_direct_child(&ResPath::new("a/c/"), &base));
        assert!(!is_direct_child(&ResPath::new("a/c/d.txt"), &base));
        assert!(!is_direct_child(&ResPath::new("a/"), &base));
        assert!(is_direct_child(&ResPath::new("top.txt"), &ResPath::empty()));
    }
}
