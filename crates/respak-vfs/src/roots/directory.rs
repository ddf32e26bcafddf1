//! Plain-directory content root.
//!
//! Serves files straight from a directory on disk. This is the only root
//! type that can answer [`ContentRoot::real_path`], which lets callers hand a
//! true on-disk path to native APIs.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{VfsError, VfsResult};
use crate::path::ResPath;
use crate::root::{ContentRoot, DirectoryFilter, PathIter};
use crate::stream::ContentStream;

/// Directory-backed content root.
///
/// All lookups are relative to `root`. For example, if `root` is
/// `/srv/game/Resources`, then `Textures/foo.png` maps to
/// `/srv/game/Resources/Textures/foo.png`. Paths containing `..` are
/// never resolved, so lookups cannot escape the root.
#[derive(Debug, Clone)]
pub struct DirectoryContentRoot {
    root: PathBuf,
}

impl DirectoryContentRoot {
    /// Create a root for the given directory.
    ///
    /// The path is canonicalized when possible (e.g. macOS `/tmp` →
    /// `/private/tmp`); existence is checked at mount time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative virtual path onto the disk.
    fn resolve(&self, path: &ResPath) -> Option<PathBuf> {
        let mut full = self.root.clone();
        for segment in path.segments() {
            if segment == ".." {
                return None;
            }
            full.push(segment);
        }
        Some(full)
    }

    fn walk(&self, path: &ResPath, max_depth: usize) -> Option<walkdir::IntoIter> {
        let base = self.resolve(path)?;
        Some(
            WalkDir::new(base)
                .min_depth(1)
                .max_depth(max_depth)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter(),
        )
    }
}

/// Convert an on-disk path under `root` back into a relative virtual path.
fn to_res_path(root: &Path, full: &Path, is_dir: bool) -> Option<ResPath> {
    let relative = full.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_str()?),
            _ => return None,
        }
    }
    let mut canon = segments.join("/");
    if is_dir {
        canon.push('/');
    }
    Some(ResPath::new(canon))
}

impl ContentRoot for DirectoryContentRoot {
    fn mount(&self) -> VfsResult<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(VfsError::not_found(format!(
                "content directory {}",
                self.root.display()
            )))
        }
    }

    fn kind(&self) -> &'static str {
        "directory"
    }

    fn try_get_file(&self, path: &ResPath) -> Option<ContentStream> {
        if path.is_directory() {
            return None;
        }
        let full = self.resolve(path)?;
        match fs::File::open(&full) {
            Ok(file) => match file.metadata() {
                Ok(meta) if meta.is_file() => Some(Box::new(file) as ContentStream),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Failed to stat {}: {}", full.display(), e);
                    None
                }
            },
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::IsADirectory) => {
                None
            }
            Err(e) => {
                tracing::warn!("Failed to open {}: {}", full.display(), e);
                None
            }
        }
    }

    fn file_exists(&self, path: &ResPath) -> bool {
        !path.is_directory() && self.resolve(path).is_some_and(|full| full.is_file())
    }

    fn find_files(&self, path: &ResPath, recursive: bool) -> PathIter {
        let max_depth = if recursive { usize::MAX } else { 1 };
        let Some(walk) = self.walk(path, max_depth) else {
            return Box::new(std::iter::empty());
        };
        let root = self.root.clone();
        Box::new(
            walk.filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter_map(move |entry| to_res_path(&root, entry.path(), false)),
        )
    }

    fn find_directories(&self, path: &ResPath, filter: Option<DirectoryFilter>) -> PathIter {
        let Some(walk) = self.walk(path, usize::MAX) else {
            return Box::new(std::iter::empty());
        };
        let root = self.root.clone();
        Box::new(
            walk.filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_dir())
                .filter_map(move |entry| to_res_path(&root, entry.path(), true))
                .filter(move |dir| filter.as_ref().is_none_or(|f| f(dir))),
        )
    }

    fn get_entries(&self, path: &ResPath) -> BTreeSet<String> {
        let mut entries = BTreeSet::new();
        let Some(base) = self.resolve(path) else {
            return entries;
        };
        let Ok(dir) = fs::read_dir(&base) else {
            return entries;
        };

        for entry in dir.flatten() {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            // file_type() does not follow symlinks; metadata() does.
            let is_dir = fs::metadata(entry.path()).is_ok_and(|m| m.is_dir());
            if is_dir {
                entries.insert(format!("{}/", name));
            } else {
                entries.insert(name);
            }
        }
        entries
    }

    fn get_relative_file_paths(&self) -> Vec<String> {
        // Walk order is per directory; sort for a stable flat listing.
        let mut paths: Vec<String> = self
            .find_files(&ResPath::empty(), true)
            .map(|p| p.to_string())
            .collect();
        paths.sort();
        paths
    }

    fn real_path(&self, path: &ResPath) -> Option<PathBuf> {
        if path.is_directory() {
            return None;
        }
        self.resolve(path).filter(|full| full.is_file())
    }

    fn disk_root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Textures/sub")).unwrap();
        fs::create_dir_all(dir.path().join("Audio")).unwrap();
        fs::write(dir.path().join("Textures/sub/foo.png"), b"png").unwrap();
        fs::write(dir.path().join("Textures/bar.png"), b"bar").unwrap();
        fs::write(dir.path().join("top.txt"), b"top").unwrap();
        dir
    }

    #[test]
    fn test_mount_missing_directory_fails() {
        let root = DirectoryContentRoot::new("/definitely/not/a/real/dir");
        let err = root.mount().unwrap_err();
        assert!(matches!(err, VfsError::NotFound(_)));
    }

    #[test]
    fn test_read_file() {
        let dir = fixture();
        let root = DirectoryContentRoot::new(dir.path());
        root.mount().unwrap();

        let mut stream = root.try_get_file(&ResPath::new("Textures/sub/foo.png")).unwrap();
        let mut data = Vec::new();
        stream.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"png");
        assert!(stream.is_seekable());

        assert!(root.try_get_file(&ResPath::new("Textures")).is_none());
        assert!(root.try_get_file(&ResPath::new("Textures/")).is_none());
        assert!(root.try_get_file(&ResPath::new("missing.txt")).is_none());
    }

    #[test]
    fn test_parent_segments_rejected() {
        let dir = fixture();
        let root = DirectoryContentRoot::new(dir.path().join("Textures"));
        assert!(root.try_get_file(&ResPath::new("../top.txt")).is_none());
        assert!(!root.file_exists(&ResPath::new("../top.txt")));
    }

    #[test]
    fn test_find_files() {
        let dir = fixture();
        let root = DirectoryContentRoot::new(dir.path());

        let all: Vec<_> = root.find_files(&ResPath::empty(), true).collect();
        assert_eq!(
            all,
            vec![
                ResPath::new("Textures/bar.png"),
                ResPath::new("Textures/sub/foo.png"),
                ResPath::new("top.txt"),
            ]
        );

        let shallow: Vec<_> = root.find_files(&ResPath::new("Textures"), false).collect();
        assert_eq!(shallow, vec![ResPath::new("Textures/bar.png")]);

        assert_eq!(root.find_files(&ResPath::new("nope"), true).count(), 0);
    }

    #[test]
    fn test_find_directories() {
        let dir = fixture();
        let root = DirectoryContentRoot::new(dir.path());

        let dirs: Vec<_> = root.find_directories(&ResPath::empty(), None).collect();
        assert_eq!(
            dirs,
            vec![
                ResPath::new("Audio/"),
                ResPath::new("Textures/"),
                ResPath::new("Textures/sub/"),
            ]
        );

        let named: Vec<_> = root
            .find_directories(&ResPath::empty(), Some(crate::root::directory_named("sub")))
            .collect();
        assert_eq!(named, vec![ResPath::new("Textures/sub/")]);
    }

    #[test]
    fn test_get_entries() {
        let dir = fixture();
        let root = DirectoryContentRoot::new(dir.path());
        let entries: Vec<_> = root.get_entries(&ResPath::empty()).into_iter().collect();
        assert_eq!(entries, vec!["Audio/", "Textures/", "top.txt"]);
    }

    #[test]
    fn test_relative_file_paths_lists_files_only() {
        let dir = fixture();
        let root = DirectoryContentRoot::new(dir.path());
        root.mount().unwrap();
        assert_eq!(
            root.get_relative_file_paths(),
            vec!["Textures/bar.png", "Textures/sub/foo.png", "top.txt"]
        );
    }

    #[test]
    fn test_real_path() {
        let dir = fixture();
        let root = DirectoryContentRoot::new(dir.path());
        let real = root.real_path(&ResPath::new("top.txt")).unwrap();
        assert_eq!(fs::read(real).unwrap(), b"top");
        assert!(root.real_path(&ResPath::new("missing.txt")).is_none());
        assert!(root.disk_root().is_some());
    }
}
