//! In-memory content root.
//!
//! Used for injected content, tests, and as the reference every other root
//! type is checked against. Data is held as shared `Arc<[u8]>` buffers, so
//! adding a buffer and opening it never copies.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Cursor;
use std::sync::Arc;

use crate::path::ResPath;
use crate::root::{
    ContentRoot, DirectoryFilter, PathIter, child_entries, select_directories, select_files,
};
use crate::stream::ContentStream;

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<ResPath, Arc<[u8]>>,
    /// Paths explicitly marked as directories. Distinct from "has children".
    directories: HashSet<ResPath>,
}

/// In-memory content root.
///
/// Thread-safe via internal `RwLock`: readers never block each other, a
/// writer excludes everyone.
#[derive(Debug, Default)]
pub struct MemoryContentRoot {
    state: RwLock<MemoryState>,
}

impl MemoryContentRoot {
    /// Create a new empty root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize to a clean relative path.
    fn normalize(path: &ResPath) -> ResPath {
        path.to_relative()
    }

    /// Store `data` at `path`, replacing existing content.
    ///
    /// A path with a trailing separator is also marked as a directory.
    pub fn add_or_update(&self, path: impl Into<ResPath>, data: impl Into<Arc<[u8]>>) {
        let path = Self::normalize(&path.into());
        let mut state = self.state.write();
        if path.is_directory() {
            state.directories.insert(path.clone());
        }
        state.files.insert(path, data.into());
    }

    /// Remove `path` from both the file map and the directory markers.
    ///
    /// Returns true if a file entry existed at `path`.
    pub fn remove(&self, path: impl Into<ResPath>) -> bool {
        let path = Self::normalize(&path.into());
        let mut state = self.state.write();
        state.directories.remove(&path);
        state.files.remove(&path).is_some()
    }

    /// Drop every file and directory marker.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.files.clear();
        state.directories.clear();
    }

    /// All stored `(path, data)` pairs, sorted by path.
    pub fn entries(&self) -> Vec<(ResPath, Arc<[u8]>)> {
        let state = self.state.read();
        let mut out: Vec<_> = state
            .files
            .iter()
            .map(|(path, data)| (path.clone(), Arc::clone(data)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.state.read().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().files.is_empty()
    }

    fn get(&self, path: &ResPath) -> Option<Arc<[u8]>> {
        let path = Self::normalize(path);
        if path.is_directory() {
            return None;
        }
        let state = self.state.read();
        if state.directories.contains(&path) {
            return None;
        }
        state.files.get(&path).cloned()
    }
}

impl ContentRoot for MemoryContentRoot {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn try_get_file(&self, path: &ResPath) -> Option<ContentStream> {
        self.get(path)
            .map(|data| Box::new(Cursor::new(data)) as ContentStream)
    }

    fn file_exists(&self, path: &ResPath) -> bool {
        self.get(path).is_some()
    }

    fn find_files(&self, path: &ResPath, recursive: bool) -> PathIter {
        let state = self.state.read();
        let files = state.files.keys().filter(|p| !state.directories.contains(*p));
        Box::new(select_files(files, path, recursive).into_iter())
    }

    fn find_directories(&self, path: &ResPath, filter: Option<DirectoryFilter>) -> PathIter {
        let state = self.state.read();
        Box::new(select_directories(&state.directories, path, filter.as_ref()).into_iter())
    }

    fn get_entries(&self, path: &ResPath) -> BTreeSet<String> {
        let state = self.state.read();
        child_entries(state.files.keys().chain(state.directories.iter()), path)
    }

    fn get_relative_file_paths(&self) -> Vec<String> {
        self.find_files(&ResPath::empty(), true)
            .map(|p| p.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn read(root: &MemoryContentRoot, path: &str) -> Option<Vec<u8>> {
        let mut stream = root.try_get_file(&ResPath::new(path))?;
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        Some(out)
    }

    #[test]
    fn test_add_and_read() {
        let root = MemoryContentRoot::new();
        root.add_or_update("/a.txt", &b"hello"[..]);
        assert_eq!(read(&root, "a.txt").unwrap(), b"hello");
        // Rooted and relative forms are the same entry.
        assert_eq!(read(&root, "/a.txt").unwrap(), b"hello");
    }

    #[test]
    fn test_update_replaces_content() {
        let root = MemoryContentRoot::new();
        root.add_or_update("a.txt", &b"first"[..]);
        root.add_or_update("a.txt", &b"second"[..]);
        assert_eq!(read(&root, "a.txt").unwrap(), b"second");
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_shared_buffer_not_copied() {
        let root = MemoryContentRoot::new();
        let data: Arc<[u8]> = Arc::from(&b"shared"[..]);
        root.add_or_update("s.bin", Arc::clone(&data));
        let (_, stored) = root.entries().pop().unwrap();
        assert!(Arc::ptr_eq(&stored, &data));
    }

    #[test]
    fn test_directory_marker_is_not_a_file() {
        let root = MemoryContentRoot::new();
        root.add_or_update("Textures/", &b""[..]);
        assert!(read(&root, "Textures/").is_none());
        assert!(!root.file_exists(&ResPath::new("Textures/")));

        let dirs: Vec<_> = root.find_directories(&ResPath::empty(), None).collect();
        assert_eq!(dirs, vec![ResPath::new("Textures/")]);
    }

    #[test]
    fn test_remove_reports_file_existence() {
        let root = MemoryContentRoot::new();
        root.add_or_update("a.txt", &b"a"[..]);
        root.add_or_update("dir/", &b""[..]);

        assert!(root.remove("a.txt"));
        assert!(!root.file_exists(&ResPath::new("a.txt")));
        assert!(!root.remove("a.txt"));

        assert!(root.remove("dir/"));
        assert_eq!(root.find_directories(&ResPath::empty(), None).count(), 0);
    }

    #[test]
    fn test_clear() {
        let root = MemoryContentRoot::new();
        root.add_or_update("a.txt", &b"a"[..]);
        root.add_or_update("b/c.txt", &b"c"[..]);
        root.add_or_update("d/", &b""[..]);
        root.clear();

        assert!(root.is_empty());
        assert!(!root.file_exists(&ResPath::new("a.txt")));
        assert!(!root.file_exists(&ResPath::new("b/c.txt")));
        assert_eq!(root.find_directories(&ResPath::empty(), None).count(), 0);
    }

    #[test]
    fn test_relative_file_paths_lists_files_only() {
        let root = MemoryContentRoot::new();
        root.add_or_update("Empty/", &b""[..]);
        root.add_or_update("a/b.txt", &b"b"[..]);
        root.add_or_update("a.txt", &b"a"[..]);
        assert_eq!(root.get_relative_file_paths(), vec!["a.txt", "a/b.txt"]);
    }

    #[test]
    fn test_find_files() {
        let root = MemoryContentRoot::new();
        root.add_or_update("top.txt", &b""[..]);
        root.add_or_update("a/one.txt", &b""[..]);
        root.add_or_update("a/b/two.txt", &b""[..]);
        root.add_or_update("ab/three.txt", &b""[..]);

        let all: Vec<_> = root.find_files(&ResPath::empty(), true).collect();
        assert_eq!(all.len(), 4);

        let shallow: Vec<_> = root.find_files(&ResPath::new("a"), false).collect();
        assert_eq!(shallow, vec![ResPath::new("a/one.txt")]);

        let deep: Vec<_> = root.find_files(&ResPath::new("a/"), true).collect();
        assert_eq!(deep, vec![ResPath::new("a/b/two.txt"), ResPath::new("a/one.txt")]);
    }

    #[test]
    fn test_find_directories_with_filter() {
        let root = MemoryContentRoot::new();
        root.add_or_update("Textures/", &b""[..]);
        root.add_or_update("mods/Textures/", &b""[..]);
        root.add_or_update("mods/Audio/", &b""[..]);

        let filter = crate::root::directory_named("Textures");
        let found: Vec<_> = root
            .find_directories(&ResPath::empty(), Some(filter))
            .collect();
        assert_eq!(
            found,
            vec![ResPath::new("Textures/"), ResPath::new("mods/Textures/")]
        );

        let under_mods: Vec<_> = root.find_directories(&ResPath::new("mods"), None).collect();
        assert_eq!(under_mods.len(), 2);
    }

    #[test]
    fn test_get_entries() {
        let root = MemoryContentRoot::new();
        root.add_or_update("a.txt", &b""[..]);
        root.add_or_update("dir/b.txt", &b""[..]);
        root.add_or_update("dir/deeper/c.txt", &b""[..]);
        root.add_or_update("empty/", &b""[..]);

        let top = root.get_entries(&ResPath::empty());
        let top: Vec<_> = top.iter().map(String::as_str).collect();
        assert_eq!(top, vec!["a.txt", "dir/", "empty/"]);

        let inner = root.get_entries(&ResPath::new("dir"));
        let inner: Vec<_> = inner.iter().map(String::as_str).collect();
        assert_eq!(inner, vec!["b.txt", "deeper/"]);
    }

    #[test]
    fn test_concurrent_readers() {
        let root = Arc::new(MemoryContentRoot::new());
        for i in 0..32 {
            root.add_or_update(format!("f{i}.txt"), format!("{i}").into_bytes());
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let root = Arc::clone(&root);
                std::thread::spawn(move || {
                    for i in 0..32 {
                        assert!(root.file_exists(&ResPath::new(format!("f{i}.txt"))));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }
}
