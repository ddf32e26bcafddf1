//! Writable user-data storage.
//!
//! Mounted content is read-only. Saves, settings and other per-user files go
//! through a [`WritableDir`] instead: a real directory when the host provides
//! one, otherwise an ephemeral in-memory tree.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{VfsError, VfsResult};
use crate::path::ResPath;
use crate::stream::ContentStream;

/// Writable directory tree addressed by virtual paths.
///
/// Paths are interpreted relative to the storage root whether or not they
/// are rooted.
pub trait WritableDir: Send + Sync {
    /// Short variant name for diagnostics.
    fn kind(&self) -> &'static str;

    /// Real directory backing this storage, if any.
    fn root_path(&self) -> Option<&Path> {
        None
    }

    fn exists(&self, path: &ResPath) -> bool;

    fn is_dir(&self, path: &ResPath) -> bool;

    /// Create a directory and any missing parents.
    fn create_dir(&self, path: &ResPath) -> VfsResult<()>;

    /// Open a file for reading.
    fn open_read(&self, path: &ResPath) -> VfsResult<ContentStream>;

    /// Replace a file's content, creating parents as needed.
    fn write(&self, path: &ResPath, data: &[u8]) -> VfsResult<()>;

    /// Delete a file or an empty directory.
    fn delete(&self, path: &ResPath) -> VfsResult<()>;

    fn rename(&self, from: &ResPath, to: &ResPath) -> VfsResult<()>;

    /// Immediate child names of a directory. Directory names end with `/`.
    fn read_dir(&self, path: &ResPath) -> VfsResult<BTreeSet<String>>;
}

// ============================================================================
// Disk
// ============================================================================

/// User data stored in a real directory.
#[derive(Debug, Clone)]
pub struct DiskWritableDir {
    root: PathBuf,
}

impl DiskWritableDir {
    /// Use `root`, creating it if missing.
    pub fn new(root: impl Into<PathBuf>) -> VfsResult<Self> {
        let root: PathBuf = root.into();
        fs::create_dir_all(&root)?;
        let root = dunce::canonicalize(&root)?;
        Ok(Self { root })
    }

    fn resolve(&self, path: &ResPath) -> VfsResult<PathBuf> {
        let mut full = self.root.clone();
        for segment in path.segments() {
            if segment == ".." {
                return Err(VfsError::invalid_path(path.to_string()));
            }
            full.push(segment);
        }
        Ok(full)
    }
}

fn map_io(err: io::Error, path: &ResPath) -> VfsError {
    match err.kind() {
        io::ErrorKind::NotFound => VfsError::not_found(path.to_string()),
        io::ErrorKind::AlreadyExists => VfsError::already_exists(path.to_string()),
        _ => VfsError::Io(err),
    }
}

impl WritableDir for DiskWritableDir {
    fn kind(&self) -> &'static str {
        "disk"
    }

    fn root_path(&self) -> Option<&Path> {
        Some(&self.root)
    }

    fn exists(&self, path: &ResPath) -> bool {
        self.resolve(path).is_ok_and(|full| full.exists())
    }

    fn is_dir(&self, path: &ResPath) -> bool {
        self.resolve(path).is_ok_and(|full| full.is_dir())
    }

    fn create_dir(&self, path: &ResPath) -> VfsResult<()> {
        let full = self.resolve(path)?;
        fs::create_dir_all(full).map_err(|e| map_io(e, path))
    }

    fn open_read(&self, path: &ResPath) -> VfsResult<ContentStream> {
        let full = self.resolve(path)?;
        if full.is_dir() {
            return Err(VfsError::is_a_directory(path.to_string()));
        }
        let file = fs::File::open(full).map_err(|e| map_io(e, path))?;
        Ok(Box::new(file))
    }

    fn write(&self, path: &ResPath, data: &[u8]) -> VfsResult<()> {
        if path.is_directory() {
            return Err(VfsError::is_a_directory(path.to_string()));
        }
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| map_io(e, path))?;
        }
        fs::write(full, data).map_err(|e| map_io(e, path))
    }

    fn delete(&self, path: &ResPath) -> VfsResult<()> {
        let full = self.resolve(path)?;
        let result = if full.is_dir() {
            fs::remove_dir(full)
        } else {
            fs::remove_file(full)
        };
        result.map_err(|e| map_io(e, path))
    }

    fn rename(&self, from: &ResPath, to: &ResPath) -> VfsResult<()> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        fs::rename(src, dst).map_err(|e| map_io(e, from))
    }

    fn read_dir(&self, path: &ResPath) -> VfsResult<BTreeSet<String>> {
        let full = self.resolve(path)?;
        if full.is_file() {
            return Err(VfsError::not_a_directory(path.to_string()));
        }
        let mut entries = BTreeSet::new();
        for entry in fs::read_dir(full).map_err(|e| map_io(e, path))? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if entry.file_type()?.is_dir() {
                entries.insert(format!("{}/", name));
            } else {
                entries.insert(name);
            }
        }
        Ok(entries)
    }
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Clone)]
enum Entry {
    File(Arc<[u8]>),
    Directory,
}

/// Ephemeral user data, used when no user-data directory is configured.
///
/// Everything is lost when dropped.
#[derive(Debug)]
pub struct MemoryWritableDir {
    /// Keyed by clean relative path without trailing separator. `""` is the root.
    entries: RwLock<HashMap<String, Entry>>,
}

impl Default for MemoryWritableDir {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWritableDir {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(String::new(), Entry::Directory);
        Self {
            entries: RwLock::new(entries),
        }
    }

    fn key(path: &ResPath) -> VfsResult<String> {
        let segments: Vec<&str> = path.segments().collect();
        if segments.contains(&"..") {
            return Err(VfsError::invalid_path(path.to_string()));
        }
        Ok(segments.join("/"))
    }

    fn parent_key(key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        Some(key.rsplit_once('/').map_or("", |(parent, _)| parent))
    }

    fn ensure_parents(entries: &mut HashMap<String, Entry>, key: &str) -> VfsResult<()> {
        let mut parents = Vec::new();
        let mut current = Self::parent_key(key);
        while let Some(parent) = current {
            parents.push(parent.to_string());
            current = Self::parent_key(parent);
        }
        for parent in parents.into_iter().rev() {
            match entries.get(&parent) {
                Some(Entry::Directory) => {}
                Some(Entry::File(_)) => return Err(VfsError::not_a_directory(parent)),
                None => {
                    entries.insert(parent, Entry::Directory);
                }
            }
        }
        Ok(())
    }

    fn has_children(entries: &HashMap<String, Entry>, key: &str) -> bool {
        entries
            .keys()
            .any(|k| !k.is_empty() && Self::parent_key(k) == Some(key))
    }
}

impl WritableDir for MemoryWritableDir {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn exists(&self, path: &ResPath) -> bool {
        Self::key(path).is_ok_and(|key| self.entries.read().contains_key(&key))
    }

    fn is_dir(&self, path: &ResPath) -> bool {
        Self::key(path).is_ok_and(|key| {
            matches!(self.entries.read().get(&key), Some(Entry::Directory))
        })
    }

    fn create_dir(&self, path: &ResPath) -> VfsResult<()> {
        let key = Self::key(path)?;
        let mut entries = self.entries.write();
        match entries.get(&key) {
            Some(Entry::Directory) => return Ok(()),
            Some(Entry::File(_)) => return Err(VfsError::already_exists(path.to_string())),
            None => {}
        }
        Self::ensure_parents(&mut entries, &key)?;
        entries.insert(key, Entry::Directory);
        Ok(())
    }

    fn open_read(&self, path: &ResPath) -> VfsResult<ContentStream> {
        let key = Self::key(path)?;
        match self.entries.read().get(&key) {
            Some(Entry::File(data)) => Ok(Box::new(Cursor::new(Arc::clone(data)))),
            Some(Entry::Directory) => Err(VfsError::is_a_directory(path.to_string())),
            None => Err(VfsError::not_found(path.to_string())),
        }
    }

    fn write(&self, path: &ResPath, data: &[u8]) -> VfsResult<()> {
        if path.is_directory() {
            return Err(VfsError::is_a_directory(path.to_string()));
        }
        let key = Self::key(path)?;
        let mut entries = self.entries.write();
        if matches!(entries.get(&key), Some(Entry::Directory)) {
            return Err(VfsError::is_a_directory(path.to_string()));
        }
        Self::ensure_parents(&mut entries, &key)?;
        entries.insert(key, Entry::File(Arc::from(data)));
        Ok(())
    }

    fn delete(&self, path: &ResPath) -> VfsResult<()> {
        let key = Self::key(path)?;
        if key.is_empty() {
            return Err(VfsError::invalid_path(path.to_string()));
        }
        let mut entries = self.entries.write();
        match entries.get(&key) {
            None => Err(VfsError::not_found(path.to_string())),
            Some(Entry::Directory) if Self::has_children(&entries, &key) => Err(
                VfsError::other(format!("directory not empty: {}", path)),
            ),
            Some(_) => {
                entries.remove(&key);
                Ok(())
            }
        }
    }

    fn rename(&self, from: &ResPath, to: &ResPath) -> VfsResult<()> {
        let src = Self::key(from)?;
        let dst = Self::key(to)?;
        let mut entries = self.entries.write();
        let entry = entries
            .get(&src)
            .cloned()
            .ok_or_else(|| VfsError::not_found(from.to_string()))?;
        if matches!(entry, Entry::Directory) && Self::has_children(&entries, &src) {
            return Err(VfsError::other(format!("directory not empty: {}", from)));
        }
        Self::ensure_parents(&mut entries, &dst)?;
        entries.remove(&src);
        entries.insert(dst, entry);
        Ok(())
    }

    fn read_dir(&self, path: &ResPath) -> VfsResult<BTreeSet<String>> {
        let key = Self::key(path)?;
        let entries = self.entries.read();
        match entries.get(&key) {
            Some(Entry::Directory) => {}
            Some(Entry::File(_)) => return Err(VfsError::not_a_directory(path.to_string())),
            None => return Err(VfsError::not_found(path.to_string())),
        }

        let mut names = BTreeSet::new();
        for (child, entry) in entries.iter() {
            if child.is_empty() || Self::parent_key(child) != Some(key.as_str()) {
                continue;
            }
            let name = child.rsplit('/').next().unwrap_or(child);
            match entry {
                Entry::Directory => names.insert(format!("{}/", name)),
                Entry::File(_) => names.insert(name.to_string()),
            };
        }
        Ok(names)
    }
}
