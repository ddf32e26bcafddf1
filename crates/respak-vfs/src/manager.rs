//! Resource manager: the mount registry and cross-root dispatch.
//!
//! Roots are mounted at rooted prefixes and kept in mount order. Reads scan
//! that order and the first root holding the file wins; listings merge every
//! matching root and drop duplicates. The registry is a copy-on-write
//! snapshot, so reads never take a lock.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{MountSource, VfsConfig};
use crate::error::{VfsError, VfsResult};
use crate::path::ResPath;
use crate::resolve::{ResolutionCache, ResolveKey};
use crate::root::{ContentRoot, DirectoryFilter, PathIter, directory_named};
use crate::roots::{DirectoryContentRoot, PackContentRoot, PackSource, SingleStreamContentRoot};
use crate::stream::{ContentStream, SeekPolicyVar, apply_seek_policy};
use crate::user_data::{DiskWritableDir, MemoryWritableDir, WritableDir};
use crate::validate;

/// A mounted root and the rooted prefix its contents appear under.
#[derive(Clone)]
pub struct MountEntry {
    /// Rooted, with a trailing separator (`/` or `/Content/`).
    pub prefix: ResPath,
    pub root: Arc<dyn ContentRoot>,
}

impl std::fmt::Debug for MountEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountEntry")
            .field("prefix", &self.prefix)
            .field("kind", &self.root.kind())
            .finish()
    }
}

/// Information about a mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    pub prefix: ResPath,
    /// Root variant, e.g. `"directory"` or `"pack"`.
    pub kind: &'static str,
    /// On-disk directory, for directory-backed roots.
    pub disk_path: Option<PathBuf>,
}

/// How a query directory relates to a mount prefix.
enum Scope {
    /// The query is at or below the prefix; holds the root-relative remainder.
    Within(ResPath),
    /// The prefix lies strictly below the query.
    Above,
}

fn scope(query_dir: &ResPath, prefix: &ResPath) -> Option<Scope> {
    if let Some(rest) = query_dir.try_relative_to(prefix) {
        return Some(Scope::Within(rest));
    }
    prefix.try_relative_to(query_dir).map(|_| Scope::Above)
}

type OpenRoot<'a> = Box<dyn FnMut(&dyn ContentRoot, Scope) -> Option<PathIter> + 'a>;

/// Lazy, de-duplicated enumeration across every mounted root.
///
/// Roots are visited in mount order. The registry is reloaded each time the
/// iterator moves on to the next root, so a root mounted mid-enumeration is
/// visited if the iterator has not yet passed its index.
pub struct MergedPaths<'a> {
    mounts: &'a ArcSwap<Vec<MountEntry>>,
    query: ResPath,
    next_root: usize,
    current: Option<(ResPath, PathIter)>,
    seen: HashSet<ResPath>,
    filter: Option<DirectoryFilter>,
    open: OpenRoot<'a>,
}

impl<'a> MergedPaths<'a> {
    fn new(mounts: &'a ArcSwap<Vec<MountEntry>>, query: ResPath, open: OpenRoot<'a>) -> Self {
        Self {
            mounts,
            query,
            next_root: 0,
            current: None,
            seen: HashSet::new(),
            filter: None,
            open,
        }
    }

    fn with_filter(mut self, filter: Option<DirectoryFilter>) -> Self {
        self.filter = filter;
        self
    }
}

impl Iterator for MergedPaths<'_> {
    type Item = ResPath;

    fn next(&mut self) -> Option<ResPath> {
        loop {
            if let Some((prefix, paths)) = self.current.as_mut() {
                for relative in paths.by_ref() {
                    let full = prefix.join(relative.as_str());
                    if self.filter.as_ref().is_some_and(|f| !f(&full)) {
                        continue;
                    }
                    if self.seen.insert(full.clone()) {
                        return Some(full);
                    }
                }
                self.current = None;
            }

            let entry = self.mounts.load().get(self.next_root).cloned()?;
            self.next_root += 1;
            let Some(scope) = scope(&self.query, &entry.prefix) else {
                continue;
            };
            if let Some(paths) = (self.open)(entry.root.as_ref(), scope) {
                self.current = Some((entry.prefix, paths));
            }
        }
    }
}

/// Unifies mounted content roots under one rooted namespace.
///
/// Shareable across threads; every operation takes `&self` except
/// [`initialize`](Self::initialize).
pub struct ResourceManager {
    mounts: ArcSwap<Vec<MountEntry>>,
    /// Serializes registry publication.
    mount_lock: Mutex<()>,
    seek_policy: SeekPolicyVar,
    resolution: ResolutionCache,
    user_data: Arc<dyn WritableDir>,
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("mounts", &self.mounts.load().len())
            .field("seek_policy", &self.seek_policy.get())
            .field("user_data", &self.user_data.kind())
            .finish()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceManager {
    /// Create a manager with no mounts, in-memory user data and a private
    /// passthrough seek policy.
    pub fn new() -> Self {
        Self {
            mounts: ArcSwap::from_pointee(Vec::new()),
            mount_lock: Mutex::new(()),
            seek_policy: SeekPolicyVar::default(),
            resolution: ResolutionCache::new(),
            user_data: Arc::new(MemoryWritableDir::new()),
        }
    }

    /// Set up user-data storage and subscribe to `seek_policy`.
    ///
    /// A real directory (created if missing) backs user data when a path is
    /// given; otherwise it lives in memory.
    pub fn initialize(&mut self, user_data: Option<&Path>, seek_policy: &SeekPolicyVar) -> VfsResult<()> {
        let storage: Arc<dyn WritableDir> = match user_data {
            Some(path) => Arc::new(DiskWritableDir::new(path)?),
            None => Arc::new(MemoryWritableDir::new()),
        };
        self.user_data = storage;
        self.seek_policy = seek_policy.clone();
        info!(
            "Initialized resource manager: {} user data, seek policy {}",
            self.user_data.kind(),
            seek_policy.get()
        );
        Ok(())
    }

    /// Build, initialize and mount everything a config describes.
    pub fn from_config(config: &VfsConfig) -> VfsResult<Self> {
        let mut manager = Self::new();
        let seek_policy = SeekPolicyVar::new(config.seek_policy);
        manager.initialize(config.user_data.as_deref(), &seek_policy)?;
        for mount in &config.mounts {
            match &mount.source {
                MountSource::Directory(path) => {
                    manager.mount_content_directory(path, mount.prefix.clone())?
                }
                MountSource::Pack(path) => manager
                    .mount_content_pack(PackSource::Path(path.clone()), mount.prefix.clone())?,
            }
        }
        Ok(manager)
    }

    /// Writable user-data storage.
    pub fn user_data(&self) -> &dyn WritableDir {
        self.user_data.as_ref()
    }

    /// The live seek policy applied to every open.
    pub fn seek_policy(&self) -> &SeekPolicyVar {
        &self.seek_policy
    }

    // ========================================================================
    // Mounting
    // ========================================================================

    /// Mount `root` under `prefix`.
    ///
    /// `root.mount()` runs first and its failure aborts the mount. The new
    /// registry is published atomically; readers see either the old or the
    /// new one.
    pub fn add_root(&self, prefix: impl Into<ResPath>, root: impl ContentRoot + 'static) -> VfsResult<()> {
        self.add_root_arc(prefix, Arc::new(root))
    }

    /// Mount an already shared root under `prefix`.
    pub fn add_root_arc(&self, prefix: impl Into<ResPath>, root: Arc<dyn ContentRoot>) -> VfsResult<()> {
        let prefix = mount_prefix(Some(prefix.into()))?;
        root.mount()?;

        let _guard = self.mount_lock.lock();
        let current = self.mounts.load();
        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        info!("Mounted {} root at {} (#{})", root.kind(), prefix, next.len());
        next.push(MountEntry { prefix, root });
        self.mounts.store(Arc::new(next));
        Ok(())
    }

    /// Mount a zip content pack from a file or a seekable stream.
    pub fn mount_content_pack(&self, source: PackSource, prefix: Option<ResPath>) -> VfsResult<()> {
        let prefix = mount_prefix(prefix)?;
        let source = match source {
            PackSource::Path(path) => PackSource::Path(resolve_disk_path(&path)?),
            stream => stream,
        };
        self.add_root(prefix, PackContentRoot::new(source))
    }

    /// Mount a plain directory.
    pub fn mount_content_directory(&self, path: impl AsRef<Path>, prefix: Option<ResPath>) -> VfsResult<()> {
        let prefix = mount_prefix(prefix)?;
        let path = resolve_disk_path(path.as_ref())?;
        self.add_root(prefix, DirectoryContentRoot::new(path))
    }

    /// Expose `stream` as the single file at rooted `path`.
    pub fn mount_stream_at(
        &self,
        stream: impl Read + Send + 'static,
        path: impl Into<ResPath>,
    ) -> VfsResult<()> {
        let path = path.into();
        if !path.is_rooted() {
            return Err(VfsError::not_rooted(path.to_string()));
        }
        if path.is_directory() {
            return Err(VfsError::is_a_directory(path.to_string()));
        }
        let root = SingleStreamContentRoot::new(stream, path.filename());
        self.add_root(path.directory(), root)
    }

    /// Snapshot of the current mounts, in mount order.
    pub fn mounts(&self) -> Vec<MountInfo> {
        self.mounts
            .load()
            .iter()
            .map(|entry| MountInfo {
                prefix: entry.prefix.clone(),
                kind: entry.root.kind(),
                disk_path: entry.root.disk_root().map(Path::to_path_buf),
            })
            .collect()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Open the file at rooted `path` from the first root that has it.
    ///
    /// `Ok(None)` when no root serves the path, when the path names a
    /// directory, or when debug validation rejects it.
    pub fn try_content_file_read(&self, path: &ResPath) -> VfsResult<Option<ContentStream>> {
        ensure_rooted(path)?;
        if path.is_directory() || !validate::debug_validate(path) {
            return Ok(None);
        }

        for entry in self.mounts.load().iter() {
            let Some(relative) = path.try_relative_to(&entry.prefix) else {
                continue;
            };
            if let Some(stream) = entry.root.try_get_file(&relative) {
                debug!("Opened {} from {} root at {}", path, entry.root.kind(), entry.prefix);
                return Ok(Some(apply_seek_policy(self.seek_policy.get(), stream)?));
            }
        }
        Ok(None)
    }

    /// Open the file at rooted `path`, failing with `NotFound` if absent.
    pub fn content_file_read(&self, path: &ResPath) -> VfsResult<ContentStream> {
        self.try_content_file_read(path)?
            .ok_or_else(|| VfsError::not_found(path.to_string()))
    }

    /// Read the whole file at rooted `path`.
    pub fn content_file_read_to_end(&self, path: &ResPath) -> VfsResult<Vec<u8>> {
        let mut stream = self.content_file_read(path)?;
        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;
        Ok(data)
    }

    /// True if some root serves a file at rooted `path`.
    pub fn content_file_exists(&self, path: &ResPath) -> VfsResult<bool> {
        ensure_rooted(path)?;
        if path.is_directory() || !validate::debug_validate(path) {
            return Ok(false);
        }
        Ok(self.mounts.load().iter().any(|entry| {
            path.try_relative_to(&entry.prefix)
                .is_some_and(|relative| entry.root.file_exists(&relative))
        }))
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Files under rooted `path`, merged across roots in mount order.
    ///
    /// Each call starts a fresh enumeration over the current registry.
    pub fn content_find_files(&self, path: &ResPath, recursive: bool) -> VfsResult<MergedPaths<'_>> {
        ensure_rooted(path)?;
        Ok(self.merged_files(path.as_directory(), recursive))
    }

    /// Directories under rooted `path`, merged across roots in mount order.
    pub fn content_find_directories(&self, path: &ResPath) -> VfsResult<MergedPaths<'_>> {
        ensure_rooted(path)?;
        Ok(self.merged_directories(path.as_directory(), None))
    }

    /// Like [`content_find_directories`](Self::content_find_directories),
    /// keeping only rooted directory paths that pass `filter`.
    pub fn content_find_directories_matching(
        &self,
        path: &ResPath,
        filter: DirectoryFilter,
    ) -> VfsResult<MergedPaths<'_>> {
        ensure_rooted(path)?;
        Ok(self.merged_directories(path.as_directory(), Some(filter)))
    }

    /// Immediate child names of rooted `path` across every root.
    ///
    /// Mount prefixes below `path` show up as directories even when no root
    /// materializes them.
    pub fn content_get_directory_entries(&self, path: &ResPath) -> VfsResult<BTreeSet<String>> {
        ensure_rooted(path)?;
        let dir = path.as_directory();
        let mut entries = BTreeSet::new();

        for entry in self.mounts.load().iter() {
            if let Some(relative) = dir.try_relative_to(&entry.prefix) {
                entries.extend(entry.root.get_entries(&relative));
            } else if let Some(below) = entry.prefix.try_relative_to(&dir) {
                if let Some(first) = below.segments().next() {
                    entries.insert(format!("{}/", first));
                }
            }
        }
        Ok(entries)
    }

    /// All files below every directory under `search_path` whose final
    /// segment is `directory_name`.
    pub fn content_find_files_under_directories_with_name(
        &self,
        search_path: &ResPath,
        directory_name: &str,
    ) -> VfsResult<impl Iterator<Item = ResPath> + '_> {
        ensure_rooted(search_path)?;
        let directories: Vec<ResPath> = self
            .merged_directories(search_path.as_directory(), Some(directory_named(directory_name)))
            .collect();
        Ok(directories
            .into_iter()
            .flat_map(move |dir| self.merged_files(dir, true)))
    }

    fn merged_files(&self, query: ResPath, recursive: bool) -> MergedPaths<'_> {
        let open = move |root: &dyn ContentRoot, scope: Scope| match scope {
            Scope::Within(relative) => Some(root.find_files(&relative, recursive)),
            Scope::Above if recursive => Some(root.find_files(&ResPath::empty(), true)),
            // Nothing in this root is a direct child of the query.
            Scope::Above => None,
        };
        MergedPaths::new(&self.mounts, query, Box::new(open))
    }

    fn merged_directories(&self, query: ResPath, filter: Option<DirectoryFilter>) -> MergedPaths<'_> {
        let open = |root: &dyn ContentRoot, scope: Scope| match scope {
            Scope::Within(relative) => Some(root.find_directories(&relative, None)),
            Scope::Above => Some(root.find_directories(&ResPath::empty(), None)),
        };
        MergedPaths::new(&self.mounts, query, Box::new(open)).with_filter(filter)
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Find `path_to_resolve` beneath some directory named `root_name`.
    ///
    /// Directories are searched under `search_origin` (the namespace root by
    /// default), roots in mount order, then directories in each root's
    /// enumeration order. Hits and misses are cached permanently; see
    /// [`clear_resolution_cache`](Self::clear_resolution_cache).
    ///
    /// A `path_to_resolve` that climbs above the named directory with `..`
    /// is rejected with `InvalidPath` and never cached.
    pub fn resolve_path(
        &self,
        root_name: &str,
        path_to_resolve: impl Into<ResPath>,
        search_origin: Option<&ResPath>,
    ) -> VfsResult<ResPath> {
        let path = path_to_resolve.into().to_relative();
        // Cleaning leaves `..` only where the path escapes its base.
        if path.segments().any(|segment| segment == "..") {
            return Err(VfsError::invalid_path(path.to_string()));
        }
        let origin = search_origin.map_or_else(ResPath::root, |o| o.to_rooted().as_directory());
        let key = ResolveKey::new(root_name, path.clone(), origin.clone());

        if let Some(resolved) = self.resolution.get(&key) {
            debug!("Resolution cache hit: {} in {} -> {}", path, root_name, resolved);
            return Ok(resolved);
        }
        if self.resolution.is_unresolvable(&key) {
            warn!("{} in {} was previously found unresolvable", path, root_name);
            return Err(VfsError::unresolvable(root_name, path.to_string()));
        }

        let named = directory_named(root_name);
        let snapshot = self.mounts.load_full();
        for entry in snapshot.iter() {
            let search_root = match scope(&origin, &entry.prefix) {
                Some(Scope::Within(relative)) => relative,
                Some(Scope::Above) => ResPath::empty(),
                None => continue,
            };
            for dir in entry.root.find_directories(&search_root, Some(Arc::clone(&named))) {
                let candidate = dir.join(path.as_str());
                if exists_in(entry.root.as_ref(), &candidate) {
                    let resolved = entry.prefix.join(candidate.as_str());
                    debug!("Resolved {} in {} -> {}", path, root_name, resolved);
                    self.resolution.insert_resolved(key, resolved.clone());
                    return Ok(resolved);
                }
            }
        }

        warn!("Unable to resolve {} in {} under {}", path, root_name, origin);
        self.resolution.insert_unresolvable(key);
        Err(VfsError::unresolvable(root_name, path.to_string()))
    }

    /// [`resolve_path`](Self::resolve_path) with failures mapped to `None`.
    pub fn try_resolve_path(
        &self,
        root_name: &str,
        path_to_resolve: impl Into<ResPath>,
        search_origin: Option<&ResPath>,
    ) -> Option<ResPath> {
        self.resolve_path(root_name, path_to_resolve, search_origin).ok()
    }

    /// Drop every cached resolution, positive and negative.
    ///
    /// Never called implicitly; mounting does not invalidate the cache.
    pub fn clear_resolution_cache(&self) {
        let dropped = self.resolution.len();
        self.resolution.clear();
        info!("Cleared resolution cache ({} entries)", dropped);
    }

    // ========================================================================
    // Disk bridging
    // ========================================================================

    /// Real on-disk path of the file at rooted `path`, if a directory-backed
    /// root serves it. Other root kinds are skipped.
    pub fn try_get_disk_file_path(&self, path: &ResPath) -> VfsResult<Option<PathBuf>> {
        ensure_rooted(path)?;
        if path.is_directory() {
            return Ok(None);
        }
        Ok(self.mounts.load().iter().find_map(|entry| {
            let relative = path.try_relative_to(&entry.prefix)?;
            entry.root.real_path(&relative)
        }))
    }

    /// Disk directories of every directory-backed root, in mount order.
    pub fn get_content_roots(&self) -> Vec<PathBuf> {
        self.mounts
            .load()
            .iter()
            .filter_map(|entry| entry.root.disk_root().map(Path::to_path_buf))
            .collect()
    }
}

fn ensure_rooted(path: &ResPath) -> VfsResult<()> {
    if path.is_rooted() {
        Ok(())
    } else {
        Err(VfsError::not_rooted(path.to_string()))
    }
}

/// Normalize a mount prefix: the namespace root when absent, always with a
/// trailing separator.
fn mount_prefix(prefix: Option<ResPath>) -> VfsResult<ResPath> {
    match prefix {
        None => Ok(ResPath::root()),
        Some(prefix) => {
            ensure_rooted(&prefix)?;
            Ok(prefix.as_directory())
        }
    }
}

/// Relative disk paths are taken relative to the running executable.
fn resolve_disk_path(path: &Path) -> VfsResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let exe = std::env::current_exe()?;
    let base = exe
        .parent()
        .ok_or_else(|| VfsError::other("executable has no parent directory"))?;
    Ok(base.join(path))
}

fn exists_in(root: &dyn ContentRoot, candidate: &ResPath) -> bool {
    if candidate.is_directory() {
        !root.get_entries(candidate).is_empty()
    } else {
        root.file_exists(candidate)
    }
}
