//! # respak-vfs
//!
//! Read-mostly virtual filesystem for game assets.
//!
//! Content packs (zip), plain directories, in-memory blobs and single
//! injected streams are mounted under rooted prefixes of one namespace.
//! Consumers read `/Textures/foo.png` without knowing which source backs it.
//!
//! - Mount order is shadow priority: the earliest root holding a file wins.
//! - Listings merge every matching root and drop duplicates.
//! - Named-subtree lookups (`resolve_path`) are cached permanently.
//! - Every opened stream passes through a live, shareable seek policy.
//!
//! ```no_run
//! use respak_vfs::{MemoryContentRoot, ResPath, ResourceManager};
//!
//! let manager = ResourceManager::new();
//! let root = MemoryContentRoot::new();
//! root.add_or_update("a.txt", &b"hello"[..]);
//! manager.add_root("/", root)?;
//! let data = manager.content_file_read_to_end(&ResPath::new("/a.txt"))?;
//! assert_eq!(data, b"hello");
//! # Ok::<(), respak_vfs::VfsError>(())
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod path;
pub mod resolve;
pub mod root;
pub mod roots;
pub mod stream;
pub mod user_data;
pub mod validate;

pub use config::{ConfigError, MountConfig, MountSource, VfsConfig};
pub use error::{VfsError, VfsResult};
pub use manager::{MergedPaths, MountEntry, MountInfo, ResourceManager};
pub use path::ResPath;
pub use resolve::{ResolutionCache, ResolveKey};
pub use root::{ContentRoot, DirectoryFilter, PathIter, directory_named};
pub use roots::{
    DirectoryContentRoot, MemoryContentRoot, PackContentRoot, PackReader, PackSource,
    SingleStreamContentRoot,
};
pub use stream::{
    ContentStream, NonSeekable, SeekPolicy, SeekPolicyVar, VfsStream, apply_seek_policy,
};
pub use user_data::{DiskWritableDir, MemoryWritableDir, WritableDir};
