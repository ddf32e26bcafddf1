//! RON configuration for a resource manager.
//!
//! ```ron
//! (
//!     seek_policy: ForceSeekable,
//!     user_data: Some("userdata"),
//!     mounts: [
//!         (source: Directory("Resources")),
//!         (source: Pack("Content.zip"), prefix: Some("/Content")),
//!     ],
//! )
//! ```
//!
//! Mounts are applied in listed order, so earlier entries shadow later ones.
//! Relative paths in a file loaded with [`VfsConfig::load`] are relative to
//! that file's directory. Configs parsed from text keep them as written, and
//! the manager then resolves them against the executable's directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::path::ResPath;
use crate::stream::SeekPolicy;

/// Backing medium of a configured mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountSource {
    /// Plain directory.
    Directory(PathBuf),
    /// Zip content pack.
    Pack(PathBuf),
}

impl MountSource {
    fn path_mut(&mut self) -> &mut PathBuf {
        match self {
            MountSource::Directory(path) | MountSource::Pack(path) => path,
        }
    }
}

/// One configured mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    pub source: MountSource,
    /// Rooted prefix; the namespace root when absent.
    #[serde(default)]
    pub prefix: Option<ResPath>,
}

/// Top-level resource manager configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    pub seek_policy: SeekPolicy,
    /// Writable user-data directory. In-memory storage when absent.
    pub user_data: Option<PathBuf>,
    pub mounts: Vec<MountConfig>,
}

impl VfsConfig {
    /// Parse from RON text.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Parse from RON bytes, e.g. a config file read through the VFS itself.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        Ok(ron::de::from_bytes(bytes)?)
    }

    /// Load from a RON file on disk, anchoring relative paths at its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = std::path::absolute(path.as_ref())?;
        let text = std::fs::read_to_string(&path)?;
        let mut config = Self::from_ron(&text)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Join every relative disk path onto `base`.
    pub fn rebase(&mut self, base: &Path) {
        let paths = self
            .mounts
            .iter_mut()
            .map(|mount| mount.source.path_mut())
            .chain(self.user_data.as_mut());
        for path in paths {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}
