//! VFS error types.

use std::io;
use thiserror::Error;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// No mounted root serves the path.
    #[error("not found: {0}")]
    NotFound(String),

    /// A rooted path (or mount prefix) was required.
    #[error("path is not rooted: {0}")]
    NotRooted(String),

    /// Path is malformed or refers outside its root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Named-subtree search exhausted every root.
    #[error("unable to resolve {path} under any directory named {root_name}")]
    Unresolvable { root_name: String, path: String },

    /// Content pack could not be opened or read.
    #[error("content pack error: {0}")]
    Pack(#[from] zip::result::ZipError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a NotRooted error.
    pub fn not_rooted(path: impl Into<String>) -> Self {
        Self::NotRooted(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create an Unresolvable error.
    pub fn unresolvable(root_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Unresolvable {
            root_name: root_name.into(),
            path: path.into(),
        }
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns true for the not-found family (including unresolvable lookups).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unresolvable { .. })
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::NotRooted(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            e @ VfsError::Unresolvable { .. } => {
                io::Error::new(io::ErrorKind::NotFound, e.to_string())
            }
            VfsError::Pack(e) => io::Error::other(e),
            VfsError::Io(e) => e,
            VfsError::Other(msg) => io::Error::other(msg),
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: io::Error = VfsError::not_found("/a.txt").into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        let err: io::Error = VfsError::not_rooted("a.txt").into();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err: io::Error = VfsError::unresolvable("Textures", "foo.png").into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_unresolvable_message() {
        let err = VfsError::unresolvable("Textures", "sub/foo.png");
        assert_eq!(
            err.to_string(),
            "unable to resolve sub/foo.png under any directory named Textures"
        );
        assert!(err.is_not_found());
    }
}
