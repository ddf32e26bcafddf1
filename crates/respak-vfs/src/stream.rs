//! Content streams and the stream-seek policy.
//!
//! Every successful open goes through [`apply_seek_policy`], which normalizes
//! seekability according to a live, process-wide [`SeekPolicyVar`]. The
//! policy is independent of which root served the file.

use serde::{Deserialize, Serialize};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use strum::EnumString;

/// A readable content stream that knows whether it supports seeking.
///
/// Non-seekable streams still implement [`Seek`], but every call fails with
/// [`io::ErrorKind::Unsupported`].
pub trait VfsStream: Read + Seek + Send {
    /// Returns true if `seek` is supported.
    fn is_seekable(&self) -> bool {
        true
    }
}

/// Owned stream handed to callers. Never shared between callers.
pub type ContentStream = Box<dyn VfsStream>;

impl<T: AsRef<[u8]> + Send> VfsStream for Cursor<T> {}

impl VfsStream for std::fs::File {}

/// Adapter that reports non-seekable and rejects seek operations.
#[derive(Debug)]
pub struct NonSeekable<R> {
    inner: R,
}

impl<R: Read> NonSeekable<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Unwrap the adapter.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for NonSeekable<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R> Seek for NonSeekable<R> {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "stream is not seekable",
        ))
    }
}

impl<R: Read + Send> VfsStream for NonSeekable<R> {
    fn is_seekable(&self) -> bool {
        false
    }
}

/// How returned streams are normalized.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString,
)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum SeekPolicy {
    /// Return streams unchanged.
    #[default]
    #[strum(serialize = "passthrough", serialize = "none")]
    Passthrough = 0,
    /// Buffer non-seekable streams into memory.
    #[strum(serialize = "force-seekable", serialize = "seekable")]
    ForceSeekable = 1,
    /// Hide seekability of seekable streams.
    #[strum(serialize = "force-non-seekable", serialize = "non-seekable")]
    ForceNonSeekable = 2,
}

impl SeekPolicy {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SeekPolicy::Passthrough => "passthrough",
            SeekPolicy::ForceSeekable => "force-seekable",
            SeekPolicy::ForceNonSeekable => "force-non-seekable",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SeekPolicy::ForceSeekable,
            2 => SeekPolicy::ForceNonSeekable,
            _ => SeekPolicy::Passthrough,
        }
    }
}

impl std::fmt::Display for SeekPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Live, shareable seek-policy setting.
///
/// Clones observe the same value; `set` on any clone affects every
/// subsequent open through a manager subscribed to it.
#[derive(Clone, Debug, Default)]
pub struct SeekPolicyVar {
    value: Arc<AtomicU8>,
}

impl SeekPolicyVar {
    pub fn new(policy: SeekPolicy) -> Self {
        Self {
            value: Arc::new(AtomicU8::new(policy as u8)),
        }
    }

    pub fn get(&self) -> SeekPolicy {
        SeekPolicy::from_u8(self.value.load(Ordering::Relaxed))
    }

    pub fn set(&self, policy: SeekPolicy) {
        self.value.store(policy as u8, Ordering::Relaxed);
    }
}

/// Normalize `stream` according to `policy`.
///
/// Buffering (for `ForceSeekable`) reads the whole stream; the original is
/// dropped once buffered.
pub fn apply_seek_policy(policy: SeekPolicy, mut stream: ContentStream) -> io::Result<ContentStream> {
    match policy {
        SeekPolicy::Passthrough => Ok(stream),
        SeekPolicy::ForceSeekable => {
            if stream.is_seekable() {
                return Ok(stream);
            }
            let mut buffer = Vec::new();
            stream.read_to_end(&mut buffer)?;
            drop(stream);
            Ok(Box::new(Cursor::new(buffer)))
        }
        SeekPolicy::ForceNonSeekable => {
            if !stream.is_seekable() {
                return Ok(stream);
            }
            Ok(Box::new(NonSeekable::new(stream)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seekable(data: &'static [u8]) -> ContentStream {
        Box::new(Cursor::new(data))
    }

    fn non_seekable(data: &'static [u8]) -> ContentStream {
        Box::new(NonSeekable::new(Cursor::new(data)))
    }

    fn read_all(mut stream: ContentStream) -> Vec<u8> {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_passthrough_keeps_seekability() {
        let s = apply_seek_policy(SeekPolicy::Passthrough, non_seekable(b"abc")).unwrap();
        assert!(!s.is_seekable());
        let s = apply_seek_policy(SeekPolicy::Passthrough, seekable(b"abc")).unwrap();
        assert!(s.is_seekable());
    }

    #[test]
    fn test_force_seekable_buffers() {
        let mut s = apply_seek_policy(SeekPolicy::ForceSeekable, non_seekable(b"hello")).unwrap();
        assert!(s.is_seekable());
        s.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(read_all(s), b"ello");
    }

    #[test]
    fn test_force_non_seekable_wraps() {
        let mut s = apply_seek_policy(SeekPolicy::ForceNonSeekable, seekable(b"hello")).unwrap();
        assert!(!s.is_seekable());
        let err = s.seek(SeekFrom::Start(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert_eq!(read_all(s), b"hello");
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(SeekPolicy::from_str("Force-Seekable"), Some(SeekPolicy::ForceSeekable));
        assert_eq!(SeekPolicy::from_str("non-seekable"), Some(SeekPolicy::ForceNonSeekable));
        assert_eq!(SeekPolicy::from_str("passthrough"), Some(SeekPolicy::Passthrough));
        assert_eq!(SeekPolicy::from_str("sometimes"), None);
        assert_eq!(SeekPolicy::ForceNonSeekable.to_string(), "force-non-seekable");
    }

    #[test]
    fn test_var_is_shared_between_clones() {
        let var = SeekPolicyVar::default();
        let other = var.clone();
        assert_eq!(other.get(), SeekPolicy::Passthrough);
        var.set(SeekPolicy::ForceSeekable);
        assert_eq!(other.get(), SeekPolicy::ForceSeekable);
    }
}
