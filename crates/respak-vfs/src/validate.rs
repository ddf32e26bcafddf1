//! Host-filesystem path validation.
//!
//! Content must be loadable from a plain directory on every host, so paths
//! that a common host filesystem cannot represent are rejected: control
//! characters, `<>:"\|?*`, and legacy reserved device names (`CON`,
//! `NUL.txt`, `com1`, ...). The check only runs in debug builds, see
//! [`debug_validate`].

use crate::path::ResPath;

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &["CON", "PRN", "AUX", "NUL"];

const RESERVED_NUMBERED: &[&str] = &["COM", "LPT"];

/// Reasons a path fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathIssue {
    #[error("segment {segment:?} contains invalid character {ch:?}")]
    InvalidChar { segment: String, ch: char },
    #[error("segment {0:?} is a reserved device name")]
    ReservedName(String),
}

/// Check every segment of `path`.
pub fn check_path(path: &ResPath) -> Result<(), PathIssue> {
    for segment in path.segments() {
        if let Some(ch) = segment
            .chars()
            .find(|c| c.is_control() || INVALID_CHARS.contains(c))
        {
            return Err(PathIssue::InvalidChar {
                segment: segment.to_string(),
                ch,
            });
        }
        if is_reserved_name(segment) {
            return Err(PathIssue::ReservedName(segment.to_string()));
        }
    }
    Ok(())
}

/// True if the segment's stem (text before the first `.`) is a reserved
/// device name, ignoring case.
fn is_reserved_name(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment).trim_end();

    if RESERVED_NAMES.iter().any(|name| stem.eq_ignore_ascii_case(name)) {
        return true;
    }

    RESERVED_NUMBERED.iter().any(|name| {
        stem.len() == name.len() + 1
            && stem
                .get(..name.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(name))
            && stem.as_bytes()[name.len()].is_ascii_digit()
    })
}

/// Validate in debug builds; always passes in release builds.
///
/// Failures are logged and should be treated as not-found by the caller.
pub fn debug_validate(path: &ResPath) -> bool {
    if !cfg!(debug_assertions) {
        return true;
    }
    match check_path(path) {
        Ok(()) => true,
        Err(issue) => {
            tracing::warn!("Rejecting content path {}: {}", path, issue);
            false
        }
    }
}
