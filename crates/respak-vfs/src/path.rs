//! Virtual paths.
//!
//! A [`ResPath`] is an immutable, `/`-separated path in the unified content
//! namespace. Paths are cleaned on construction (`.` segments dropped, `..`
//! folded, repeated separators collapsed), so equality and hashing work on
//! the canonical string.
//!
//! ```text
//! /Textures/foo.png    rooted file
//! /Textures/           rooted directory (trailing separator)
//! sub/foo.png          relative file
//! ""                   the empty relative path: "this directory"
//! ```

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Path separator used by every virtual path.
pub const SEPARATOR: char = '/';

/// A canonical virtual path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ResPath {
    canon: String,
}

impl ResPath {
    /// Create a path, cleaning it into canonical form.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            canon: clean(path.as_ref()),
        }
    }

    /// The namespace root, `/`.
    pub fn root() -> Self {
        Self {
            canon: SEPARATOR.to_string(),
        }
    }

    /// The empty relative path, meaning "the directory itself".
    pub fn empty() -> Self {
        Self {
            canon: String::new(),
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        &self.canon
    }

    /// True if the path starts at the namespace root.
    pub fn is_rooted(&self) -> bool {
        self.canon.starts_with(SEPARATOR)
    }

    /// True if the path is relative (not rooted).
    pub fn is_relative(&self) -> bool {
        !self.is_rooted()
    }

    /// True for `/`.
    pub fn is_root(&self) -> bool {
        self.canon.len() == 1 && self.is_rooted()
    }

    /// True for the empty relative path.
    pub fn is_empty(&self) -> bool {
        self.canon.is_empty()
    }

    /// True if the path denotes a directory: it ends with a separator, or it
    /// is `/` or the empty relative path.
    pub fn is_directory(&self) -> bool {
        self.canon.is_empty() || self.canon.ends_with(SEPARATOR)
    }

    /// Non-empty segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.canon.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Final segment, or `""` for `/` and the empty path.
    pub fn filename(&self) -> &str {
        self.segments().last().unwrap_or("")
    }

    /// Extension of the final segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        match self.filename().rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// The containing directory, with a trailing separator.
    ///
    /// `/a/b.txt` and `/a/b/` both yield `/a/`; `/` yields `/`.
    pub fn directory(&self) -> ResPath {
        let segments: Vec<&str> = self.segments().collect();
        let parent = match segments.split_last() {
            Some((_, rest)) => rest.join("/"),
            None => return self.clone(),
        };
        let mut out = String::new();
        if self.is_rooted() {
            out.push(SEPARATOR);
        }
        if !parent.is_empty() {
            out.push_str(&parent);
            out.push(SEPARATOR);
        }
        Self { canon: out }
    }

    /// Append `other`, which is always treated as relative to `self`.
    pub fn join(&self, other: impl AsRef<str>) -> ResPath {
        let other = other.as_ref();
        if self.canon.is_empty() {
            return Self::new(other.trim_start_matches(SEPARATOR));
        }
        Self::new(format!("{}{}{}", self.canon, SEPARATOR, other))
    }

    /// Rooted form of this path.
    pub fn to_rooted(&self) -> ResPath {
        if self.is_rooted() {
            self.clone()
        } else {
            Self::new(format!("{}{}", SEPARATOR, self.canon))
        }
    }

    /// Relative form of this path (leading separator dropped).
    pub fn to_relative(&self) -> ResPath {
        Self::new(self.canon.trim_start_matches(SEPARATOR))
    }

    /// Directory form of this path (trailing separator added).
    pub fn as_directory(&self) -> ResPath {
        if self.is_directory() {
            self.clone()
        } else {
            Self {
                canon: format!("{}{}", self.canon, SEPARATOR),
            }
        }
    }

    /// If `base` is a segment-wise ancestor of (or equal to) `self`, return
    /// the remainder relative to `base`.
    ///
    /// Both paths must agree on rootedness. A directory remainder keeps its
    /// trailing separator; an exact match yields the empty path.
    pub fn try_relative_to(&self, base: &ResPath) -> Option<ResPath> {
        if self.is_rooted() != base.is_rooted() {
            return None;
        }

        let mut own = self.segments();
        for base_segment in base.segments() {
            if own.next()? != base_segment {
                return None;
            }
        }

        let rest: Vec<&str> = own.collect();
        if rest.is_empty() {
            return Some(Self::empty());
        }
        let mut canon = rest.join("/");
        if self.canon.ends_with(SEPARATOR) {
            canon.push(SEPARATOR);
        }
        Some(Self { canon })
    }

    /// True if `base` is a segment-wise ancestor of (or equal to) `self`.
    pub fn is_relative_to(&self, base: &ResPath) -> bool {
        self.try_relative_to(base).is_some()
    }
}

/// Clean a raw path string into canonical form.
fn clean(raw: &str) -> String {
    let rooted = raw.starts_with(SEPARATOR);
    let trailing = raw.ends_with(SEPARATOR) || raw.ends_with("/.");

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                // Nothing above the namespace root.
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(raw.len());
    if rooted {
        out.push(SEPARATOR);
    }
    out.push_str(&segments.join("/"));
    if trailing && !segments.is_empty() {
        out.push(SEPARATOR);
    }
    out
}

impl fmt::Display for ResPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canon)
    }
}

impl fmt::Debug for ResPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResPath({:?})", self.canon)
    }
}

impl FromStr for ResPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ResPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&ResPath> for ResPath {
    fn from(p: &ResPath) -> Self {
        p.clone()
    }
}

impl From<ResPath> for String {
    fn from(p: ResPath) -> Self {
        p.canon
    }
}

impl AsRef<str> for ResPath {
    fn as_ref(&self) -> &str {
        &self.canon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(ResPath::new("/a//b/./c").as_str(), "/a/b/c");
        assert_eq!(ResPath::new("/a/b/../c/").as_str(), "/a/c/");
        assert_eq!(ResPath::new("/../a").as_str(), "/a");
        assert_eq!(ResPath::new("../a").as_str(), "../a");
        assert_eq!(ResPath::new("a/..").as_str(), "");
        assert_eq!(ResPath::new("//").as_str(), "/");
        assert_eq!(ResPath::new("./").as_str(), "");
    }

    #[test]
    fn test_rooted_and_directory() {
        assert!(ResPath::new("/a.txt").is_rooted());
        assert!(ResPath::new("a.txt").is_relative());
        assert!(ResPath::root().is_root());
        assert!(ResPath::root().is_directory());
        assert!(ResPath::new("/Textures/").is_directory());
        assert!(!ResPath::new("/Textures").is_directory());
        assert!(ResPath::empty().is_directory());
    }

    #[test]
    fn test_equality_uses_canonical_form() {
        assert_eq!(ResPath::new("/a/./b"), ResPath::new("/a/b"));
        assert_ne!(ResPath::new("/a/b"), ResPath::new("/a/b/"));
        assert_ne!(ResPath::new("/a"), ResPath::new("a"));
    }

    #[test]
    fn test_filename_and_extension() {
        let p = ResPath::new("/Textures/foo.png");
        assert_eq!(p.filename(), "foo.png");
        assert_eq!(p.extension(), Some("png"));
        assert_eq!(ResPath::new("/Textures/").filename(), "Textures");
        assert_eq!(ResPath::new("/.hidden").extension(), None);
        assert_eq!(ResPath::root().filename(), "");
    }

    #[test]
    fn test_directory() {
        assert_eq!(ResPath::new("/a/b.txt").directory().as_str(), "/a/");
        assert_eq!(ResPath::new("/a/b/").directory().as_str(), "/a/");
        assert_eq!(ResPath::new("/a.txt").directory().as_str(), "/");
        assert_eq!(ResPath::root().directory().as_str(), "/");
        assert_eq!(ResPath::new("a.txt").directory().as_str(), "");
    }

    #[test]
    fn test_join() {
        assert_eq!(ResPath::root().join("a.txt").as_str(), "/a.txt");
        assert_eq!(ResPath::new("/p1").join("shared/a.txt").as_str(), "/p1/shared/a.txt");
        assert_eq!(ResPath::new("/p1/").join("/x/").as_str(), "/p1/x/");
        assert_eq!(ResPath::empty().join("a/b").as_str(), "a/b");
        assert_eq!(ResPath::new("/p1").join("").as_str(), "/p1/");
    }

    #[test]
    fn test_rooted_relative_conversion() {
        assert_eq!(ResPath::new("a/b").to_rooted().as_str(), "/a/b");
        assert_eq!(ResPath::new("/a/b/").to_relative().as_str(), "a/b/");
        assert_eq!(ResPath::root().to_relative().as_str(), "");
        assert_eq!(ResPath::new("/a").as_directory().as_str(), "/a/");
    }

    #[test]
    fn test_try_relative_to() {
        let file = ResPath::new("/p1/shared/a.txt");
        assert_eq!(
            file.try_relative_to(&ResPath::new("/p1")).unwrap().as_str(),
            "shared/a.txt"
        );
        assert_eq!(
            file.try_relative_to(&ResPath::root()).unwrap().as_str(),
            "p1/shared/a.txt"
        );
        assert!(file.try_relative_to(&ResPath::new("/p2")).is_none());
        assert!(file.try_relative_to(&ResPath::new("p1")).is_none());

        // Segment-wise, not string-wise.
        assert!(ResPath::new("/p10/a").try_relative_to(&ResPath::new("/p1")).is_none());

        let dir = ResPath::new("/p1/shared/");
        assert_eq!(
            dir.try_relative_to(&ResPath::new("/p1/")).unwrap().as_str(),
            "shared/"
        );
        assert!(ResPath::new("/p1/").try_relative_to(&ResPath::new("/p1")).unwrap().is_empty());
    }

    #[test]
    fn test_serde_string_form() {
        let p: ResPath = ron::from_str("\"/a/./b/\"").unwrap();
        assert_eq!(p.as_str(), "/a/b/");
        assert_eq!(ron::to_string(&p).unwrap(), "\"/a/b/\"");
    }
}
