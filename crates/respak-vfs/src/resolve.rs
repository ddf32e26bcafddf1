//! Named-subtree resolution cache.
//!
//! Results are memoized permanently, positive and negative alike. Nothing in
//! the manager invalidates them when roots are added; callers that change the
//! mount topology and need fresh answers call [`ResolutionCache::clear`].

use dashmap::{DashMap, DashSet};

use crate::path::ResPath;

/// Identity of a resolution request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveKey {
    /// Final segment of the directories searched for.
    pub root_name: String,
    /// Path looked up beneath each matching directory.
    pub path: ResPath,
    /// Rooted directory the search starts from.
    pub origin: ResPath,
}

impl ResolveKey {
    pub fn new(root_name: impl Into<String>, path: ResPath, origin: ResPath) -> Self {
        Self {
            root_name: root_name.into(),
            path,
            origin,
        }
    }
}

/// Concurrent positive and negative resolution caches.
///
/// Racing first-time resolutions of the same key may both scan; whichever
/// inserts last wins, and both computed the same answer against the same
/// registry snapshot order.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    resolved: DashMap<ResolveKey, ResPath>,
    unresolvable: DashSet<ResolveKey>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previously resolved path for `key`.
    pub fn get(&self, key: &ResolveKey) -> Option<ResPath> {
        self.resolved.get(key).map(|entry| entry.value().clone())
    }

    /// True if `key` already failed to resolve.
    pub fn is_unresolvable(&self, key: &ResolveKey) -> bool {
        self.unresolvable.contains(key)
    }

    pub fn insert_resolved(&self, key: ResolveKey, resolved: ResPath) {
        self.unresolvable.remove(&key);
        self.resolved.insert(key, resolved);
    }

    pub fn insert_unresolvable(&self, key: ResolveKey) {
        self.unresolvable.insert(key);
    }

    /// Number of cached entries, positive plus negative.
    pub fn len(&self) -> usize {
        self.resolved.len() + self.unresolvable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty() && self.unresolvable.is_empty()
    }

    /// Forget every cached result.
    pub fn clear(&self) {
        self.resolved.clear();
        self.unresolvable.clear();
    }
}
