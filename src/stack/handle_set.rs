//! Dynamically sized handle sets for the select primitive

use crate::socket::SocketHandle;
use std::collections::BTreeSet;

/// Ordered set of socket handles
///
/// Replaces the vendor's fixed-size descriptor bitmaps. The set tracks its own
/// upper bound, so callers never do max-handle bookkeeping by hand.
///
/// A select primitive receives the interest sets and must leave only the
/// ready handles in them on return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleSet {
    handles: BTreeSet<SocketHandle>,
}

impl HandleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle; returns false if it was already present
    pub fn insert(&mut self, handle: SocketHandle) -> bool {
        self.handles.insert(handle)
    }

    /// Remove a handle
    pub fn remove(&mut self, handle: SocketHandle) -> bool {
        self.handles.remove(&handle)
    }

    /// Membership test
    pub fn contains(&self, handle: SocketHandle) -> bool {
        self.handles.contains(&handle)
    }

    /// Highest handle in the set
    pub fn max_handle(&self) -> Option<SocketHandle> {
        self.handles.last().copied()
    }

    /// Search-space bound for a select call (`max handle + 1`, or 0 when empty)
    pub fn bound(&self) -> i32 {
        self.max_handle().map_or(0, |h| h.raw() + 1)
    }

    /// Keep only handles for which `f` returns true
    pub fn retain(&mut self, mut f: impl FnMut(SocketHandle) -> bool) {
        self.handles.retain(|h| f(*h));
    }

    /// Remove every handle
    pub fn clear(&mut self) {
        self.handles.clear();
    }

    /// Number of handles
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Iterate in ascending handle order
    pub fn iter(&self) -> impl Iterator<Item = SocketHandle> + '_ {
        self.handles.iter().copied()
    }
}

impl FromIterator<SocketHandle> for HandleSet {
    fn from_iter<I: IntoIterator<Item = SocketHandle>>(iter: I) -> Self {
        Self {
            handles: iter.into_iter().collect(),
        }
    }
}

/// Combined search-space bound across several sets
pub fn bound_of(sets: &[&HandleSet]) -> i32 {
    sets.iter().map(|s| s.bound()).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_tracks_highest_handle() {
        let mut set = HandleSet::new();
        assert_eq!(set.bound(), 0);

        set.insert(SocketHandle::new(3));
        set.insert(SocketHandle::new(7));
        set.insert(SocketHandle::new(5));
        assert_eq!(set.max_handle(), Some(SocketHandle::new(7)));
        assert_eq!(set.bound(), 8);

        set.remove(SocketHandle::new(7));
        assert_eq!(set.bound(), 6);
    }

    #[test]
    fn test_bound_of_multiple_sets() {
        let read: HandleSet = [1, 2].into_iter().map(SocketHandle::new).collect();
        let write: HandleSet = [9].into_iter().map(SocketHandle::new).collect();
        let error = HandleSet::new();
        assert_eq!(bound_of(&[&read, &write, &error]), 10);
        assert_eq!(bound_of(&[&error]), 0);
    }

    #[test]
    fn test_retain_leaves_ready_handles() {
        let mut set: HandleSet = (0..6).map(SocketHandle::new).collect();
        set.retain(|h| h.raw() % 2 == 0);
        assert_eq!(set.len(), 3);
        assert!(set.contains(SocketHandle::new(4)));
        assert!(!set.contains(SocketHandle::new(5)));
    }
}
