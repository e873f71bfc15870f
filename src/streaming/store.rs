//! Chunk lifecycle bookkeeping
//!
//! Each key moves through `Unknown -> Generating -> CachedEmpty |
//! CachedNonEmpty -> Unknown`. The store owns the four sets behind that
//! state machine and keeps them consistent: a key is in at most one of
//! cached, empty and generating, and the active set only names cached
//! chunks.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::streaming::cache::ChunkCache;
use crate::streaming::coord::ChunkCoord;
use crate::terrain::geometry::ChunkGeometry;

/// Lifecycle state of one chunk key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkState {
    Unknown,
    Generating,
    CachedEmpty,
    CachedNonEmpty,
}

impl ChunkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkState::Unknown => "UNKNOWN",
            ChunkState::Generating => "GENERATING",
            ChunkState::CachedEmpty => "CACHED_EMPTY",
            ChunkState::CachedNonEmpty => "CACHED_NONEMPTY",
        }
    }
}

/// What `complete` did with a build result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Geometry stored as a non-empty chunk
    Stored,
    /// Recorded as known-empty
    StoredEmpty,
    /// The key was no longer in flight; result dropped
    Discarded,
}

/// Cached chunks plus the empty, in-flight and active key sets
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: ChunkCache,
    empty: HashSet<ChunkCoord>,
    generating: HashSet<ChunkCoord>,
    active: BTreeSet<ChunkCoord>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, coord: ChunkCoord) -> ChunkState {
        if self.generating.contains(&coord) {
            ChunkState::Generating
        } else if self.chunks.contains(coord) {
            ChunkState::CachedNonEmpty
        } else if self.empty.contains(&coord) {
            ChunkState::CachedEmpty
        } else {
            ChunkState::Unknown
        }
    }

    /// Move an `Unknown` key to `Generating`
    ///
    /// Returns false, changing nothing, for any other state.
    pub fn mark_generating(&mut self, coord: ChunkCoord) -> bool {
        if self.state(coord) != ChunkState::Unknown {
            return false;
        }
        self.generating.insert(coord)
    }

    /// Fold a finished build into the store
    ///
    /// Only keys still in flight are accepted; anything else was evicted or
    /// superseded while the build ran.
    pub fn complete(&mut self, coord: ChunkCoord, geometry: ChunkGeometry) -> ApplyOutcome {
        if !self.generating.remove(&coord) {
            return ApplyOutcome::Discarded;
        }
        self.store(coord, geometry)
    }

    /// Store a synchronously built chunk regardless of its previous state
    pub fn insert_built(&mut self, coord: ChunkCoord, geometry: ChunkGeometry) -> ApplyOutcome {
        self.generating.remove(&coord);
        self.store(coord, geometry)
    }

    fn store(&mut self, coord: ChunkCoord, geometry: ChunkGeometry) -> ApplyOutcome {
        if geometry.is_empty {
            self.chunks.remove(coord);
            self.active.remove(&coord);
            self.empty.insert(coord);
            ApplyOutcome::StoredEmpty
        } else {
            self.empty.remove(&coord);
            self.chunks.insert(coord, Arc::new(geometry));
            ApplyOutcome::Stored
        }
    }

    /// Return an in-flight key to `Unknown` so it can be retried
    pub fn abandon(&mut self, coord: ChunkCoord) -> bool {
        self.generating.remove(&coord)
    }

    /// Forget a key entirely, whatever its state
    pub fn evict(&mut self, coord: ChunkCoord) -> bool {
        let cached = self.chunks.remove(coord).is_some();
        let empty = self.empty.remove(&coord);
        let generating = self.generating.remove(&coord);
        self.active.remove(&coord);
        cached || empty || generating
    }

    /// Replace the active set, dropping keys that are not cached non-empty
    ///
    /// Returns the number of keys that were dropped.
    pub fn set_active<I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = ChunkCoord>,
    {
        let mut dropped = 0;
        self.active.clear();
        for key in keys {
            if self.chunks.contains(key) {
                self.active.insert(key);
            } else {
                dropped += 1;
            }
        }
        dropped
    }

    /// Trim inactive chunks, least recently used first, down to `max_cached`
    ///
    /// Returns the number of chunks removed. Active chunks are never
    /// removed, so the count can stay above the cap.
    pub fn cleanup(&mut self, max_cached: usize) -> usize {
        if self.chunks.len() <= max_cached {
            return 0;
        }
        let excess = self.chunks.len() - max_cached;
        let victims: Vec<ChunkCoord> = self
            .chunks
            .oldest_first()
            .filter(|c| !self.active.contains(c))
            .take(excess)
            .collect();
        for coord in &victims {
            self.chunks.remove(*coord);
        }
        victims.len()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.empty.clear();
        self.generating.clear();
        self.active.clear();
    }

    /// Geometry for a cached chunk, marking it recently used
    pub fn get(&mut self, coord: ChunkCoord) -> Option<Arc<ChunkGeometry>> {
        self.chunks.get(coord).cloned()
    }

    pub fn peek(&self, coord: ChunkCoord) -> Option<&Arc<ChunkGeometry>> {
        self.chunks.peek(coord)
    }

    pub fn is_active(&self, coord: ChunkCoord) -> bool {
        self.active.contains(&coord)
    }

    /// Active keys in coordinate order
    pub fn active(&self) -> &BTreeSet<ChunkCoord> {
        &self.active
    }

    /// Every key the store tracks in any state
    pub fn known_keys(&self) -> Vec<ChunkCoord> {
        self.chunks
            .coords()
            .copied()
            .chain(self.empty.iter().copied())
            .chain(self.generating.iter().copied())
            .collect()
    }

    pub fn cached_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn empty_count(&self) -> usize {
        self.empty.len()
    }

    pub fn generating_count(&self) -> usize {
        self.generating.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Whether the key is cached in either terminal state
    pub fn is_cached(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains(coord) || self.empty.contains(&coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid() -> ChunkGeometry {
        ChunkGeometry {
            origin: [0.0, 0.0],
            vertices: vec![0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0],
            colors: vec![1.0; 9],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            is_empty: false,
        }
    }

    fn c(x: i32) -> ChunkCoord {
        ChunkCoord::new(x, 0, 0)
    }

    /// A key never sits in more than one of cached, empty and generating
    fn assert_exclusive(store: &ChunkStore, keys: &[ChunkCoord]) {
        for &k in keys {
            let memberships = [
                store.chunks.contains(k),
                store.empty.contains(&k),
                store.generating.contains(&k),
            ];
            assert!(memberships.iter().filter(|&&m| m).count() <= 1, "{k} in several sets");
        }
        for k in store.active() {
            assert!(store.chunks.contains(*k));
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut store = ChunkStore::new();
        assert_eq!(store.state(c(0)), ChunkState::Unknown);

        assert!(store.mark_generating(c(0)));
        assert_eq!(store.state(c(0)), ChunkState::Generating);
        assert!(!store.mark_generating(c(0)));

        assert_eq!(store.complete(c(0), solid()), ApplyOutcome::Stored);
        assert_eq!(store.state(c(0)), ChunkState::CachedNonEmpty);
        assert!(!store.mark_generating(c(0)));

        store.mark_generating(c(1));
        assert_eq!(store.complete(c(1), ChunkGeometry::empty()), ApplyOutcome::StoredEmpty);
        assert_eq!(store.state(c(1)), ChunkState::CachedEmpty);
        assert!(!store.mark_generating(c(1)));

        assert!(store.evict(c(0)));
        assert!(store.evict(c(1)));
        assert_eq!(store.state(c(0)), ChunkState::Unknown);
        assert_eq!(store.state(c(1)), ChunkState::Unknown);
        assert!(!store.evict(c(1)));
    }

    #[test]
    fn test_results_for_evicted_keys_are_discarded() {
        let mut store = ChunkStore::new();
        store.mark_generating(c(0));
        store.evict(c(0));
        assert_eq!(store.complete(c(0), solid()), ApplyOutcome::Discarded);
        assert_eq!(store.state(c(0)), ChunkState::Unknown);

        // Never requested at all
        assert_eq!(store.complete(c(5), solid()), ApplyOutcome::Discarded);
        assert_eq!(store.cached_count(), 0);
    }

    #[test]
    fn test_abandon_returns_to_unknown() {
        let mut store = ChunkStore::new();
        store.mark_generating(c(3));
        assert!(store.abandon(c(3)));
        assert_eq!(store.state(c(3)), ChunkState::Unknown);
        assert!(store.mark_generating(c(3)));
    }

    #[test]
    fn test_no_duplicate_state_under_churn() {
        let mut store = ChunkStore::new();
        let keys: Vec<_> = (0..8).map(c).collect();
        for round in 0..4 {
            for (i, &k) in keys.iter().enumerate() {
                match (i + round) % 5 {
                    0 => {
                        store.mark_generating(k);
                    }
                    1 => {
                        store.complete(k, solid());
                    }
                    2 => {
                        store.complete(k, ChunkGeometry::empty());
                    }
                    3 => {
                        store.insert_built(k, solid());
                    }
                    _ => {
                        store.evict(k);
                    }
                }
                assert_exclusive(&store, &keys);
            }
            store.set_active(keys.iter().copied());
            assert_exclusive(&store, &keys);
        }
    }

    #[test]
    fn test_set_active_requires_cached_geometry() {
        let mut store = ChunkStore::new();
        store.insert_built(c(0), solid());
        store.insert_built(c(1), ChunkGeometry::empty());
        store.mark_generating(c(2));

        let dropped = store.set_active([c(0), c(1), c(2), c(3)]);
        assert_eq!(dropped, 3);
        assert_eq!(store.active().iter().copied().collect::<Vec<_>>(), vec![c(0)]);

        store.evict(c(0));
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_cleanup_respects_cap_and_active() {
        let mut store = ChunkStore::new();
        for x in 0..10 {
            store.insert_built(c(x), solid());
        }
        store.set_active([c(0), c(1)]);

        let removed = store.cleanup(4);
        assert_eq!(removed, 6);
        assert_eq!(store.cached_count(), 4);
        assert!(store.is_active(c(0)));
        assert!(store.is_active(c(1)));
        // Oldest inactive chunks went first
        assert_eq!(store.state(c(2)), ChunkState::Unknown);
        assert_eq!(store.state(c(9)), ChunkState::CachedNonEmpty);

        assert_eq!(store.cleanup(4), 0);
    }

    #[test]
    fn test_cleanup_cannot_drop_active() {
        let mut store = ChunkStore::new();
        for x in 0..3 {
            store.insert_built(c(x), solid());
        }
        store.set_active([c(0), c(1), c(2)]);
        assert_eq!(store.cleanup(1), 0);
        assert_eq!(store.cached_count(), 3);
    }

    #[test]
    fn test_rebuild_to_empty_leaves_active() {
        let mut store = ChunkStore::new();
        store.insert_built(c(0), solid());
        store.set_active([c(0)]);
        store.insert_built(c(0), ChunkGeometry::empty());
        assert_eq!(store.state(c(0)), ChunkState::CachedEmpty);
        assert!(!store.is_active(c(0)));
    }

    #[test]
    fn test_known_keys_and_clear() {
        let mut store = ChunkStore::new();
        store.insert_built(c(0), solid());
        store.insert_built(c(1), ChunkGeometry::empty());
        store.mark_generating(c(2));
        let mut keys = store.known_keys();
        keys.sort();
        assert_eq!(keys, vec![c(0), c(1), c(2)]);

        store.clear();
        assert!(store.known_keys().is_empty());
        assert_eq!(store.active_count(), 0);
    }
}
