//! LRU cache for built chunk geometry
//!
//! Holds every non-empty chunk the store knows about. Access order is
//! tracked so cache trimming can drop the least recently used chunk first.

use std::collections::HashMap;
use std::sync::Arc;

use crate::streaming::coord::ChunkCoord;
use crate::terrain::geometry::ChunkGeometry;

/// LRU map from coordinate to shared geometry
///
/// Unlike a bounded LRU, insertion never evicts on its own: the store
/// decides what may go, because active chunks must survive trimming.
#[derive(Debug, Default)]
pub struct ChunkCache {
    chunks: HashMap<ChunkCoord, Arc<ChunkGeometry>>,
    /// Oldest first, newest last
    access_order: Vec<ChunkCoord>,
}

impl ChunkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a chunk and mark it as recently used
    pub fn get(&mut self, coord: ChunkCoord) -> Option<&Arc<ChunkGeometry>> {
        if self.chunks.contains_key(&coord) {
            self.touch(coord);
            self.chunks.get(&coord)
        } else {
            None
        }
    }

    /// Get a chunk without changing its recency
    pub fn peek(&self, coord: ChunkCoord) -> Option<&Arc<ChunkGeometry>> {
        self.chunks.get(&coord)
    }

    /// Insert or replace a chunk, returning the replaced geometry
    pub fn insert(&mut self, coord: ChunkCoord, geometry: Arc<ChunkGeometry>) -> Option<Arc<ChunkGeometry>> {
        self.remove_from_access_order(coord);
        self.access_order.push(coord);
        self.chunks.insert(coord, geometry)
    }

    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Arc<ChunkGeometry>> {
        self.remove_from_access_order(coord);
        self.chunks.remove(&coord)
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Coordinates from least to most recently used
    pub fn oldest_first(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.access_order.iter().copied()
    }

    pub fn coords(&self) -> impl Iterator<Item = &ChunkCoord> {
        self.chunks.keys()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.access_order.clear();
    }

    fn touch(&mut self, coord: ChunkCoord) {
        self.remove_from_access_order(coord);
        self.access_order.push(coord);
    }

    fn remove_from_access_order(&mut self, coord: ChunkCoord) {
        if let Some(pos) = self.access_order.iter().position(|&c| c == coord) {
            self.access_order.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Arc<ChunkGeometry> {
        Arc::new(ChunkGeometry {
            origin: [0.0, 0.0],
            vertices: vec![0.0; 3],
            colors: vec![0.5; 3],
            normals: vec![0.0, 0.0, 1.0],
            indices: Vec::new(),
            is_empty: false,
        })
    }

    #[test]
    fn test_cache_insert_and_get() {
        let mut cache = ChunkCache::new();
        let coord = ChunkCoord::new(1, 2, 0);
        assert!(cache.insert(coord, geometry()).is_none());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(coord));
        assert!(cache.get(coord).is_some());
        assert!(cache.get(ChunkCoord::new(0, 0, 0)).is_none());
    }

    #[test]
    fn test_cache_replace_returns_old() {
        let mut cache = ChunkCache::new();
        let coord = ChunkCoord::new(0, 0, 0);
        cache.insert(coord, geometry());
        assert!(cache.insert(coord, geometry()).is_some());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.oldest_first().count(), 1);
    }

    #[test]
    fn test_access_order_tracks_use() {
        let mut cache = ChunkCache::new();
        let a = ChunkCoord::new(0, 0, 0);
        let b = ChunkCoord::new(1, 0, 0);
        let c = ChunkCoord::new(2, 0, 0);
        cache.insert(a, geometry());
        cache.insert(b, geometry());
        cache.insert(c, geometry());
        cache.get(a);
        assert_eq!(cache.oldest_first().collect::<Vec<_>>(), vec![b, c, a]);

        // peek leaves the order alone
        cache.peek(b);
        assert_eq!(cache.oldest_first().next(), Some(b));

        cache.remove(c);
        assert_eq!(cache.oldest_first().collect::<Vec<_>>(), vec![b, a]);
    }

    #[test]
    fn test_clear() {
        let mut cache = ChunkCache::new();
        cache.insert(ChunkCoord::new(0, 0, 0), geometry());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.oldest_first().count(), 0);
    }
}
