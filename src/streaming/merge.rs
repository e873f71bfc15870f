//! Merged render buffer for the active chunks
//!
//! All active chunks are concatenated into one set of flat arrays. Vertex
//! positions are stored relative to a coarse anchor near the camera so
//! they keep their precision far from the world origin; the renderer adds
//! the anchor back through its model transform.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::types::Vec3;
use crate::streaming::coord::ChunkCoord;
use crate::streaming::store::ChunkStore;

/// Flat buffers handed to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TerrainData {
    pub vertices: Vec<f32>,
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
    /// World translation to apply in the model transform
    pub camera_offset: Vec3,
}

impl TerrainData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Anchor for a camera position: x and y floored to the grid, z = 0
pub fn anchor_for(camera: Vec3, grid: f64) -> Vec3 {
    let snap = |v: f32| ((v as f64 / grid).floor() * grid) as f32;
    Vec3::new(snap(camera.x), snap(camera.y), 0.0)
}

/// The merged buffer plus the key set it was built from
#[derive(Debug, Default)]
pub struct MergedTerrain {
    data: TerrainData,
    keys: BTreeSet<ChunkCoord>,
    version: u64,
}

impl MergedTerrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &TerrainData {
        &self.data
    }

    /// Bumped on every rebuild; unchanged version means unchanged buffers
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Chunks the current buffer was built from
    pub fn keys(&self) -> &BTreeSet<ChunkCoord> {
        &self.keys
    }

    /// Whether the store's active set differs from the merged one
    pub fn is_stale(&self, store: &ChunkStore) -> bool {
        &self.keys != store.active()
    }

    /// Rebuild from the store's active chunks
    ///
    /// A no-op returning false when the active set matches the last merge.
    pub fn merge(&mut self, store: &ChunkStore, anchor: Vec3) -> bool {
        if !self.is_stale(store) {
            return false;
        }

        let mut data = TerrainData {
            camera_offset: anchor,
            ..Default::default()
        };
        let mut keys = BTreeSet::new();

        for &coord in store.active() {
            let Some(geometry) = store.peek(coord) else {
                continue;
            };
            let base = (data.vertices.len() / 3) as u32;
            // Chunk-to-anchor offset in f64; only the small result drops to f32
            let dx = geometry.origin[0] - anchor.x as f64;
            let dy = geometry.origin[1] - anchor.y as f64;
            data.vertices.extend(geometry.vertices.chunks_exact(3).flat_map(|v| {
                [
                    (v[0] as f64 + dx) as f32,
                    (v[1] as f64 + dy) as f32,
                    v[2] - anchor.z,
                ]
            }));
            data.colors.extend_from_slice(&geometry.colors);
            data.normals.extend_from_slice(&geometry.normals);
            data.indices.extend(geometry.indices.iter().map(|i| i + base));
            keys.insert(coord);
        }

        log::debug!(
            "Merged {} chunks: {} vertices, {} triangles, anchor ({}, {})",
            keys.len(),
            data.vertex_count(),
            data.triangle_count(),
            anchor.x,
            anchor.y
        );

        self.data = data;
        self.keys = keys;
        self.version += 1;
        true
    }

    /// Drop the buffer, bumping the version so consumers re-upload
    pub fn reset(&mut self) {
        self.data = TerrainData::default();
        self.keys.clear();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::geometry::ChunkGeometry;
    use crate::terrain::{ChunkGenerator, Equation, HeightField, TerrainSettings};
    use std::sync::Arc;

    fn quad_at(x: f64, y: f64) -> ChunkGeometry {
        ChunkGeometry {
            origin: [x, y],
            vertices: vec![0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0],
            colors: vec![0.2; 12],
            normals: [0.0, 0.0, 1.0].repeat(4),
            indices: vec![0, 1, 2, 1, 3, 2],
            is_empty: false,
        }
    }

    #[test]
    fn test_anchor_floors_to_grid() {
        assert_eq!(anchor_for(Vec3::new(250.0, -30.0, 77.0), 100.0), Vec3::new(200.0, -100.0, 0.0));
        assert_eq!(anchor_for(Vec3::new(99.9, 0.0, 0.0), 100.0), Vec3::ZERO);
    }

    #[test]
    fn test_merge_reindexes_and_offsets() {
        let mut store = ChunkStore::new();
        let a = ChunkCoord::new(0, 0, 0);
        let b = ChunkCoord::new(1, 0, 0);
        store.insert_built(a, quad_at(100.0, 200.0));
        store.insert_built(b, quad_at(125.0, 200.0));
        store.set_active([b, a]);

        let mut merged = MergedTerrain::new();
        assert!(merged.merge(&store, Vec3::new(100.0, 200.0, 0.0)));
        let data = merged.data();

        assert_eq!(data.vertex_count(), 8);
        assert_eq!(data.indices, vec![0, 1, 2, 1, 3, 2, 4, 5, 6, 5, 7, 6]);
        assert_eq!(data.camera_offset, Vec3::new(100.0, 200.0, 0.0));
        // Chunk a comes first; its first vertex sits on the anchor
        assert_eq!(&data.vertices[0..3], &[0.0, 0.0, 1.0]);
        assert_eq!(&data.vertices[12..15], &[25.0, 0.0, 1.0]);
        assert_eq!(data.colors.len(), data.vertices.len());
        assert!(data.indices.iter().all(|&i| (i as usize) < data.vertex_count()));
        assert_eq!(data.vertex_bytes().len(), data.vertices.len() * 4);
    }

    #[test]
    fn test_far_chunks_merge_without_precision_loss() {
        let field = HeightField::new(vec![Equation::from_fn("0", [0.5, 0.5, 0.5], |_, _, _| 0.0)]);
        let generator = ChunkGenerator::new(Arc::new(field), &TerrainSettings::default());
        let coord = ChunkCoord::new(400_000, 0, 0);
        let mut store = ChunkStore::new();
        store.insert_built(coord, generator.build(coord));
        store.set_active([coord]);

        let anchor = anchor_for(Vec3::new(1.0e7, 0.0, 0.0), 100.0);
        let mut merged = MergedTerrain::new();
        assert!(merged.merge(&store, anchor));
        let data = merged.data();

        let res = 60;
        let step = 30.0 / 59.0;
        let row: Vec<f32> = data.vertices.chunks_exact(3).take(res).map(|v| v[0]).collect();
        for (i, &x) in row.iter().enumerate() {
            let expected = 1.0e7 - 2.5 + i as f64 * step - anchor.x as f64;
            assert!((x as f64 - expected).abs() < 1e-3, "vertex {i}: {x} vs {expected}");
        }
        let mut distinct = row.clone();
        distinct.dedup();
        assert_eq!(distinct.len(), res);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut store = ChunkStore::new();
        store.insert_built(ChunkCoord::new(0, 0, 0), quad_at(0.0, 0.0));
        store.set_active([ChunkCoord::new(0, 0, 0)]);

        let mut merged = MergedTerrain::new();
        assert!(merged.merge(&store, Vec3::ZERO));
        let version = merged.version();
        let before = merged.data().clone();

        assert!(!merged.merge(&store, Vec3::new(100.0, 0.0, 0.0)));
        assert_eq!(merged.version(), version);
        assert_eq!(merged.data(), &before);
    }

    #[test]
    fn test_merge_tracks_shrinking_set() {
        let mut store = ChunkStore::new();
        let a = ChunkCoord::new(0, 0, 0);
        store.insert_built(a, quad_at(0.0, 0.0));
        store.set_active([a]);
        let mut merged = MergedTerrain::new();
        merged.merge(&store, Vec3::ZERO);

        store.evict(a);
        assert!(merged.is_stale(&store));
        assert!(merged.merge(&store, Vec3::ZERO));
        assert!(merged.data().vertices.is_empty());
        assert!(merged.keys().is_empty());
    }

    #[test]
    fn test_empty_store_needs_no_merge() {
        let store = ChunkStore::new();
        let mut merged = MergedTerrain::new();
        assert!(!merged.merge(&store, Vec3::ZERO));
        assert_eq!(merged.version(), 0);

        merged.reset();
        assert_eq!(merged.version(), 1);
    }
}
