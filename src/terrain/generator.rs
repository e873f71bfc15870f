//! Chunk geometry generation
//!
//! Each chunk is an R x R vertex grid laid over its footprint widened by a
//! skirt on every side. Edge vertices are pulled toward the height at the
//! true chunk boundary so neighbors converge on the same seam, and only
//! triangles touching the chunk's vertical band are emitted.

use std::sync::Arc;

use crate::streaming::coord::ChunkCoord;
use crate::terrain::field::HeightField;
use crate::terrain::geometry::ChunkGeometry;
use crate::terrain::settings::TerrainSettings;

/// Whether a triangle with these vertex heights touches `[min, max]`
///
/// Both ends of the band are inclusive.
pub fn triangle_in_band(heights: [f64; 3], min: f64, max: f64) -> bool {
    let lo = heights[0].min(heights[1]).min(heights[2]);
    let hi = heights[0].max(heights[1]).max(heights[2]);
    hi >= min && lo <= max
}

/// Builds [`ChunkGeometry`] from a height field
///
/// Cheap to clone; the field is shared.
#[derive(Debug, Clone)]
pub struct ChunkGenerator {
    field: Arc<HeightField>,
    settings: TerrainSettings,
}

impl ChunkGenerator {
    /// Create a generator; only the layout part of `settings` is used
    pub fn new(field: Arc<HeightField>, settings: &TerrainSettings) -> Self {
        Self {
            field,
            settings: settings.clone(),
        }
    }

    pub fn field(&self) -> &Arc<HeightField> {
        &self.field
    }

    /// Coarse test for terrain near the chunk's band
    ///
    /// Samples a (d+1) x (d+1) grid over the footprint. A non-finite sample
    /// counts as content so it gets looked at by the full build.
    pub fn has_content(&self, coord: ChunkCoord) -> bool {
        let size = self.settings.chunk_size;
        let d = self.settings.content_samples;
        let step = size / d as f64;
        let (start_x, start_y) = coord.world_origin(size);
        let (min_h, max_h) = coord.height_band(self.settings.chunk_height);
        let slack = self.settings.content_slack;

        for j in 0..=d {
            for i in 0..=d {
                let h = self.field.height_at(start_x + i as f64 * step, start_y + j as f64 * step);
                if !h.is_finite() || (h >= min_h - slack && h <= max_h + slack) {
                    return true;
                }
            }
        }
        false
    }

    /// Build the geometry for a chunk
    ///
    /// Never fails: a chunk without content yields [`ChunkGeometry::empty`],
    /// and a chunk whose terrain misses the band yields zero triangles.
    pub fn build(&self, coord: ChunkCoord) -> ChunkGeometry {
        if !self.has_content(coord) {
            return ChunkGeometry::empty();
        }

        let size = self.settings.chunk_size;
        let res = self.settings.chunk_resolution;
        let (start_x, start_y) = coord.world_origin(size);
        let (min_h, max_h) = coord.height_band(self.settings.chunk_height);

        let skirt = size * self.settings.skirt_fraction;
        let step = (size + 2.0 * skirt) / (res - 1) as f64;
        let origin_x = start_x - skirt;
        let origin_y = start_y - skirt;

        let count = res * res;
        let mut vertices = Vec::with_capacity(count * 3);
        let mut colors = Vec::with_capacity(count * 3);
        let mut normals = Vec::with_capacity(count * 3);
        let mut heights = Vec::with_capacity(count);

        for j in 0..res {
            for i in 0..res {
                let wx = origin_x + i as f64 * step;
                let wy = origin_y + j as f64 * step;

                let mut h = self.stitched_height(coord, i, j, wx, wy);
                if !h.is_finite() {
                    h = if h > 0.0 { max_h } else { min_h };
                }
                heights.push(h);

                vertices.extend_from_slice(&[
                    (wx - start_x) as f32,
                    (wy - start_y) as f32,
                    h as f32,
                ]);
                colors.extend_from_slice(&self.field.color_at(wx, wy, h));
                let n = self.field.gradient_normal(wx, wy, step * 0.5);
                normals.extend_from_slice(&[n[0] as f32, n[1] as f32, n[2] as f32]);
            }
        }

        let indices = triangulate(&heights, res, min_h, max_h);

        ChunkGeometry {
            origin: [start_x, start_y],
            vertices,
            colors,
            normals,
            indices,
            is_empty: false,
        }
    }

    /// Height for grid vertex (i, j), blended toward the true boundary on edges
    fn stitched_height(&self, coord: ChunkCoord, i: usize, j: usize, wx: f64, wy: f64) -> f64 {
        let raw = self.field.height_at(wx, wy);
        let last = self.settings.chunk_resolution - 1;
        let on_edge = i == 0 || i == last || j == 0 || j == last;
        if !on_edge {
            return raw;
        }

        let size = self.settings.chunk_size;
        let snap = |index: usize, cell: i32, world: f64| {
            if index == 0 {
                cell as f64 * size
            } else if index == last {
                (cell + 1) as f64 * size
            } else {
                world
            }
        };
        let snapped = self.field.height_at(snap(i, coord.x, wx), snap(j, coord.y, wy));

        let blend = self.settings.stitch_blend;
        raw * (1.0 - blend) + snapped * blend
    }
}

/// Two triangles per grid cell, skipping those outside the band
fn triangulate(heights: &[f64], res: usize, min_h: f64, max_h: f64) -> Vec<u32> {
    let mut indices = Vec::new();
    for j in 0..res - 1 {
        for i in 0..res - 1 {
            let a = j * res + i;
            let b = a + 1;
            let c = a + res;
            let d = c + 1;

            if triangle_in_band([heights[a], heights[b], heights[c]], min_h, max_h) {
                indices.extend_from_slice(&[a as u32, b as u32, c as u32]);
            }
            if triangle_in_band([heights[b], heights[d], heights[c]], min_h, max_h) {
                indices.extend_from_slice(&[b as u32, d as u32, c as u32]);
            }
        }
    }
    indices
}
