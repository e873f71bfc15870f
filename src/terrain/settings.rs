//! Terrain and streaming configuration

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Static terrain layout plus the runtime-tunable streaming knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Horizontal chunk edge length in world units
    pub chunk_size: f64,
    /// Vertices per chunk edge
    pub chunk_resolution: usize,
    /// Height of one vertical chunk band
    pub chunk_height: f64,
    /// Chunk distance within which chunks are shown
    pub view_distance: i32,
    /// Chunk distance within which chunks are generated
    pub generate_distance: i32,
    /// Vertical chunk range above and below the camera
    pub vertical_chunks: i32,
    /// Camera travel that triggers re-deriving the wanted chunk sets
    pub chunk_update_threshold: f64,
    /// Pending active-set updates applied per frame
    pub chunks_per_frame: usize,
    /// Chunk builds dispatched per scheduling pass
    pub max_batch_size: usize,
    /// Cache size enforced by `cleanup`
    pub max_cached_chunks: usize,
    /// Extra chunk distance beyond `generate_distance` kept before eviction
    pub eviction_margin: i32,
    /// Grid the camera offset snaps to
    pub anchor_grid: f64,
    /// Content test grid cells per chunk edge
    pub content_samples: usize,
    /// Vertical slack around the band for the content test
    pub content_slack: f64,
    /// Skirt width as a fraction of `chunk_size`
    pub skirt_fraction: f64,
    /// Weight of the boundary-snapped height for edge vertices
    pub stitch_blend: f64,
    /// Lattice spacing for collision height sampling
    pub lattice_scale: f64,
    /// Chunk build threads; 0 builds inline on the frame loop
    pub worker_threads: usize,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            chunk_size: 25.0,
            chunk_resolution: 60,
            chunk_height: 50.0,
            view_distance: 4,
            generate_distance: 6,
            vertical_chunks: 1,
            chunk_update_threshold: 8.0,
            chunks_per_frame: 3,
            max_batch_size: 15,
            max_cached_chunks: 50,
            eviction_margin: 2,
            anchor_grid: 100.0,
            content_samples: 4,
            content_slack: 50.0,
            skirt_fraction: 0.1,
            stitch_blend: 0.8,
            lattice_scale: 1.0,
            worker_threads: 0,
        }
    }
}

impl TerrainSettings {
    /// Reject settings the streamer cannot work with
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Config(msg));

        if !(self.chunk_size > 0.0) || !self.chunk_size.is_finite() {
            return fail(format!("chunk_size must be positive, got {}", self.chunk_size));
        }
        if !(self.chunk_height > 0.0) || !self.chunk_height.is_finite() {
            return fail(format!("chunk_height must be positive, got {}", self.chunk_height));
        }
        if self.chunk_resolution < 2 {
            return fail(format!(
                "chunk_resolution must be at least 2, got {}",
                self.chunk_resolution
            ));
        }
        if self.view_distance < 0 || self.vertical_chunks < 0 || self.eviction_margin < 0 {
            return fail("distances must not be negative".into());
        }
        if self.generate_distance < self.view_distance {
            return fail(format!(
                "generate_distance ({}) must be at least view_distance ({})",
                self.generate_distance, self.view_distance
            ));
        }
        if self.chunks_per_frame == 0 || self.max_batch_size == 0 {
            return fail("chunks_per_frame and max_batch_size must be positive".into());
        }
        if !(self.chunk_update_threshold >= 0.0) {
            return fail("chunk_update_threshold must not be negative".into());
        }
        if self.content_samples == 0 {
            return fail("content_samples must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.stitch_blend) {
            return fail(format!("stitch_blend must be in [0, 1], got {}", self.stitch_blend));
        }
        if !(self.skirt_fraction >= 0.0) || !(self.anchor_grid > 0.0) || !(self.lattice_scale > 0.0)
        {
            return fail("skirt_fraction, anchor_grid and lattice_scale must be positive".into());
        }
        Ok(())
    }

    /// Distance beyond which cached chunks are evicted
    pub fn eviction_distance(&self) -> f64 {
        (self.generate_distance + self.eviction_margin) as f64
    }

    /// Apply runtime overrides, keeping the old values if the result is invalid
    pub fn apply(&mut self, overrides: &PerformanceSettings) -> Result<()> {
        let mut next = self.clone();
        if let Some(v) = overrides.view_distance {
            next.view_distance = v;
        }
        if let Some(v) = overrides.generate_distance {
            next.generate_distance = v;
        }
        if let Some(v) = overrides.chunk_update_threshold {
            next.chunk_update_threshold = v;
        }
        if let Some(v) = overrides.chunks_per_frame {
            next.chunks_per_frame = v;
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Runtime-tunable subset of [`TerrainSettings`]; absent fields stay unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_distance: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_distance: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_update_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_per_frame: Option<usize>,
}
