//! Chunk grid coordinates

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Integer cell in the chunk grid
///
/// Horizontal cells are `chunk_size` wide, vertical cells `chunk_height`
/// tall. The coordinate itself is the cache key. Ordering is lexicographic
/// (x, y, z) and only used to make iteration reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    /// Create a new chunk coordinate
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing a world position
    pub fn from_world(x: f64, y: f64, z: f64, chunk_size: f64, chunk_height: f64) -> Self {
        Self {
            x: (x / chunk_size).floor() as i32,
            y: (y / chunk_size).floor() as i32,
            z: (z / chunk_height).floor() as i32,
        }
    }

    /// Chunk containing a camera position
    pub fn from_world_pos(pos: Vec3, chunk_size: f64, chunk_height: f64) -> Self {
        Self::from_world(pos.x as f64, pos.y as f64, pos.z as f64, chunk_size, chunk_height)
    }

    /// Coordinate shifted by a grid offset
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Euclidean distance in chunk units
    pub fn distance(self, other: ChunkCoord) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        let dz = (self.z - other.z) as f64;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// World-space minimum corner of the chunk's footprint
    pub fn world_origin(self, chunk_size: f64) -> (f64, f64) {
        (self.x as f64 * chunk_size, self.y as f64 * chunk_size)
    }

    /// Vertical band `[min, max]` covered by the chunk
    pub fn height_band(self, chunk_height: f64) -> (f64, f64) {
        (self.z as f64 * chunk_height, (self.z + 1) as f64 * chunk_height)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}
