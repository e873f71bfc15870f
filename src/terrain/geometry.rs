//! Chunk mesh data

/// Triangulated heightfield patch for one chunk
///
/// Vertices, colors and normals are flat `[x, y, z]` / `[r, g, b]` arrays,
/// row-major over the chunk's vertex grid. Vertex x/y are relative to
/// `origin` so they stay precise far from the world origin; z is absolute.
/// Immutable once built; a rebuilt chunk replaces the old geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkGeometry {
    /// World x/y of the chunk's min corner
    pub origin: [f64; 2],
    pub vertices: Vec<f32>,
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
    /// True when the content test found nothing near this chunk's band
    pub is_empty: bool,
}

impl ChunkGeometry {
    /// Geometry for a chunk with no content
    pub fn empty() -> Self {
        Self {
            is_empty: true,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether there is anything to draw
    pub fn has_triangles(&self) -> bool {
        !self.indices.is_empty()
    }

    /// World position of vertex `i`
    pub fn world_vertex(&self, i: usize) -> [f64; 3] {
        let v = &self.vertices[i * 3..i * 3 + 3];
        [
            self.origin[0] + v[0] as f64,
            self.origin[1] + v[1] as f64,
            v[2] as f64,
        ]
    }

    /// Lowest and highest vertex z, if any vertices exist
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.vertices
            .chunks_exact(3)
            .map(|v| v[2])
            .fold(None, |acc, z| match acc {
                None => Some((z, z)),
                Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
            })
    }

    /// Approximate heap footprint in bytes
    pub fn memory_bytes(&self) -> usize {
        (self.vertices.len() + self.colors.len() + self.normals.len()) * std::mem::size_of::<f32>()
            + self.indices.len() * std::mem::size_of::<u32>()
    }
}
