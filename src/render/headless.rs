//! Renderer that keeps the uploaded buffers in memory and draws nothing

use crate::core::types::Mat4;
use crate::core::{Error, Result};
use crate::preset::EnvironmentSettings;
use crate::render::uniform::TerrainUniform;
use crate::render::{Environment, TerrainRenderer};
use crate::streaming::TerrainData;

/// Time advanced per rendered frame at `time_speed` 1
const TIME_STEP: f32 = 0.003;

/// CPU-side stand-in for a GPU renderer
///
/// Holds the byte images of the last upload along with the last frame's
/// uniform block, which is enough to check what a real backend would see.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    environment: Environment,
    vertex_bytes: Vec<u8>,
    color_bytes: Vec<u8>,
    normal_bytes: Vec<u8>,
    index_bytes: Vec<u8>,
    index_count: usize,
    uploads: u64,
    frames: u64,
    time: f32,
    last_uniform: Option<TerrainUniform>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Number of `upload_terrain` calls so far
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Number of frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Bytes held for the current terrain buffers
    pub fn buffer_bytes(&self) -> usize {
        self.vertex_bytes.len() + self.color_bytes.len() + self.normal_bytes.len() + self.index_bytes.len()
    }

    pub fn last_uniform(&self) -> Option<&TerrainUniform> {
        self.last_uniform.as_ref()
    }
}

impl TerrainRenderer for HeadlessRenderer {
    fn upload_terrain(&mut self, data: &TerrainData) -> Result<()> {
        if data.colors.len() != data.vertices.len() || data.normals.len() != data.vertices.len() {
            return Err(Error::Renderer(format!(
                "attribute length mismatch: {} positions, {} colors, {} normals",
                data.vertices.len(),
                data.colors.len(),
                data.normals.len()
            )));
        }
        let vertex_count = data.vertex_count() as u32;
        if let Some(&bad) = data.indices.iter().find(|&&i| i >= vertex_count) {
            return Err(Error::Renderer(format!(
                "index {bad} out of range for {vertex_count} vertices"
            )));
        }

        self.vertex_bytes = data.vertex_bytes().to_vec();
        self.color_bytes = data.color_bytes().to_vec();
        self.normal_bytes = data.normal_bytes().to_vec();
        self.index_bytes = data.index_bytes().to_vec();
        self.index_count = data.indices.len();
        self.uploads += 1;
        log::trace!("Uploaded {} terrain bytes", self.buffer_bytes());
        Ok(())
    }

    fn render(&mut self, view: Mat4, projection: Mat4, model: Mat4) -> Result<()> {
        if !self.environment.time_pause {
            self.time += TIME_STEP * self.environment.time_speed;
        }
        self.frames += 1;
        // Nothing to draw, but the sky would still be rendered
        self.last_uniform = Some(TerrainUniform::new(view, projection, model, &self.environment, self.time));
        Ok(())
    }

    fn set_environment(&mut self, settings: &EnvironmentSettings) {
        self.environment.apply(settings);
    }
}
