//! Uniform block for the terrain shader

use bytemuck::{Pod, Zeroable};

use crate::core::types::{Mat4, Vec3};
use crate::render::Environment;

/// Per-frame shader constants
///
/// Every vec3 is followed by a scalar so the layout needs no padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainUniform {
    /// Projection * view (64 bytes, offset 0)
    pub view_proj: [[f32; 4]; 4],
    /// Camera offset translation (64 bytes, offset 64)
    pub model: [[f32; 4]; 4],
    pub camera_offset: [f32; 3],
    pub time: f32,
    pub sun_color: [f32; 3],
    pub sun_intensity: f32,
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    pub sky_color_top: [f32; 3],
    pub fog_start: f32,
    pub sky_color_horizon: [f32; 3],
    pub gamma: f32,
}

impl TerrainUniform {
    pub fn new(view: Mat4, projection: Mat4, model: Mat4, env: &Environment, time: f32) -> Self {
        Self {
            view_proj: (projection * view).to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            camera_offset: model.w_axis.truncate().to_array(),
            time,
            sun_color: env.sun_color,
            sun_intensity: env.sun_intensity,
            ambient_color: env.ambient_color,
            ambient_intensity: env.ambient_intensity,
            fog_color: env.fog_color,
            fog_density: env.fog_density,
            sky_color_top: env.sky_color_top,
            fog_start: env.fog_start,
            sky_color_horizon: env.sky_color_horizon,
            gamma: env.gamma,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn camera_offset(&self) -> Vec3 {
        Vec3::from_array(self.camera_offset)
    }
}
