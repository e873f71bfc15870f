//! Renderer seam
//!
//! The terrain core only needs somewhere to put the merged buffers and a
//! way to draw them. [`TerrainRenderer`] is that seam; a GPU backend lives
//! outside this crate and [`HeadlessRenderer`] stands in for it in the
//! binary and in tests.

pub mod headless;
pub mod uniform;

pub use headless::HeadlessRenderer;
pub use uniform::TerrainUniform;

use crate::core::Result;
use crate::core::types::{Mat4, Rgb};
use crate::preset::EnvironmentSettings;
use crate::streaming::TerrainData;
use crate::terrain::parse_hex_color;

/// Consumer of merged terrain buffers
pub trait TerrainRenderer {
    /// Replace the GPU-side terrain buffers
    fn upload_terrain(&mut self, data: &TerrainData) -> Result<()>;

    /// Draw one frame; `model` carries the camera offset translation
    fn render(&mut self, view: Mat4, projection: Mat4, model: Mat4) -> Result<()>;

    /// Apply environment overrides from a preset
    fn set_environment(&mut self, settings: &EnvironmentSettings);
}

/// Resolved lighting and atmosphere parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    pub sky_color_top: Rgb,
    pub sky_color_horizon: Rgb,
    pub sun_color: Rgb,
    pub sun_intensity: f32,
    pub ambient_color: Rgb,
    pub ambient_intensity: f32,
    pub fog_color: Rgb,
    pub fog_density: f32,
    pub fog_start: f32,
    pub gamma: f32,
    pub time_speed: f32,
    pub time_pause: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            sky_color_top: [0.29, 0.56, 0.88],
            sky_color_horizon: [0.53, 0.81, 0.92],
            sun_color: [1.0, 0.97, 0.86],
            sun_intensity: 1.0,
            ambient_color: [0.25, 0.25, 0.5],
            ambient_intensity: 0.3,
            fog_color: [0.69, 0.77, 0.87],
            fog_density: 0.003,
            fog_start: 10.0,
            gamma: 2.2,
            time_speed: 1.0,
            time_pause: false,
        }
    }
}

impl Environment {
    /// Overlay the fields present in `settings`
    ///
    /// A color that fails to parse is logged and leaves the old value.
    pub fn apply(&mut self, settings: &EnvironmentSettings) {
        fn color(target: &mut Rgb, value: &Option<String>, field: &str) {
            if let Some(hex) = value {
                match parse_hex_color(hex) {
                    Some(rgb) => *target = rgb,
                    None => log::warn!("Ignoring invalid {} color '{}'", field, hex),
                }
            }
        }
        fn scalar<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *target = v;
            }
        }

        color(&mut self.sky_color_top, &settings.sky_color_top, "skyColorTop");
        color(&mut self.sky_color_horizon, &settings.sky_color_horizon, "skyColorHorizon");
        color(&mut self.sun_color, &settings.sun_color, "sunColor");
        color(&mut self.ambient_color, &settings.ambient_color, "ambientColor");
        color(&mut self.fog_color, &settings.fog_color, "fogColor");
        scalar(&mut self.sun_intensity, settings.sun_intensity);
        scalar(&mut self.ambient_intensity, settings.ambient_intensity);
        scalar(&mut self.fog_density, settings.fog_density);
        scalar(&mut self.fog_start, settings.fog_start);
        scalar(&mut self.gamma, settings.gamma);
        scalar(&mut self.time_speed, settings.time_speed);
        scalar(&mut self.time_pause, settings.time_pause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_overlay() {
        let mut env = Environment::default();
        env.apply(&EnvironmentSettings {
            fog_color: Some("#ff0000".into()),
            sky_color_top: Some("garbage".into()),
            fog_density: Some(0.02),
            time_pause: Some(true),
            ..Default::default()
        });
        assert_eq!(env.fog_color, [1.0, 0.0, 0.0]);
        assert_eq!(env.sky_color_top, Environment::default().sky_color_top);
        assert_eq!(env.fog_density, 0.02);
        assert!(env.time_pause);
        assert_eq!(env.gamma, 2.2);
    }
}
