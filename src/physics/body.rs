//! Player physical state

use crate::core::types::Vec3;

/// The simulated player: one sphere of `radius` resting on the terrain
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerBody {
    /// Center of the collision sphere
    pub position: Vec3,
    pub velocity: Vec3,
    /// Accumulated acceleration for the current step, cleared after integration
    pub acceleration: Vec3,
    pub on_ground: bool,
    /// Normal of the surface last stood on
    pub ground_normal: Vec3,
    pub is_sliding: bool,
    /// Terrain height under the player at the last step
    pub ground_height: f32,
}

impl PlayerBody {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            on_ground: false,
            ground_normal: Vec3::Z,
            is_sliding: false,
            ground_height: 0.0,
        }
    }

    /// Speed in the ground plane
    pub fn horizontal_speed(&self) -> f32 {
        self.velocity.truncate().length()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            position: self.position.to_array(),
            velocity: self.velocity.to_array(),
            on_ground: self.on_ground,
            is_sliding: self.is_sliding,
            ground_height: self.ground_height,
            ground_normal: self.ground_normal.to_array(),
            speed: self.velocity.length(),
        }
    }
}

impl Default for PlayerBody {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0))
    }
}

/// Serializable view of the player for debug and stats output
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlayerSnapshot {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub on_ground: bool,
    pub is_sliding: bool,
    pub ground_height: f32,
    pub ground_normal: [f32; 3],
    pub speed: f32,
}
