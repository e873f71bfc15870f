//! Player physics against the procedural height field
//!
//! The engine integrates a single player body under gravity and resolves
//! collisions against whatever implements [`TerrainQuery`].

pub mod body;
pub mod engine;

pub use body::{PlayerBody, PlayerSnapshot};
pub use engine::{PhysicsEngine, PhysicsSettings, RayHit};

use crate::core::types::Vec3;

/// Terrain queries the physics step needs
pub trait TerrainQuery {
    /// Ground height used for collision at (x, y)
    fn interpolated_height(&self, x: f32, y: f32) -> f32;

    /// Unit surface normal at (x, y)
    fn normal_at(&self, x: f32, y: f32) -> Vec3;
}
