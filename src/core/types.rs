//! Core type aliases and re-exports

pub use glam::{Mat4, Vec2, Vec3};

/// Standard Result type for the terrain engine
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Linear RGB color with components in [0, 1]
pub type Rgb = [f32; 3];
