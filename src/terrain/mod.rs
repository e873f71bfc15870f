//! Equation-driven terrain: the height field and chunk meshing

pub mod equation;
pub mod field;
pub mod generator;
pub mod geometry;
pub mod settings;

pub use equation::{Equation, EquationSpec, compile_equations, parse_hex_color};
pub use field::HeightField;
pub use generator::{ChunkGenerator, triangle_in_band};
pub use geometry::ChunkGeometry;
pub use settings::{PerformanceSettings, TerrainSettings};
