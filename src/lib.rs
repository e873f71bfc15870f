//! Mathterrain - chunked procedural terrain from height expressions
//!
//! Users supply height equations `f(x, y)`; the terrain is cut into chunks
//! that are built off the frame loop, streamed around the camera, merged
//! into one render buffer and walked on with first-person physics.

pub mod core;
pub mod expr;
pub mod physics;
pub mod preset;
pub mod render;
pub mod session;
pub mod streaming;
pub mod terrain;
