//! Chunk streaming around the camera

pub mod cache;
pub mod coord;
pub mod merge;
pub mod priority;
pub mod store;
pub mod streamer;
pub mod worker;

pub use cache::ChunkCache;
pub use coord::ChunkCoord;
pub use merge::{MergedTerrain, TerrainData, anchor_for};
pub use priority::{ChunkCandidate, scan_candidates};
pub use store::{ApplyOutcome, ChunkState, ChunkStore};
pub use streamer::{ChunkInfo, StreamingStats, TerrainStreamer};
pub use worker::{BuildOutcome, BuildRequest, BuildResult, ChunkWorker, InlineWorker, ThreadedWorker};
