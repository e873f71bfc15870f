//! Debug command handling for a running session

use std::sync::{Arc, Mutex};

use mathterrain_debug::{
    DebugCommand, DebugHandler, DebugResponse, FpsWindowInfo, ResponseData, StatsInfo,
};

use crate::core::time::FpsWindow;
use crate::core::types::Vec3;
use crate::render::TerrainRenderer;
use crate::session::Session;
use crate::streaming::ChunkCoord;
use crate::terrain::settings::PerformanceSettings;

fn window_info(window: FpsWindow) -> FpsWindowInfo {
    FpsWindowInfo {
        avg: window.avg,
        min: window.min,
        max: window.max,
    }
}

impl<R: TerrainRenderer> Session<R> {
    fn stats_info(&self) -> StatsInfo {
        let stats = self.streamer.stats();
        StatsInfo {
            active_chunks: stats.active_chunks,
            cached_chunks: stats.cached_chunks,
            empty_chunks: stats.empty_chunks,
            generating_chunks: stats.generating_chunks,
            pending_updates: stats.pending_updates,
            chunk_update_threshold: stats.chunk_update_threshold,
            chunks_per_frame: stats.chunks_per_frame,
            view_distance: stats.view_distance,
            generate_distance: stats.generate_distance,
            vertical_chunks: stats.vertical_chunks,
            merged_vertices: stats.merged_vertices,
            merged_triangles: stats.merged_triangles,
            merge_version: stats.merge_version,
            camera_offset: self.streamer.camera_offset().to_array(),
        }
    }

    /// Answer one debug command; state changes apply before the next frame
    pub fn handle_debug_command(&mut self, cmd: DebugCommand) -> DebugResponse {
        match cmd {
            DebugCommand::Ping => DebugResponse::pong(),

            DebugCommand::GetStats => DebugResponse::ok(ResponseData::Stats(self.stats_info())),

            DebugCommand::GetPlayerState => {
                let snapshot = self.physics.body().snapshot();
                DebugResponse::ok(ResponseData::PlayerState {
                    position: snapshot.position,
                    velocity: snapshot.velocity,
                    on_ground: snapshot.on_ground,
                    is_sliding: snapshot.is_sliding,
                    ground_height: snapshot.ground_height,
                    ground_normal: snapshot.ground_normal,
                    speed: snapshot.speed,
                    eye: self.camera.position.to_array(),
                    crouching: self.controller.is_crouching(),
                })
            }

            DebugCommand::GetFpsStats => {
                let stats = self.clock.fps_stats();
                DebugResponse::ok(ResponseData::FpsStats {
                    one_sec: window_info(stats.one_sec),
                    five_sec: window_info(stats.five_sec),
                    fifteen_sec: window_info(stats.fifteen_sec),
                    current_fps: stats.current_fps,
                    frame_count: stats.frame_count,
                })
            }

            DebugCommand::SampleTerrain { x, y } => {
                let height = self.streamer.height_at(x, y);
                DebugResponse::ok(ResponseData::TerrainSample {
                    x,
                    y,
                    height,
                    interpolated_height: self.streamer.interpolated_height(x, y),
                    normal: self.streamer.normal_at(x, y),
                    color: self.streamer.field().color_at(x, y, height),
                })
            }

            DebugCommand::SetPerformance {
                view_distance,
                generate_distance,
                chunk_update_threshold,
                chunks_per_frame,
            } => {
                let overrides = PerformanceSettings {
                    view_distance,
                    generate_distance,
                    chunk_update_threshold,
                    chunks_per_frame,
                };
                match self.streamer.adjust_performance_settings(&overrides) {
                    Ok(()) => DebugResponse::ok(ResponseData::Stats(self.stats_info())),
                    Err(e) => DebugResponse::error(e.to_string()),
                }
            }

            DebugCommand::TeleportPlayer { x, y, z } => {
                let position = Vec3::new(x, y, z);
                if !position.is_finite() {
                    return DebugResponse::error("teleport target must be finite");
                }
                self.teleport(position);
                DebugResponse::none()
            }

            DebugCommand::ForceTerrainUpdate => {
                self.streamer.force_terrain_update();
                DebugResponse::none()
            }

            DebugCommand::GetChunkInfo { x, y, z } => {
                let info = self.streamer.chunk_info(ChunkCoord::new(x, y, z));
                DebugResponse::ok(ResponseData::ChunkInfo {
                    x,
                    y,
                    z,
                    state: info.state.as_str().to_string(),
                    active: info.active,
                    vertex_count: info.vertex_count,
                    triangle_count: info.triangle_count,
                    height_range: info.height_range.map(|(lo, hi)| [lo, hi]),
                })
            }

            DebugCommand::Raycast {
                origin,
                direction,
                max_distance,
            } => {
                let hit = self.raycast(
                    Vec3::from_array(origin),
                    Vec3::from_array(direction),
                    max_distance,
                );
                DebugResponse::ok(ResponseData::RaycastHit {
                    hit: hit.is_some(),
                    point: hit.as_ref().map(|h| h.point),
                    distance: hit.as_ref().map(|h| h.distance),
                    normal: hit.as_ref().map(|h| h.normal),
                })
            }
        }
    }
}

/// [`DebugHandler`] over a session shared with the frame loop
///
/// The frame loop locks the session once per frame, so commands land
/// between frames.
pub struct SessionDebugHandler<R: TerrainRenderer> {
    session: Arc<Mutex<Session<R>>>,
}

impl<R: TerrainRenderer> SessionDebugHandler<R> {
    pub fn new(session: Arc<Mutex<Session<R>>>) -> Self {
        Self { session }
    }
}

impl<R: TerrainRenderer + Send + 'static> DebugHandler for SessionDebugHandler<R> {
    fn handle_command(&mut self, cmd: DebugCommand) -> DebugResponse {
        match self.session.lock() {
            Ok(mut session) => session.handle_debug_command(cmd),
            Err(_) => DebugResponse::error("session lock poisoned"),
        }
    }
}
