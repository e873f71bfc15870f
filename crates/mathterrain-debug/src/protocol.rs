//! Debug protocol - JSON command/response definitions
//!
//! One command per line, one response per line:
//!
//! ```text
//! -> {"cmd":"SampleTerrain","params":{"x":10.0,"y":-4.0}}
//! <- {"status":"ok","data":{"x":10.0,"y":-4.0,"height":1.2,...}}
//! ```

use serde::{Deserialize, Serialize};

/// Commands accepted by the debug server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum DebugCommand {
    Ping,
    /// Streaming counters and settings
    GetStats,
    GetPlayerState,
    /// FPS statistics (1s/5s/15s averages with min/max)
    GetFpsStats,
    /// Height, normal and color of the field at (x, y)
    SampleTerrain { x: f64, y: f64 },
    /// Runtime streaming tuning (only specified fields are updated)
    SetPerformance {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        view_distance: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        generate_distance: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chunk_update_threshold: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chunks_per_frame: Option<usize>,
    },
    /// Move the player body and stop it
    TeleportPlayer { x: f32, y: f32, z: f32 },
    ForceTerrainUpdate,
    /// Lifecycle state and mesh size of one chunk
    GetChunkInfo { x: i32, y: i32, z: i32 },
    /// March a ray against the terrain
    Raycast {
        origin: [f32; 3],
        direction: [f32; 3],
        max_distance: f32,
    },
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum DebugResponse {
    #[serde(rename = "ok")]
    Ok { data: ResponseData },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Response payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Pong {
        message: String,
    },
    Stats(StatsInfo),
    PlayerState {
        position: [f32; 3],
        velocity: [f32; 3],
        on_ground: bool,
        is_sliding: bool,
        ground_height: f32,
        ground_normal: [f32; 3],
        speed: f32,
        eye: [f32; 3],
        crouching: bool,
    },
    FpsStats {
        one_sec: FpsWindowInfo,
        five_sec: FpsWindowInfo,
        fifteen_sec: FpsWindowInfo,
        current_fps: f32,
        frame_count: u64,
    },
    TerrainSample {
        x: f64,
        y: f64,
        height: f64,
        interpolated_height: f64,
        normal: [f64; 3],
        color: [f32; 3],
    },
    ChunkInfo {
        x: i32,
        y: i32,
        z: i32,
        state: String,
        active: bool,
        vertex_count: usize,
        triangle_count: usize,
        height_range: Option<[f32; 2]>,
    },
    RaycastHit {
        hit: bool,
        point: Option<[f32; 3]>,
        distance: Option<f32>,
        normal: Option<[f32; 3]>,
    },
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsInfo {
    pub active_chunks: usize,
    pub cached_chunks: usize,
    pub empty_chunks: usize,
    pub generating_chunks: usize,
    pub pending_updates: usize,
    pub chunk_update_threshold: f64,
    pub chunks_per_frame: usize,
    pub view_distance: i32,
    pub generate_distance: i32,
    pub vertical_chunks: i32,
    pub merged_vertices: usize,
    pub merged_triangles: usize,
    pub merge_version: u64,
    pub camera_offset: [f32; 3],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FpsWindowInfo {
    pub avg: f32,
    pub min: f32,
    pub max: f32,
}

impl DebugResponse {
    pub fn ok(data: ResponseData) -> Self {
        Self::Ok { data }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error {
            message: msg.into(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(ResponseData::Pong {
            message: "pong".into(),
        })
    }

    pub fn none() -> Self {
        Self::ok(ResponseData::None)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd: DebugCommand =
            serde_json::from_str(r#"{"cmd":"SampleTerrain","params":{"x":1.5,"y":-2.0}}"#).unwrap();
        assert_eq!(cmd, DebugCommand::SampleTerrain { x: 1.5, y: -2.0 });

        let cmd: DebugCommand = serde_json::from_str(r#"{"cmd":"Ping"}"#).unwrap();
        assert_eq!(cmd, DebugCommand::Ping);

        let cmd: DebugCommand =
            serde_json::from_str(r#"{"cmd":"SetPerformance","params":{"view_distance":3}}"#).unwrap();
        assert_eq!(
            cmd,
            DebugCommand::SetPerformance {
                view_distance: Some(3),
                generate_distance: None,
                chunk_update_threshold: None,
                chunks_per_frame: None,
            }
        );
    }

    #[test]
    fn test_response_wire_format() {
        let json = serde_json::to_value(DebugResponse::pong()).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"]["message"], "pong");

        let json = serde_json::to_value(DebugResponse::error("nope")).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "nope");

        let json = serde_json::to_value(DebugResponse::none()).unwrap();
        assert!(json["data"].is_null());
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(serde_json::from_str::<DebugCommand>(r#"{"cmd":"Explode"}"#).is_err());
    }
}
