//! One running game: terrain streaming, player physics, camera and renderer
//!
//! [`Session`] owns every subsystem and drives them in a fixed order each
//! frame. The renderer is a type parameter so the same loop runs against a
//! GPU backend or the [`HeadlessRenderer`](crate::render::headless::HeadlessRenderer).

pub mod debug;

pub use debug::SessionDebugHandler;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::camera::Camera;
use crate::core::camera_controller::{ControllerSettings, FirstPersonController};
use crate::core::input::InputState;
use crate::core::time::FrameClock;
use crate::core::types::{Mat4, Vec3};
use crate::core::{Error, Result};
use crate::physics::{PhysicsEngine, PhysicsSettings, RayHit};
use crate::preset::Preset;
use crate::render::TerrainRenderer;
use crate::streaming::TerrainStreamer;
use crate::terrain::equation::{EquationSpec, compile_equations};
use crate::terrain::settings::TerrainSettings;

/// Everything needed to set up a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub terrain: TerrainSettings,
    pub physics: PhysicsSettings,
    pub controller: ControllerSettings,
    /// Seconds between cache cleanups
    pub cleanup_interval: f32,
    /// Minimum eye height above the ground at spawn
    pub spawn_clearance: f32,
    pub fov_degrees: f32,
    pub aspect: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            terrain: TerrainSettings::default(),
            physics: PhysicsSettings::default(),
            controller: ControllerSettings::default(),
            cleanup_interval: 2.0,
            spawn_clearance: 5.0,
            fov_degrees: 45.0,
            aspect: 16.0 / 9.0,
        }
    }
}

pub struct Session<R: TerrainRenderer> {
    settings: SessionSettings,
    renderer: R,
    streamer: TerrainStreamer,
    physics: PhysicsEngine,
    controller: FirstPersonController,
    camera: Camera,
    clock: FrameClock,
    started: bool,
    /// Merge version last handed to the renderer
    uploaded_version: Option<u64>,
    since_cleanup: f32,
}

impl<R: TerrainRenderer> Session<R> {
    pub fn new(settings: SessionSettings, renderer: R) -> Result<Self> {
        let streamer = TerrainStreamer::with_default_worker(settings.terrain.clone())?;
        let camera = Camera::new(Vec3::ZERO, settings.fov_degrees, settings.aspect);
        Ok(Self {
            physics: PhysicsEngine::new(settings.physics.clone()),
            controller: FirstPersonController::new(settings.controller.clone()),
            settings,
            renderer,
            streamer,
            camera,
            clock: FrameClock::new(),
            started: false,
            uploaded_version: None,
            since_cleanup: 0.0,
        })
    }

    /// Install `equations` and spawn the player at `start`
    ///
    /// Equations that fail to compile are skipped; if none remain the
    /// session is left as it was.
    pub fn start_game(&mut self, equations: &[EquationSpec], start: Vec3) -> Result<()> {
        let compiled = compile_equations(equations);
        if compiled.is_empty() {
            return Err(Error::Config(format!(
                "none of the {} equations compiled",
                equations.len()
            )));
        }
        self.streamer.set_equations(compiled);

        let ground = self.streamer.height_at(start.x as f64, start.y as f64) as f32;
        let mut eye = start;
        if ground.is_finite() {
            eye.z = eye.z.max(ground + self.settings.spawn_clearance);
        }

        self.physics.reset();
        self.controller.reset();
        self.controller.place(&mut self.camera, &mut self.physics, eye);
        log::info!(
            "Starting game at ({:.1}, {:.1}, {:.1}), ground height {:.2}",
            eye.x,
            eye.y,
            eye.z,
            ground
        );

        self.streamer.update_chunks(self.camera.position);
        self.upload_if_changed()?;
        self.started = true;
        self.since_cleanup = 0.0;
        Ok(())
    }

    /// Push the preset's environment to the renderer and start its terrain
    pub fn apply_preset(&mut self, preset: &Preset) -> Result<()> {
        if let Some(environment) = &preset.environment {
            self.renderer.set_environment(environment);
        }
        self.start_game(&preset.equations, preset.start())
    }

    /// Run one frame of `dt` seconds
    pub fn frame(&mut self, dt: f32, input: &mut InputState) -> Result<()> {
        let dt = self
            .clock
            .advance(Duration::try_from_secs_f32(dt).unwrap_or_default());

        if self.started {
            self.physics.step(dt, &self.streamer);
            self.controller
                .update(dt, input, &mut self.camera, &mut self.physics);
            self.streamer.update_chunks(self.camera.position);
            self.upload_if_changed()?;
        }

        let view = self.camera.view_matrix(self.controller.shake());
        let projection = self.camera.projection_matrix();
        let model = Mat4::from_translation(self.streamer.camera_offset());
        self.renderer.render(view, projection, model)?;

        if self.started {
            self.since_cleanup += dt;
            if self.since_cleanup >= self.settings.cleanup_interval {
                self.since_cleanup = 0.0;
                self.streamer.cleanup();
            }
        }

        input.end_frame();
        Ok(())
    }

    fn upload_if_changed(&mut self) -> Result<()> {
        let version = self.streamer.merge_version();
        if self.uploaded_version != Some(version) {
            self.renderer.upload_terrain(self.streamer.terrain_data())?;
            self.uploaded_version = Some(version);
        }
        Ok(())
    }

    /// Move the player body to `position`, stopping it
    pub fn teleport(&mut self, position: Vec3) {
        self.physics.set_player_position(position);
        self.camera.position = position + Vec3::new(0.0, 0.0, self.controller.eye_height());
    }

    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        self.physics
            .raycast(origin, direction, max_distance, &self.streamer)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn streamer(&self) -> &TerrainStreamer {
        &self.streamer
    }

    pub fn streamer_mut(&mut self) -> &mut TerrainStreamer {
        &mut self.streamer
    }

    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    pub fn controller(&self) -> &FirstPersonController {
        &self.controller
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }
}
