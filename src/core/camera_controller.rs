//! First-person controller
//!
//! Turns key and mouse input into movement forces on the physics body,
//! handles crouching, and produces the per-frame camera shake (head bob
//! while walking or running, a jolt on hard landings). The camera eye
//! follows the player body at the current eye height.

use serde::{Deserialize, Serialize};

use crate::core::camera::{Camera, CameraShake};
use crate::core::input::{InputState, Key};
use crate::core::types::Vec3;
use crate::physics::PhysicsEngine;

/// Head bob profile for one gait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BobProfile {
    /// Seconds per footstep
    pub step_interval: f32,
    pub intensity: f32,
    /// Vertical bob amplitude
    pub head_bob: f32,
    /// Lateral sway amplitude
    pub side_sway: f32,
    /// Roll amplitude in degrees
    pub roll_degrees: f32,
    /// Extra vertical bounce (running only)
    pub bounce: f32,
    /// Downward jolt at each footstep
    pub step_impact: f32,
}

impl BobProfile {
    pub fn walk() -> Self {
        Self {
            step_interval: 0.6,
            intensity: 1.0,
            head_bob: 0.03,
            side_sway: 0.02,
            roll_degrees: 0.8,
            bounce: 0.0,
            step_impact: 0.012,
        }
    }

    pub fn run() -> Self {
        Self {
            step_interval: 0.45,
            intensity: 1.0,
            head_bob: 0.035,
            side_sway: 0.02,
            roll_degrees: 0.8,
            bounce: 0.05,
            step_impact: 0.02,
        }
    }
}

impl Default for BobProfile {
    fn default() -> Self {
        Self::walk()
    }
}

/// Controller tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Radians of rotation per unit of mouse motion
    pub mouse_sensitivity: f32,
    /// Eye height above the player body when standing
    pub standing_height: f32,
    /// Eye height when crouched
    pub crouch_height: f32,
    /// Rate at which the eye height approaches its target
    pub crouch_speed: f32,
    pub run_multiplier: f32,
    pub crouch_multiplier: f32,
    pub walk_bob: BobProfile,
    pub run_bob: BobProfile,
    /// Horizontal speed at which head bob reaches full strength
    pub bob_full_speed: f32,
    /// Minimum fall speed that produces a landing shake
    pub land_shake_threshold: f32,
    /// Shake intensity per unit of fall speed
    pub land_shake_scale: f32,
    pub land_shake_max: f32,
    /// Landing shake length in seconds
    pub land_shake_duration: f32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 0.003,
            standing_height: 1.7,
            crouch_height: 1.0,
            crouch_speed: 8.0,
            run_multiplier: 2.0,
            crouch_multiplier: 0.6,
            walk_bob: BobProfile::walk(),
            run_bob: BobProfile::run(),
            bob_full_speed: 8.0,
            land_shake_threshold: 3.0,
            land_shake_scale: 0.12,
            land_shake_max: 0.8,
            land_shake_duration: 0.4,
        }
    }
}

/// Footstep cadence for one gait
#[derive(Debug, Clone, Default)]
struct BobState {
    step_time: f32,
    last_step_time: f32,
    step_count: u32,
}

#[derive(Debug, Clone, Default)]
struct LandShake {
    active: bool,
    time: f32,
    impact: f32,
}

/// Deterministic pseudo-random value in [0, 1) for a footstep index
fn step_jitter(step: u32) -> f32 {
    let v = (step as f32 * 12.9898).sin() * 43_758.547;
    v - v.floor()
}

/// First-person controller state
pub struct FirstPersonController {
    pub settings: ControllerSettings,
    crouching: bool,
    current_height: f32,
    walk: BobState,
    run: BobState,
    land: LandShake,
    shake: CameraShake,
    was_on_ground: bool,
    was_jumping: bool,
    /// Vertical velocity seen on the last airborne frame
    air_velocity_z: f32,
}

impl FirstPersonController {
    pub fn new(settings: ControllerSettings) -> Self {
        let current_height = settings.standing_height;
        Self {
            settings,
            crouching: false,
            current_height,
            walk: BobState::default(),
            run: BobState::default(),
            land: LandShake::default(),
            shake: CameraShake::NONE,
            was_on_ground: false,
            was_jumping: false,
            air_velocity_z: 0.0,
        }
    }

    pub fn is_crouching(&self) -> bool {
        self.crouching
    }

    pub fn toggle_crouch(&mut self) {
        self.crouching = !self.crouching;
    }

    /// Eye height above the player body
    pub fn eye_height(&self) -> f32 {
        self.current_height
    }

    /// Shake to apply to the view this frame
    pub fn shake(&self) -> &CameraShake {
        &self.shake
    }

    pub fn is_landing_shake_active(&self) -> bool {
        self.land.active
    }

    /// Clear crouch and shake state for a new game
    pub fn reset(&mut self) {
        *self = Self::new(self.settings.clone());
    }

    /// Place the eye and the player body for a new game
    ///
    /// The body is put `standing_height` below the eye.
    pub fn place(&mut self, camera: &mut Camera, physics: &mut PhysicsEngine, eye: Vec3) {
        camera.position = eye;
        physics.set_player_position(eye - Vec3::new(0.0, 0.0, self.settings.standing_height));
    }

    /// Per-frame update; runs after the physics step
    pub fn update(
        &mut self,
        dt: f32,
        input: &InputState,
        camera: &mut Camera,
        physics: &mut PhysicsEngine,
    ) {
        if input.is_mouse_captured() {
            let (dx, dy) = input.mouse_delta();
            let sensitivity = self.settings.mouse_sensitivity;
            camera.rotate(-dy * sensitivity, -dx * sensitivity);
        }

        if input.is_key_just_pressed(Key::C) {
            self.toggle_crouch();
        }
        if input.is_key_just_pressed(Key::Space) {
            physics.jump(self.crouching);
            // Any jump press arms the landing shake
            self.was_jumping = true;
        }

        let mut move_forward = 0.0;
        let mut move_right = 0.0;
        if input.is_key_pressed(Key::W) {
            move_forward += 1.0;
        }
        if input.is_key_pressed(Key::S) {
            move_forward -= 1.0;
        }
        if input.is_key_pressed(Key::D) {
            move_right += 1.0;
        }
        if input.is_key_pressed(Key::A) {
            move_right -= 1.0;
        }
        if move_forward != 0.0 && move_right != 0.0 {
            move_forward *= std::f32::consts::FRAC_1_SQRT_2;
            move_right *= std::f32::consts::FRAC_1_SQRT_2;
        }

        let running = input.is_shift_pressed() && !self.crouching;
        let mut speed = if running { self.settings.run_multiplier } else { 1.0 };
        if self.crouching {
            speed *= self.settings.crouch_multiplier;
        }

        let wish = camera.flat_forward() * move_forward * speed + camera.right() * move_right * speed;
        physics.process_movement_input(wish.x, wish.y);

        self.update_crouch_height(dt);
        self.update_shake(dt, wish, running, physics);
        self.check_landing(physics);

        camera.position = physics.position() + Vec3::new(0.0, 0.0, self.current_height);
    }

    fn update_crouch_height(&mut self, dt: f32) {
        let target = if self.crouching {
            self.settings.crouch_height
        } else {
            self.settings.standing_height
        };
        let diff = target - self.current_height;
        if diff.abs() > 0.01 {
            self.current_height += diff * self.settings.crouch_speed * dt;
            self.current_height = self
                .current_height
                .clamp(self.settings.crouch_height, self.settings.standing_height);
        }
    }

    fn check_landing(&mut self, physics: &PhysicsEngine) {
        let on_ground = physics.is_on_ground();
        if !on_ground {
            self.air_velocity_z = physics.velocity().z;
        }
        // The landing step already zeroed the body's vertical velocity
        if !self.was_on_ground && on_ground && self.was_jumping {
            let fall_speed = self.air_velocity_z.abs();
            if fall_speed > self.settings.land_shake_threshold {
                self.land = LandShake {
                    active: true,
                    time: 0.0,
                    impact: (fall_speed * self.settings.land_shake_scale)
                        .min(self.settings.land_shake_max),
                };
            }
            self.was_jumping = false;
        }
        self.was_on_ground = on_ground;
    }

    fn update_shake(&mut self, dt: f32, wish: Vec3, running: bool, physics: &PhysicsEngine) {
        self.shake = CameraShake::NONE;

        let moving = wish.x.abs() > 0.1 || wish.y.abs() > 0.1;
        if moving && physics.is_on_ground() {
            let speed_factor = (physics.body().horizontal_speed() / self.settings.bob_full_speed).min(1.0);
            self.apply_head_bob(dt, running, speed_factor);
        }
        if self.land.active {
            self.apply_land_shake(dt);
        }
    }

    fn apply_head_bob(&mut self, dt: f32, running: bool, speed_factor: f32) {
        let (profile, state) = if running {
            (&self.settings.run_bob, &mut self.run)
        } else {
            (&self.settings.walk_bob, &mut self.walk)
        };
        let shake = &mut self.shake;

        state.step_time += dt;
        let phase = (state.step_time / profile.step_interval).fract();
        if phase < 0.1 && state.step_time - state.last_step_time > profile.step_interval * 0.8 {
            state.step_count += 1;
            state.last_step_time = state.step_time;
            shake.offset.z -= profile.step_impact * speed_factor;
            shake.offset.x += (step_jitter(state.step_count) - 0.5) * 0.002 * speed_factor;
        }

        let t = state.step_time;
        let bob_freq = std::f32::consts::TAU / profile.step_interval;
        let sway_freq = bob_freq * 0.5;
        let amount = profile.intensity * speed_factor;

        shake.offset.z += (t * bob_freq).sin() * profile.head_bob * amount;
        shake.offset.x += (t * sway_freq).sin() * profile.side_sway * amount;
        shake.offset.y += (t * bob_freq * 0.3).sin() * profile.head_bob * 0.25 * speed_factor;
        shake.rotation.z += ((t * sway_freq).sin() * profile.roll_degrees * amount).to_radians();
        shake.rotation.x += ((t * bob_freq * 0.7).sin() * 0.2 * speed_factor).to_radians();

        if running {
            shake.offset.z += (t * bob_freq * 1.5).sin() * profile.bounce * amount;
            shake.offset.y += (t * bob_freq * 1.2).sin() * 0.008 * speed_factor;
            shake.rotation.z += ((t * bob_freq * 1.1).sin() * 0.5 * speed_factor).to_radians();
        }
    }

    fn apply_land_shake(&mut self, dt: f32) {
        let land = &mut self.land;
        let shake = &mut self.shake;
        land.time += dt;
        let t = land.time;
        let progress = t / self.settings.land_shake_duration;

        if progress < 0.15 {
            // Impact
            let intensity = land.impact * (1.0 - progress / 0.15);
            shake.offset.z -= intensity * 0.08;
            shake.rotation.x += (t * 35.0).sin() * 0.06 * intensity;
            shake.rotation.z += (t * 30.0).sin() * 0.04 * intensity;
        } else if progress < 0.5 {
            // Vibration
            let intensity = land.impact * (1.0 - (progress - 0.15) / 0.35) * 0.4;
            shake.offset.x += (t * 20.0).sin() * 0.015 * intensity;
            shake.offset.y += (t * 18.0).sin() * 0.01 * intensity;
            shake.offset.z += (t * 25.0).sin() * 0.02 * intensity;
        } else {
            // Recovery
            let intensity = land.impact * (1.0 - (progress - 0.5) / 0.5) * 0.15;
            shake.offset.z += (t * 12.0).sin() * 0.008 * intensity;
            shake.rotation.x += (t * 10.0).sin() * 0.015 * intensity;
        }

        if progress >= 1.0 {
            land.active = false;
        }
    }
}

impl Default for FirstPersonController {
    fn default() -> Self {
        Self::new(ControllerSettings::default())
    }
}
