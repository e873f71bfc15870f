//! Player integration and terrain collision

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;
use crate::physics::TerrainQuery;
use crate::physics::body::PlayerBody;

/// Physics tuning constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Vertical acceleration (negative is down)
    pub gravity: f32,
    /// Horizontal velocity multiplier per step while grounded
    pub ground_friction: f32,
    /// Velocity multiplier per step while airborne (all axes)
    pub air_friction: f32,
    /// Fraction of move speed available in the air
    pub air_control: f32,
    pub mass: f32,
    /// Collision sphere radius
    pub radius: f32,
    /// Vertical velocity set by a jump
    pub jump_force: f32,
    pub move_speed: f32,
    /// Longest step integrated at once, in seconds
    pub max_step: f32,
    /// Distance above the surface that still counts as touching it
    pub ground_tolerance: f32,
    /// Slope angle in degrees above which the player slides
    pub slide_angle: f32,
    /// March distance per raycast sample
    pub raycast_step: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: -20.0,
            ground_friction: 0.9,
            air_friction: 0.99,
            air_control: 0.1,
            mass: 1.0,
            radius: 0.5,
            jump_force: 12.0,
            move_speed: 20.0,
            max_step: 0.033,
            ground_tolerance: 0.1,
            slide_angle: 70.0,
            raycast_step: 0.1,
        }
    }
}

/// Result of a terrain raycast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    pub point: [f32; 3],
    pub distance: f32,
    pub normal: [f32; 3],
}

/// Integrates the player body against a terrain
pub struct PhysicsEngine {
    pub settings: PhysicsSettings,
    body: PlayerBody,
}

impl PhysicsEngine {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            settings,
            body: PlayerBody::default(),
        }
    }

    pub fn body(&self) -> &PlayerBody {
        &self.body
    }

    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.body.velocity
    }

    pub fn is_on_ground(&self) -> bool {
        self.body.on_ground
    }

    pub fn ground_height(&self) -> f32 {
        self.body.ground_height
    }

    /// Teleport the player and stop all motion
    pub fn set_player_position(&mut self, position: Vec3) {
        self.body.position = position;
        self.body.velocity = Vec3::ZERO;
        self.body.acceleration = Vec3::ZERO;
    }

    /// Clear motion and contact state, keeping the position
    pub fn reset(&mut self) {
        self.body.velocity = Vec3::ZERO;
        self.body.acceleration = Vec3::ZERO;
        self.body.on_ground = false;
        self.body.is_sliding = false;
    }

    /// Accumulate a force for the next step
    pub fn apply_force(&mut self, force: Vec3) {
        self.body.acceleration += force / self.settings.mass;
    }

    /// Jump if standing on walkable ground
    ///
    /// Returns whether the jump happened.
    pub fn jump(&mut self, crouching: bool) -> bool {
        if crouching || !self.body.on_ground || self.body.is_sliding {
            return false;
        }
        self.body.velocity.z = self.settings.jump_force;
        self.body.on_ground = false;
        true
    }

    /// Turn a horizontal movement request into a force
    ///
    /// On the ground the request is projected onto the surface plane so the
    /// player follows slopes; in the air only `air_control` of the move
    /// speed is available.
    pub fn process_movement_input(&mut self, move_x: f32, move_y: f32) {
        let wish = Vec3::new(move_x, move_y, 0.0);
        if self.body.on_ground {
            let normal = self.body.ground_normal;
            let projected = wish - normal * wish.dot(normal);
            self.apply_force(projected * self.settings.move_speed);
        } else {
            self.apply_force(wish * self.settings.move_speed * self.settings.air_control);
        }
    }

    /// Advance the simulation by `dt` seconds
    pub fn step(&mut self, dt: f32, terrain: &impl TerrainQuery) {
        let dt = dt.min(self.settings.max_step);
        if !(dt > 0.0) {
            return;
        }

        self.apply_force(Vec3::new(0.0, 0.0, self.settings.gravity * self.settings.mass));

        let mut velocity = self.body.velocity + self.body.acceleration * dt;
        if self.body.on_ground {
            velocity.x *= self.settings.ground_friction;
            velocity.y *= self.settings.ground_friction;
        } else {
            velocity *= self.settings.air_friction;
        }

        // A skipped step keeps position and velocity from the previous tick
        self.resolve_and_move(velocity, dt, terrain);
        self.body.acceleration = Vec3::ZERO;
    }

    /// Move to the predicted position, resolving terrain contact
    ///
    /// Leaves the body untouched when the terrain sample is unusable.
    fn resolve_and_move(&mut self, mut velocity: Vec3, dt: f32, terrain: &impl TerrainQuery) {
        let mut next = self.body.position + velocity * dt;

        let height = terrain.interpolated_height(next.x, next.y);
        let normal = terrain.normal_at(next.x, next.y);
        if !height.is_finite() || !normal.is_finite() {
            log::warn!(
                "Skipping physics step: non-finite terrain at ({:.2}, {:.2})",
                next.x,
                next.y
            );
            return;
        }

        let bottom = next.z - self.settings.radius;
        let penetration = height - bottom;

        if penetration > -self.settings.ground_tolerance {
            next.z = height + self.settings.radius;
            if velocity.z < 0.0 {
                velocity.z = 0.0;
            }
            self.body.on_ground = true;
            self.body.ground_normal = normal;

            let slope_degrees = normal.z.clamp(-1.0, 1.0).acos().to_degrees();
            if slope_degrees > self.settings.slide_angle {
                self.body.is_sliding = true;
                let slide_force = self.settings.gravity * (1.0 - normal.z) * 0.5;
                velocity.x += normal.x * slide_force * dt;
                velocity.y += normal.y * slide_force * dt;
            } else {
                self.body.is_sliding = false;
            }
        } else {
            self.body.on_ground = false;
            self.body.is_sliding = false;
        }

        self.body.position = next;
        self.body.velocity = velocity;
        self.body.ground_height = height;
    }

    /// March along a ray until it drops below the terrain
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        terrain: &impl TerrainQuery,
    ) -> Option<RayHit> {
        let step = self.settings.raycast_step;
        if !(step > 0.0) || !direction.is_finite() {
            return None;
        }

        let steps = (max_distance / step).floor() as u32;
        for i in 0..steps {
            let distance = i as f32 * step;
            let sample = origin + direction * distance;
            let height = terrain.interpolated_height(sample.x, sample.y);
            if sample.z <= height {
                return Some(RayHit {
                    point: [sample.x, sample.y, height],
                    distance,
                    normal: terrain.normal_at(sample.x, sample.y).to_array(),
                });
            }
        }
        None
    }
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}
