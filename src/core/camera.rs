//! First-person camera in a z-up world
//!
//! Orientation is stored as pitch/yaw angles. Yaw rotates around +Z, with
//! yaw 0 looking down +X; pitch tilts toward +Z.

use crate::core::types::{Mat4, Vec3};

/// Largest pitch magnitude, just short of straight up/down
pub const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.1;

/// World up axis
pub const UP: Vec3 = Vec3::Z;

/// Per-frame camera shake produced by the controller
///
/// `offset` is added to the eye position; `rotation` holds pitch, yaw and
/// roll offsets in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraShake {
    pub offset: Vec3,
    pub rotation: Vec3,
}

impl CameraShake {
    pub const NONE: Self = Self {
        offset: Vec3::ZERO,
        rotation: Vec3::ZERO,
    };
}

/// Camera with position, orientation and projection parameters
#[derive(Debug, Clone)]
pub struct Camera {
    /// World position of the eye
    pub position: Vec3,
    /// Rotation toward +Z in radians
    pitch: f32,
    /// Rotation around +Z in radians
    yaw: f32,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

/// Unit view direction for the given angles
fn direction(pitch: f32, yaw: f32) -> Vec3 {
    Vec3::new(pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), pitch.sin())
}

/// Horizontal right vector for the given yaw
fn right_of(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), -yaw.cos(), 0.0)
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position,
            pitch: 0.0,
            yaw: 0.0,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Set orientation; pitch is clamped to [`MAX_PITCH`]
    pub fn set_rotation(&mut self, pitch: f32, yaw: f32) {
        self.pitch = pitch.clamp(-MAX_PITCH, MAX_PITCH);
        self.yaw = yaw;
    }

    /// Apply mouse-look deltas already scaled to radians
    pub fn rotate(&mut self, delta_pitch: f32, delta_yaw: f32) {
        self.set_rotation(self.pitch + delta_pitch, self.yaw + delta_yaw);
    }

    /// Orient the camera toward a world point
    pub fn look_at(&mut self, target: Vec3) {
        let delta = target - self.position;
        let distance = delta.length();
        if distance > 0.0 {
            self.set_rotation((delta.z / distance).asin(), delta.y.atan2(delta.x));
        }
    }

    /// View direction
    pub fn forward(&self) -> Vec3 {
        direction(self.pitch, self.yaw)
    }

    /// View direction flattened onto the ground plane
    pub fn flat_forward(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), self.yaw.sin(), 0.0)
    }

    /// Horizontal right direction
    pub fn right(&self) -> Vec3 {
        right_of(self.yaw)
    }

    /// View matrix (world to camera space) with shake applied
    pub fn view_matrix(&self, shake: &CameraShake) -> Mat4 {
        let pitch = self.pitch + shake.rotation.x;
        let yaw = self.yaw + shake.rotation.y;
        let roll = shake.rotation.z;

        let forward = direction(pitch, yaw);
        let right = right_of(yaw);
        let up = Vec3::new(-roll.sin() * right.x, -roll.sin() * right.y, roll.cos());

        let eye = self.position + shake.offset;
        Mat4::look_at_rh(eye, eye + forward, up)
    }

    /// Projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Update aspect ratio (call on window resize)
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect = width / height;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), 45.0, 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directions() {
        let camera = Camera::default();
        assert!((camera.forward() - Vec3::X).length() < 1e-6);
        assert!((camera.right() - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_pitch_clamped() {
        let mut camera = Camera::default();
        camera.rotate(10.0, 0.0);
        assert!((camera.pitch() - MAX_PITCH).abs() < 1e-6);
        camera.rotate(-20.0, 0.0);
        assert!((camera.pitch() + MAX_PITCH).abs() < 1e-6);
    }

    #[test]
    fn test_look_at() {
        let mut camera = Camera::default();
        camera.position = Vec3::ZERO;
        camera.look_at(Vec3::new(0.0, 10.0, 0.0));
        assert!((camera.yaw() - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        assert!(camera.pitch().abs() < 1e-5);
    }

    #[test]
    fn test_view_matrix_puts_target_ahead() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(10.0, 0.0, 2.0);
        let view = camera.view_matrix(&CameraShake::NONE);
        // A point straight ahead lands on the negative view axis
        let ahead = view.transform_point3(Vec3::new(15.0, 0.0, 2.0));
        assert!(ahead.x.abs() < 1e-4);
        assert!(ahead.y.abs() < 1e-4);
        assert!((ahead.z + 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_shake_offsets_eye() {
        let camera = Camera::default();
        let shake = CameraShake {
            offset: Vec3::new(0.0, 0.0, 0.5),
            rotation: Vec3::ZERO,
        };
        let view = camera.view_matrix(&shake);
        let eye_in_view = view.transform_point3(camera.position + shake.offset);
        assert!(eye_in_view.length() < 1e-4);
    }
}
