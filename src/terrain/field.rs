//! Height and color field defined by a set of equations
//!
//! The field height is the mean of all equation values; the color comes
//! from whichever equation is largest at a point.

use crate::core::types::{Rgb, Vec3};
use crate::physics::TerrainQuery;
use crate::terrain::equation::{Equation, FALLBACK_COLOR};

/// Sampling offset for [`HeightField::normal_at`]
pub const NORMAL_EPSILON: f64 = 0.1;

/// Scalar height field over (x, y)
#[derive(Debug, Clone)]
pub struct HeightField {
    equations: Vec<Equation>,
    /// Spacing of the lattice used by `interpolated_height`
    lattice_scale: f64,
}

impl Default for HeightField {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl HeightField {
    pub fn new(equations: Vec<Equation>) -> Self {
        Self {
            equations,
            lattice_scale: 1.0,
        }
    }

    /// Set the lattice spacing used for collision sampling
    pub fn with_lattice_scale(mut self, scale: f64) -> Self {
        self.lattice_scale = scale;
        self
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    /// Field height at (x, y)
    ///
    /// With no equations this is the fallback wave
    /// `sin(x*0.1) * cos(y*0.1) * 2`. Otherwise it is the mean over all
    /// equations at z = 0, where a non-finite value counts as 0 but still
    /// counts toward the denominator.
    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        if self.equations.is_empty() {
            return (x * 0.1).sin() * (y * 0.1).cos() * 2.0;
        }

        let sum: f64 = self
            .equations
            .iter()
            .map(|eq| eq.evaluate(x, y, 0.0))
            .filter(|v| v.is_finite())
            .sum();
        sum / self.equations.len() as f64
    }

    /// Color of the dominant equation at (x, y)
    ///
    /// `_height` is accepted for interface symmetry; the choice depends
    /// only on raw per-equation values. Ties keep the earlier equation.
    pub fn color_at(&self, x: f64, y: f64, _height: f64) -> Rgb {
        let mut best = f64::NEG_INFINITY;
        let mut color = FALLBACK_COLOR;
        for eq in &self.equations {
            let value = eq.evaluate(x, y, 0.0);
            if value > best {
                best = value;
                color = eq.color();
            }
        }
        color
    }

    /// Central-difference surface normal with a caller-chosen offset
    ///
    /// Unlike [`HeightField::normal_at`] this also differentiates the
    /// fallback wave, so empty terrain still gets shaded geometry.
    pub fn gradient_normal(&self, x: f64, y: f64, eps: f64) -> [f64; 3] {
        let dx = (self.height_at(x + eps, y) - self.height_at(x - eps, y)) / (2.0 * eps);
        let dy = (self.height_at(x, y + eps) - self.height_at(x, y - eps)) / (2.0 * eps);
        let len = (dx * dx + dy * dy + 1.0).sqrt();
        if len.is_finite() && len > 0.0 {
            [-dx / len, -dy / len, 1.0 / len]
        } else {
            [0.0, 0.0, 1.0]
        }
    }

    /// Surface normal at (x, y); straight up when no equations are configured
    pub fn normal_at(&self, x: f64, y: f64) -> [f64; 3] {
        if self.equations.is_empty() {
            return [0.0, 0.0, 1.0];
        }
        self.gradient_normal(x, y, NORMAL_EPSILON)
    }

    /// Bilinear height from the four surrounding lattice points
    ///
    /// Returns 0 when no equations are configured. The lattice is not the
    /// chunk vertex grid, so this can differ slightly from the rendered mesh.
    pub fn interpolated_height(&self, x: f64, y: f64) -> f64 {
        if self.equations.is_empty() {
            return 0.0;
        }

        // Cell indices on a lattice with spacing `s`
        let s = self.lattice_scale;
        let (gx, gy) = (x / s, y / s);
        let x1 = gx.floor();
        let y1 = gy.floor();
        let fx = gx - x1;
        let fy = gy - y1;

        let h11 = self.height_at(x1 * s, y1 * s);
        let h21 = self.height_at((x1 + 1.0) * s, y1 * s);
        let h12 = self.height_at(x1 * s, (y1 + 1.0) * s);
        let h22 = self.height_at((x1 + 1.0) * s, (y1 + 1.0) * s);

        let h1 = h11 * (1.0 - fx) + h21 * fx;
        let h2 = h12 * (1.0 - fx) + h22 * fx;
        h1 * (1.0 - fy) + h2 * fy
    }
}

impl TerrainQuery for HeightField {
    fn interpolated_height(&self, x: f32, y: f32) -> f32 {
        HeightField::interpolated_height(self, x as f64, y as f64) as f32
    }

    fn normal_at(&self, x: f32, y: f32) -> Vec3 {
        let [nx, ny, nz] = HeightField::normal_at(self, x as f64, y as f64);
        Vec3::new(nx as f32, ny as f32, nz as f32)
    }
}
