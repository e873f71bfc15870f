//! Terrain equations: a compiled formula plus its display color

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::Rgb;
use crate::expr::{self, Expression};

/// Color given to equations that do not specify one
pub const DEFAULT_EQUATION_COLOR: &str = "#cccccc";

/// Mid gray, used for unparseable colors and for an empty terrain
pub const FALLBACK_COLOR: Rgb = [0.5, 0.5, 0.5];

/// An equation as written in a preset or on the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationSpec {
    pub formula: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_EQUATION_COLOR.to_string()
}

impl EquationSpec {
    pub fn new(formula: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            color: color.into(),
        }
    }
}

/// Parse `#rrggbb` (the `#` is optional, hex digits are case-insensitive)
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok().map(|v| v as f32 / 255.0);
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Immutable compiled equation
#[derive(Clone)]
pub struct Equation {
    formula: String,
    expr: Arc<dyn Expression>,
    color: Rgb,
}

impl Equation {
    pub fn new(formula: impl Into<String>, expr: Arc<dyn Expression>, color: Rgb) -> Self {
        Self {
            formula: formula.into(),
            expr,
            color,
        }
    }

    /// Compile a spec; an unparseable color falls back to gray
    pub fn compile(spec: &EquationSpec) -> Result<Self, expr::ExprError> {
        let compiled = expr::compile(&spec.formula)?;
        let color = parse_hex_color(&spec.color).unwrap_or_else(|| {
            log::warn!("Invalid color '{}' for '{}', using gray", spec.color, spec.formula);
            FALLBACK_COLOR
        });
        Ok(Self::new(spec.formula.clone(), Arc::new(compiled), color))
    }

    /// Wrap a closure, mainly for tests and benches
    pub fn from_fn<F>(formula: &str, color: Rgb, f: F) -> Self
    where
        F: Fn(f64, f64, f64) -> f64 + Send + Sync + 'static,
    {
        Self::new(formula, Arc::new(f), color)
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    /// Evaluate, mapping any non-finite result to 0
    pub fn evaluate(&self, x: f64, y: f64, z: f64) -> f64 {
        let value = self.expr.evaluate(x, y, z);
        if value.is_finite() { value } else { 0.0 }
    }
}

impl fmt::Debug for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Equation")
            .field("formula", &self.formula)
            .field("color", &self.color)
            .finish()
    }
}

/// Compile every spec, dropping the ones that fail with a warning
pub fn compile_equations(specs: &[EquationSpec]) -> Vec<Equation> {
    specs
        .iter()
        .filter_map(|spec| match Equation::compile(spec) {
            Ok(eq) => Some(eq),
            Err(e) => {
                log::warn!("Dropping equation '{}': {}", spec.formula, e);
                None
            }
        })
        .collect()
}
