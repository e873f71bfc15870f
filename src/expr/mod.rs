//! Expression language for terrain equations
//!
//! User formulas such as `sin(x) * cos(y)` or `f(x,y) = 3x^2 - y` are
//! compiled once into an expression tree and evaluated many times per
//! chunk. The terrain core only sees the [`Expression`] trait, so the
//! evaluator behind [`compile`] can change without touching it.
//!
//! ```
//! use mathterrain::expr::{compile, Expression};
//!
//! let expr = compile("f(x,y) = 2x + y").unwrap();
//! assert_eq!(expr.evaluate(1.0, 3.0, 0.0), 5.0);
//! ```

pub mod ast;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use error::ExprError;

use ast::Expr;

/// A compiled scalar function of (x, y, z)
///
/// Implementations must be pure: identical inputs give bit-identical
/// outputs. Results may be non-finite; callers decide how to absorb that.
pub trait Expression: Send + Sync {
    fn evaluate(&self, x: f64, y: f64, z: f64) -> f64;
}

impl<F> Expression for F
where
    F: Fn(f64, f64, f64) -> f64 + Send + Sync,
{
    fn evaluate(&self, x: f64, y: f64, z: f64) -> f64 {
        self(x, y, z)
    }
}

/// Tree-walking evaluator produced by [`compile`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    root: Expr,
}

impl CompiledExpr {
    /// The formula as written by the user
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }
}

impl Expression for CompiledExpr {
    fn evaluate(&self, x: f64, y: f64, z: f64) -> f64 {
        self.root.eval(&[x, y, z])
    }
}

/// Compile a formula
pub fn compile(source: &str) -> Result<CompiledExpr, ExprError> {
    let body = strip_definition(source);
    let root = parser::parse(body)?.simplify();
    Ok(CompiledExpr {
        source: source.to_string(),
        root,
    })
}

/// Drop a leading `name =` or `name(args) =` definition
fn strip_definition(source: &str) -> &str {
    let bytes = source.as_bytes();
    let Some(eq) = (0..bytes.len()).find(|&i| {
        bytes[i] == b'='
            && bytes.get(i + 1) != Some(&b'=')
            && (i == 0 || !matches!(bytes[i - 1], b'<' | b'>' | b'=' | b'!'))
    }) else {
        return source;
    };

    let head = source[..eq].trim();
    let is_definition = !head.is_empty()
        && head.starts_with(|c: char| c.is_ascii_alphabetic())
        && head
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '(' | ')' | ',' | ' '));

    if is_definition { &source[eq + 1..] } else { source }
}
