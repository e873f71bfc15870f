//! Expression compile errors

use thiserror::Error;

/// Why an expression failed to compile
///
/// Positions are byte offsets into the source after any leading
/// `f(x,y) =` definition was stripped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid number '{text}' at {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("unexpected {found} at {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        pos: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown identifier '{name}' at {pos}")]
    UnknownIdentifier { name: String, pos: usize },

    #[error("unknown function '{name}' at {pos}")]
    UnknownFunction { name: String, pos: usize },

    #[error("function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: &'static str,
        expected: String,
        found: usize,
    },
}
