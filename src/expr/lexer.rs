//! Tokenizer for the expression language

use crate::expr::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    EqEq,
    NotEq,
}

impl TokenKind {
    /// Human-readable token description for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::Plus => "'+'".into(),
            TokenKind::Minus => "'-'".into(),
            TokenKind::Star => "'*'".into(),
            TokenKind::Slash => "'/'".into(),
            TokenKind::Percent => "'%'".into(),
            TokenKind::Caret => "'^'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::Comma => "','".into(),
            TokenKind::Question => "'?'".into(),
            TokenKind::Colon => "':'".into(),
            TokenKind::Less => "'<'".into(),
            TokenKind::LessEq => "'<='".into(),
            TokenKind::Greater => "'>'".into(),
            TokenKind::GreaterEq => "'>='".into(),
            TokenKind::EqEq => "'=='".into(),
            TokenKind::NotEq => "'!='".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub pos: usize,
}

/// Split source text into tokens
pub fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            i = scan_number(bytes, i);
            let text = &src[start..i];
            let value = text.parse::<f64>().map_err(|_| ExprError::InvalidNumber {
                text: text.to_string(),
                pos: start,
            })?;
            tokens.push(Token { kind: TokenKind::Number(value), pos: start });
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(src[start..i].to_string()),
                pos: start,
            });
            continue;
        }

        let next = bytes.get(i + 1).copied();
        let (kind, len) = match (c, next) {
            (b'*', Some(b'*')) => (TokenKind::Caret, 2),
            (b'<', Some(b'=')) => (TokenKind::LessEq, 2),
            (b'>', Some(b'=')) => (TokenKind::GreaterEq, 2),
            (b'=', Some(b'=')) => (TokenKind::EqEq, 2),
            (b'!', Some(b'=')) => (TokenKind::NotEq, 2),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'*', _) => (TokenKind::Star, 1),
            (b'/', _) => (TokenKind::Slash, 1),
            (b'%', _) => (TokenKind::Percent, 1),
            (b'^', _) => (TokenKind::Caret, 1),
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b'?', _) => (TokenKind::Question, 1),
            (b':', _) => (TokenKind::Colon, 1),
            (b'<', _) => (TokenKind::Less, 1),
            (b'>', _) => (TokenKind::Greater, 1),
            _ => {
                let ch = src[start..].chars().next().unwrap_or('?');
                return Err(ExprError::UnexpectedChar { ch, pos: start });
            }
        };
        tokens.push(Token { kind, pos: start });
        i += len;
    }

    Ok(tokens)
}

/// Scan digits, an optional fraction and an optional exponent
///
/// An `e` only starts an exponent when digits follow it, so `2e` stays
/// "2 times e" and `2exp(x)` stays "2 times exp(x)".
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}
