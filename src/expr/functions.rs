//! Builtin functions and constants

/// Named constants available in expressions
pub fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" | "PI" => Some(std::f64::consts::PI),
        "e" | "E" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        "phi" => Some(1.618_033_988_749_895),
        _ => None,
    }
}

/// Accepted argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exact(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(k) => n >= k,
        }
    }

    pub fn describe(self) -> String {
        match self {
            Arity::Exact(k) => k.to_string(),
            Arity::Range(lo, hi) => format!("{} to {}", lo, hi),
            Arity::AtLeast(k) => format!("at least {}", k),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Sqrt,
    Cbrt,
    Abs,
    Sign,
    Exp,
    Log,
    Ln,
    Log10,
    Log2,
    Floor,
    Ceil,
    Round,
    Trunc,
    Min,
    Max,
    Pow,
    Hypot,
    Mod,
    Fract,
    Clamp,
    Lerp,
    Step,
    Smoothstep,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" => Func::Asin,
            "acos" => Func::Acos,
            "atan" => Func::Atan,
            "atan2" => Func::Atan2,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "asinh" => Func::Asinh,
            "acosh" => Func::Acosh,
            "atanh" => Func::Atanh,
            "sqrt" => Func::Sqrt,
            "cbrt" => Func::Cbrt,
            "abs" => Func::Abs,
            "sign" => Func::Sign,
            "exp" => Func::Exp,
            "log" => Func::Log,
            "ln" => Func::Ln,
            "log10" => Func::Log10,
            "log2" => Func::Log2,
            "floor" => Func::Floor,
            "ceil" => Func::Ceil,
            "round" => Func::Round,
            "trunc" => Func::Trunc,
            "min" => Func::Min,
            "max" => Func::Max,
            "pow" => Func::Pow,
            "hypot" => Func::Hypot,
            "mod" => Func::Mod,
            "fract" => Func::Fract,
            "clamp" => Func::Clamp,
            "lerp" => Func::Lerp,
            "step" => Func::Step,
            "smoothstep" => Func::Smoothstep,
            _ => return None,
        };
        Some(func)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Atan2 => "atan2",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Asinh => "asinh",
            Func::Acosh => "acosh",
            Func::Atanh => "atanh",
            Func::Sqrt => "sqrt",
            Func::Cbrt => "cbrt",
            Func::Abs => "abs",
            Func::Sign => "sign",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Ln => "ln",
            Func::Log10 => "log10",
            Func::Log2 => "log2",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Round => "round",
            Func::Trunc => "trunc",
            Func::Min => "min",
            Func::Max => "max",
            Func::Pow => "pow",
            Func::Hypot => "hypot",
            Func::Mod => "mod",
            Func::Fract => "fract",
            Func::Clamp => "clamp",
            Func::Lerp => "lerp",
            Func::Step => "step",
            Func::Smoothstep => "smoothstep",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Func::Atan2 | Func::Pow | Func::Hypot | Func::Mod | Func::Step => Arity::Exact(2),
            Func::Clamp | Func::Lerp | Func::Smoothstep => Arity::Exact(3),
            Func::Log => Arity::Range(1, 2),
            Func::Min | Func::Max => Arity::AtLeast(1),
            _ => Arity::Exact(1),
        }
    }

    /// Apply to already evaluated arguments
    ///
    /// The argument count has been checked against [`Func::arity`] at compile time.
    pub fn apply(self, args: &[f64]) -> f64 {
        let a = args.first().copied().unwrap_or(f64::NAN);
        let b = args.get(1).copied().unwrap_or(f64::NAN);
        let c = args.get(2).copied().unwrap_or(f64::NAN);
        match self {
            Func::Sin => a.sin(),
            Func::Cos => a.cos(),
            Func::Tan => a.tan(),
            Func::Asin => a.asin(),
            Func::Acos => a.acos(),
            Func::Atan => a.atan(),
            Func::Atan2 => a.atan2(b),
            Func::Sinh => a.sinh(),
            Func::Cosh => a.cosh(),
            Func::Tanh => a.tanh(),
            Func::Asinh => a.asinh(),
            Func::Acosh => a.acosh(),
            Func::Atanh => a.atanh(),
            Func::Sqrt => a.sqrt(),
            Func::Cbrt => a.cbrt(),
            Func::Abs => a.abs(),
            Func::Sign => sign(a),
            Func::Exp => a.exp(),
            Func::Log if args.len() == 2 => a.ln() / b.ln(),
            Func::Log | Func::Ln => a.ln(),
            Func::Log10 => a.log10(),
            Func::Log2 => a.log2(),
            Func::Floor => a.floor(),
            Func::Ceil => a.ceil(),
            Func::Round => a.round(),
            Func::Trunc => a.trunc(),
            Func::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Func::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Func::Pow => a.powf(b),
            Func::Hypot => a.hypot(b),
            Func::Mod => floored_mod(a, b),
            Func::Fract => a - a.floor(),
            Func::Clamp => a.min(c).max(b),
            Func::Lerp => a + c * (b - a),
            Func::Step => {
                if b < a {
                    0.0
                } else {
                    1.0
                }
            }
            Func::Smoothstep => {
                let t = ((c - a) / (b - a)).clamp(0.0, 1.0);
                t * t * (3.0 - 2.0 * t)
            }
        }
    }
}

/// Sign with sign(0) = 0
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        v
    }
}

/// Modulo with the sign of the divisor; a zero divisor yields 0
pub fn floored_mod(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return 0.0;
    }
    a - b * (a / b).floor()
}
