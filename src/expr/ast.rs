//! Expression tree and its evaluator

use crate::expr::functions::{Func, floored_mod};

/// Input variable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    X,
    Y,
    Z,
}

impl Var {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "x" => Some(Var::X),
            "y" => Some(Var::Y),
            "z" => Some(Var::Z),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
}

impl BinaryOp {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        let truth = |v: bool| if v { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => floored_mod(a, b),
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Less => truth(a < b),
            BinaryOp::LessEq => truth(a <= b),
            BinaryOp::Greater => truth(a > b),
            BinaryOp::GreaterEq => truth(a >= b),
            BinaryOp::Eq => truth(a == b),
            BinaryOp::NotEq => truth(a != b),
        }
    }
}

/// Most arguments evaluated without a heap allocation
const INLINE_ARGS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(Var),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
    /// `cond ? then : else`; a non-zero condition selects `then`
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn eval(&self, vars: &[f64; 3]) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::Var(Var::X) => vars[0],
            Expr::Var(Var::Y) => vars[1],
            Expr::Var(Var::Z) => vars[2],
            Expr::Unary(UnaryOp::Neg, inner) => -inner.eval(vars),
            Expr::Binary(op, lhs, rhs) => op.apply(lhs.eval(vars), rhs.eval(vars)),
            Expr::Call(func, args) => {
                if args.len() <= INLINE_ARGS {
                    let mut buf = [0.0; INLINE_ARGS];
                    for (slot, arg) in buf.iter_mut().zip(args) {
                        *slot = arg.eval(vars);
                    }
                    func.apply(&buf[..args.len()])
                } else {
                    let values: Vec<f64> = args.iter().map(|a| a.eval(vars)).collect();
                    func.apply(&values)
                }
            }
            Expr::Cond(cond, then, otherwise) => {
                if cond.eval(vars) != 0.0 {
                    then.eval(vars)
                } else {
                    otherwise.eval(vars)
                }
            }
        }
    }

    /// Whether the subtree reads no variables
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Num(_) => true,
            Expr::Var(_) => false,
            Expr::Unary(_, inner) => inner.is_constant(),
            Expr::Binary(_, lhs, rhs) => lhs.is_constant() && rhs.is_constant(),
            Expr::Call(_, args) => args.iter().all(Expr::is_constant),
            Expr::Cond(c, a, b) => c.is_constant() && a.is_constant() && b.is_constant(),
        }
    }

    /// Fold constant subtrees into numbers
    pub fn simplify(self) -> Expr {
        let folded = match self {
            Expr::Unary(op, inner) => Expr::Unary(op, Box::new(inner.simplify())),
            Expr::Binary(op, lhs, rhs) => {
                Expr::Binary(op, Box::new(lhs.simplify()), Box::new(rhs.simplify()))
            }
            Expr::Call(func, args) => {
                Expr::Call(func, args.into_iter().map(Expr::simplify).collect())
            }
            Expr::Cond(c, a, b) => Expr::Cond(
                Box::new(c.simplify()),
                Box::new(a.simplify()),
                Box::new(b.simplify()),
            ),
            leaf => leaf,
        };

        if !matches!(folded, Expr::Num(_)) && folded.is_constant() {
            Expr::Num(folded.eval(&[0.0; 3]))
        } else {
            folded
        }
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Num(_) | Expr::Var(_) => 1,
            Expr::Unary(_, inner) => 1 + inner.node_count(),
            Expr::Binary(_, lhs, rhs) => 1 + lhs.node_count() + rhs.node_count(),
            Expr::Call(_, args) => 1 + args.iter().map(Expr::node_count).sum::<usize>(),
            Expr::Cond(c, a, b) => 1 + c.node_count() + a.node_count() + b.node_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simplify_folds_constants() {
        let expr = Expr::Binary(
            BinaryOp::Mul,
            Box::new(Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Num(1.0)),
                Box::new(Expr::Num(2.0)),
            )),
            Box::new(Expr::Var(Var::X)),
        );
        let simplified = expr.simplify();
        assert_eq!(simplified.node_count(), 3);
        assert_eq!(simplified.eval(&[2.0, 0.0, 0.0]), 6.0);
    }

    #[test]
    fn test_conditional() {
        let expr = Expr::Cond(
            Box::new(Expr::Binary(
                BinaryOp::Greater,
                Box::new(Expr::Var(Var::X)),
                Box::new(Expr::Num(0.0)),
            )),
            Box::new(Expr::Num(1.0)),
            Box::new(Expr::Num(-1.0)),
        );
        assert_eq!(expr.eval(&[3.0, 0.0, 0.0]), 1.0);
        assert_eq!(expr.eval(&[-3.0, 0.0, 0.0]), -1.0);
    }

    #[test]
    fn test_many_arguments_spill() {
        let args = (1..=6).map(|v| Expr::Num(v as f64)).collect();
        let expr = Expr::Call(Func::Max, args);
        assert_eq!(expr.eval(&[0.0; 3]), 6.0);
    }
}
