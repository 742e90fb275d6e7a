//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of expression graphs.
//!
//! ## Key Methods
//!
//! - `derivative(var)` - derivative with respect to a `Variable` node, memoized per node and
//!   per variable, so shared subexpressions are differentiated once
//! - `derivatives(vars)` - gradient as a vector of graphs
//! - `compare_with_numeric(...)` - validates an analytical derivative against central
//!   finite differences
//!
//! ## Interesting Code Features
//!
//! 1. **Rules built from factories**: every rule is written with the simplifying factories,
//!    so `0 * anything` terms vanish while the derivative is being built
//!
//! 2. **Memoization by id**: the first result computed for a (node, variable) pair wins and
//!    is returned to every later caller, including concurrent ones. Derivatives of `Exp`,
//!    `Sqrt`, `Hypot` and implicit nodes contain the node itself; their memo entry is weak and
//!    lasts as long as the derivative graph is alive somewhere
//!
//! 3. **Implicit nodes**: the root t(x) of f(t, x) = 0 is differentiated by the implicit
//!    function theorem, see `symbolic_implicit`

use crate::symbolic::symbolic_engine::{
    AssocOp, BinaryOp, ConditionalOp, Expr, Node, NodeKind, UnaryOp,
};
use crate::symbolic::symbolic_implicit::implicit_derivative;
use log::warn;
use std::sync::{PoisonError, Weak};

/// Memo entry of one (node, variable) pair
pub(crate) enum DerivativeMemo {
    Owned(Expr),
    /// the derivative refers to the node, a strong entry would keep the node alive forever
    Unowned(Weak<Node>),
}

impl DerivativeMemo {
    fn get(&self) -> Option<Expr> {
        match self {
            DerivativeMemo::Owned(expr) => Some(expr.clone()),
            DerivativeMemo::Unowned(weak) => Expr::upgrade(weak),
        }
    }
}

impl Expr {
    //___________________________________DIFFERENTIATION____________________________________

    /// Derivative with respect to `variable`.
    ///
    /// # Panics
    /// Panics if `variable` is not a `Variable` node.
    pub fn derivative(&self, variable: &Expr) -> Expr {
        assert!(
            variable.is_variable(),
            "derivative can be taken only with respect to a Variable, got {}",
            variable
        );
        self.derivative_memo(variable)
    }

    /// partial derivatives with respect to each of `variables`
    pub fn derivatives(&self, variables: &[Expr]) -> Vec<Expr> {
        variables.iter().map(|var| self.derivative(var)).collect()
    }

    fn derivative_memo(&self, variable: &Expr) -> Expr {
        match self.kind() {
            NodeKind::Const(_) => return Expr::zero(),
            NodeKind::Var(_) => {
                return if self == variable {
                    Expr::one()
                } else {
                    Expr::zero()
                };
            }
            _ => {}
        }
        let memo = &self.node().derivatives;
        if let Some(done) = memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&variable.id())
            .and_then(DerivativeMemo::get)
        {
            return done;
        }
        let computed = self.derivative_rule(variable);
        let mut memo = memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(done) = memo.get(&variable.id()).and_then(DerivativeMemo::get) {
            return done;
        }
        let entry = if self.derivative_contains_itself() {
            DerivativeMemo::Unowned(computed.downgrade())
        } else {
            DerivativeMemo::Owned(computed.clone())
        };
        memo.insert(variable.id(), entry);
        computed
    }

    fn derivative_contains_itself(&self) -> bool {
        matches!(
            self.kind(),
            NodeKind::Unary(UnaryOp::Exp | UnaryOp::Sqrt, _)
                | NodeKind::Assoc(AssocOp::Hypot, _)
                | NodeKind::Implicit(_)
        )
    }

    fn derivative_rule(&self, variable: &Expr) -> Expr {
        match self.kind() {
            NodeKind::Const(_) | NodeKind::Var(_) => self.derivative_memo(variable),
            NodeKind::Implicit(solve) => implicit_derivative(self, solve, variable),
            NodeKind::Unary(op, arg) => {
                let d_arg = arg.derivative_memo(variable);
                if d_arg.is_constant_value(0.0) {
                    return Expr::zero();
                }
                match op {
                    UnaryOp::Invert => d_arg.invert(),
                    UnaryOp::Square => Expr::product([Expr::constant(2.0), arg.clone(), d_arg]),
                    UnaryOp::Sqrt => {
                        Expr::divide(&Expr::product([Expr::constant(0.5), d_arg]), self)
                    }
                    UnaryOp::Exp => Expr::product([self.clone(), d_arg]),
                    UnaryOp::Log => Expr::divide(&d_arg, arg),
                    UnaryOp::Sin => Expr::product([arg.cos(), d_arg]),
                    UnaryOp::Cos => Expr::product([arg.sin(), d_arg]).invert(),
                    UnaryOp::Atan => Expr::divide(&d_arg, &(arg.square() + 1.0)),
                    UnaryOp::Acos => Expr::divide(&d_arg, &(1.0 - arg.square()).sqrt()).invert(),
                    UnaryOp::Ci => Expr::divide(&Expr::product([arg.cos(), d_arg]), arg),
                    UnaryOp::Si => Expr::divide(&Expr::product([arg.sin(), d_arg]), arg),
                }
            }
            NodeKind::Binary(op, arg1, arg2) => {
                let d1 = arg1.derivative_memo(variable);
                let d2 = arg2.derivative_memo(variable);
                match op {
                    BinaryOp::Subtract => Expr::subtract(&d1, &d2),
                    BinaryOp::Divide => Expr::divide(
                        &Expr::subtract(
                            &Expr::product([d1, arg2.clone()]),
                            &Expr::product([arg1.clone(), d2]),
                        ),
                        &arg2.square(),
                    ),
                    // atan2(y; x): (x dy - y dx) / (y^2 + x^2)
                    BinaryOp::Atan2 => Expr::divide(
                        &Expr::subtract(
                            &Expr::product([arg2.clone(), d1]),
                            &Expr::product([arg1.clone(), d2]),
                        ),
                        &Expr::sum([arg1.square(), arg2.square()]),
                    ),
                    BinaryOp::Max => Expr::if_positive(&Expr::subtract(arg1, arg2), &d1, &d2),
                    BinaryOp::Min => Expr::if_positive(&Expr::subtract(arg1, arg2), &d2, &d1),
                }
            }
            NodeKind::Assoc(op, args) => match op {
                AssocOp::Add => Expr::sum(args.iter().map(|arg| arg.derivative_memo(variable))),
                AssocOp::Multiply => {
                    let partial: Vec<Expr> = args
                        .iter()
                        .enumerate()
                        .map(|(i, arg)| {
                            let d_arg = arg.derivative_memo(variable);
                            if d_arg.is_constant_value(0.0) {
                                return Expr::zero();
                            }
                            Expr::product(args.iter().enumerate().map(|(j, other)| {
                                if i == j { d_arg.clone() } else { other.clone() }
                            }))
                        })
                        .collect();
                    Expr::sum(partial)
                }
                AssocOp::Hypot => {
                    let numerator = Expr::sum(
                        args.iter()
                            .map(|arg| Expr::product([arg.clone(), arg.derivative_memo(variable)])),
                    );
                    Expr::divide(&numerator, self)
                }
            },
            NodeKind::Conditional(op, condition, first, second) => {
                let d_first = first.derivative_memo(variable);
                let d_second = second.derivative_memo(variable);
                match op {
                    ConditionalOp::Coalesce => Expr::coalesce(condition, &d_first, &d_second),
                    ConditionalOp::IfPositive => Expr::if_positive(condition, &d_first, &d_second),
                }
            }
            NodeKind::Tabulated(table, arg) => {
                let d_arg = arg.derivative_memo(variable);
                if d_arg.is_constant_value(0.0) {
                    return Expr::zero();
                }
                Expr::product([table.derivative_over(arg), d_arg])
            }
        }
    }

    //___________________________________NUMERICAL CHECK____________________________________

    /// Compares the analytical derivative with central differences at `points`.
    ///
    /// # Arguments
    /// * `variable` - variable to differentiate by; its value is restored afterwards
    /// * `points` - values of the variable to check at
    /// * `step` - finite difference step
    /// * `tolerance` - maximal acceptable absolute difference
    ///
    /// # Returns
    /// Tuple of (max absolute difference, is_within_tolerance)
    pub fn compare_with_numeric(
        &self,
        variable: &Expr,
        points: &[f64],
        step: f64,
        tolerance: f64,
    ) -> (f64, bool) {
        let analytical = self.derivative(variable);
        let saved = variable.value();
        let mut max_error: f64 = 0.0;
        for &point in points {
            variable.set_value(point + step);
            let forward = self.evaluate();
            variable.set_value(point - step);
            let backward = self.evaluate();
            variable.set_value(point);
            let exact = analytical.evaluate();
            let numeric = (forward - backward) / (2.0 * step);
            let error = (exact - numeric).abs();
            if error.is_nan() {
                warn!("derivative of {} is not comparable at {} = {}", self, variable, point);
                max_error = f64::NAN;
                break;
            }
            max_error = max_error.max(error);
        }
        variable.set_value(saved);
        (max_error, max_error < tolerance)
    }
}
