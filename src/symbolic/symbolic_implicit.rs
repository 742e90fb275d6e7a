//! Implicit solver node: the value t* where f(t) changes sign from non-negative to negative,
//! with t searched by bracket doubling, bisection and a final secant step
//! (see `numerical::binary_search`).
//!
//! The node owns the bound variable t, which is not one of its children: substitution and
//! freezing of variables never touch t inside the body. Evaluation writes every trial value
//! into t and leaves it at the root that was found.
use crate::numerical::binary_search::search;
use crate::symbolic::symbolic_cache::{Generation, next_generation};
use crate::symbolic::symbolic_engine::{Expr, NodeKind};
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Optional extra condition on a trial point: `(trial value, trial generation) -> bool`.
/// A trial point counts as "past the root" only when the predicate holds and the body is negative.
pub type SearchPredicate = Arc<dyn Fn(f64, Generation) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct ImplicitSolve {
    pub body: Expr,
    pub variable: Expr,
    pub min: Expr,
    pub max: Expr,
    pub precision: Expr,
    pub predicate: Option<SearchPredicate>,
}

impl fmt::Debug for ImplicitSolve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ImplicitSolve")
            .field("body", &self.body)
            .field("variable", &self.variable)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("precision", &self.precision)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

impl ImplicitSolve {
    pub(crate) fn children(&self) -> Vec<Expr> {
        vec![
            self.body.clone(),
            self.min.clone(),
            self.max.clone(),
            self.precision.clone(),
        ]
    }

    pub(crate) fn with_children(&self, children: Vec<Expr>) -> ImplicitSolve {
        let [body, min, max, precision]: [Expr; 4] = children
            .try_into()
            .unwrap_or_else(|rest: Vec<Expr>| panic!("expected 4 children, got {}", rest.len()));
        ImplicitSolve {
            body,
            variable: self.variable.clone(),
            min,
            max,
            precision,
            predicate: self.predicate.clone(),
        }
    }
}

impl Expr {
    /// Root of `body` in `variable` on the bracket [min, max], expanded by doubling `max`.
    ///
    /// # Panics
    /// Panics if `variable` is not a `Variable` node.
    pub fn binary_search(
        body: &Expr,
        variable: &Expr,
        min: impl Into<Expr>,
        max: impl Into<Expr>,
        precision: impl Into<Expr>,
        predicate: Option<SearchPredicate>,
    ) -> Expr {
        assert!(
            variable.is_variable(),
            "implicit solver needs a Variable to bind, got {}",
            variable
        );
        Expr::build(NodeKind::Implicit(ImplicitSolve {
            body: body.clone(),
            variable: variable.clone(),
            min: min.into(),
            max: max.into(),
            precision: precision.into(),
            predicate,
        }))
    }
}

pub(crate) fn evaluate_implicit(solve: &ImplicitSolve, generation: Generation) -> f64 {
    let min = solve.min.evaluate_in(generation);
    let max = solve.max.evaluate_in(generation);
    let precision = solve.precision.evaluate_in(generation);
    let variable = &solve.variable;
    let root = search(
        min,
        max,
        precision,
        |x| {
            variable.set_value(x);
            let trial = next_generation();
            solve
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate(x, trial))
                && solve.body.evaluate_in(trial) < 0.0
        },
        |x| {
            variable.set_value(x);
            solve.body.evaluate()
        },
    );
    if root.is_nan() {
        debug!(
            "no root of {} for {} in [{}, {}]",
            solve.body, variable, min, max
        );
    } else {
        variable.set_value(root);
    }
    root
}

/// dt/dx = -f'_x / f'_t at t = t(x); 0 with respect to t itself
pub(crate) fn implicit_derivative(node: &Expr, solve: &ImplicitSolve, variable: &Expr) -> Expr {
    if variable == &solve.variable {
        return Expr::zero();
    }
    let d_variable = solve.body.derivative(variable);
    if d_variable.is_constant_value(0.0) {
        return Expr::zero();
    }
    let slope = -Expr::divide(&d_variable, &solve.body.derivative(&solve.variable));
    slope.substitute_variables(&[(solve.variable.clone(), node.clone())])
}
