//! Rewriting passes over variables: substitution of variables by expressions and freezing of
//! variables into constants holding their current values.
//!
//! Both passes are memoized by node id (shared subgraphs are rewritten once and stay shared)
//! and return the receiver itself when nothing under it changes. The bound variable of an
//! implicit solver node is never rewritten inside that node's body.
use crate::symbolic::symbolic_engine::{Expr, NodeKind};
use crate::symbolic::symbolic_implicit::ImplicitSolve;
use std::collections::{HashMap, HashSet};

impl Expr {
    /// Replaces every occurrence of each variable by the paired expression.
    ///
    /// # Example
    /// ```
    /// use RustedExprDAG::symbolic::symbolic_engine::Expr;
    /// let x = Expr::variable("x", 0.0);
    /// let y = Expr::variable("y", 3.0);
    /// let f = x.square() + 1.0;
    /// let g = f.substitute_variables(&[(x.clone(), &y + 1.0)]);
    /// assert_eq!(g.to_string(), "(y + 1) ^ 2 + 1");
    /// assert_eq!(g.evaluate(), 17.0);
    /// ```
    pub fn substitute_variables(&self, substitutions: &[(Expr, Expr)]) -> Expr {
        if substitutions.is_empty() {
            return self.clone();
        }
        let mut memo = HashMap::new();
        self.substitute_memo(substitutions, &mut memo)
    }

    fn substitute_memo(&self, substitutions: &[(Expr, Expr)], memo: &mut HashMap<u64, Expr>) -> Expr {
        if let Some(done) = memo.get(&self.id()) {
            return done.clone();
        }
        let result = match self.kind() {
            NodeKind::Const(_) => self.clone(),
            NodeKind::Var(_) => substitutions
                .iter()
                .find(|(variable, _)| variable == self)
                .map(|(_, replacement)| replacement.clone())
                .unwrap_or_else(|| self.clone()),
            NodeKind::Implicit(solve) => {
                let inner: Vec<(Expr, Expr)> = substitutions
                    .iter()
                    .filter(|(variable, _)| variable != &solve.variable)
                    .cloned()
                    .collect();
                let body = solve.body.substitute_variables(&inner);
                self.rebuild_implicit(solve, body, |bound| bound.substitute_memo(substitutions, memo))
            }
            _ => self.map_children(|child| child.substitute_memo(substitutions, memo)),
        };
        memo.insert(self.id(), result.clone());
        result
    }

    /// Replaces every variable except `excluded` by a constant holding its current value
    pub fn evaluate_vars(&self, excluded: &[Expr]) -> Expr {
        let mut memo = HashMap::new();
        self.evaluate_vars_memo(excluded, &mut memo)
    }

    fn evaluate_vars_memo(&self, excluded: &[Expr], memo: &mut HashMap<u64, Expr>) -> Expr {
        if let Some(done) = memo.get(&self.id()) {
            return done.clone();
        }
        let result = match self.kind() {
            NodeKind::Const(_) => self.clone(),
            NodeKind::Var(variable) => {
                if excluded.contains(self) {
                    self.clone()
                } else {
                    Expr::constant(variable.get())
                }
            }
            NodeKind::Implicit(solve) => {
                let mut inner = excluded.to_vec();
                inner.push(solve.variable.clone());
                let body = solve.body.evaluate_vars(&inner);
                self.rebuild_implicit(solve, body, |bound| bound.evaluate_vars_memo(excluded, memo))
            }
            _ => self.map_children(|child| child.evaluate_vars_memo(excluded, memo)),
        };
        memo.insert(self.id(), result.clone());
        result
    }

    fn rebuild_implicit<F>(&self, solve: &ImplicitSolve, body: Expr, mut rewrite_bound: F) -> Expr
    where
        F: FnMut(&Expr) -> Expr,
    {
        let min = rewrite_bound(&solve.min);
        let max = rewrite_bound(&solve.max);
        let precision = rewrite_bound(&solve.precision);
        let unchanged = body == solve.body
            && min == solve.min
            && max == solve.max
            && precision == solve.precision;
        if unchanged {
            return self.clone();
        }
        Expr::build(NodeKind::Implicit(solve.with_children(vec![body, min, max, precision])))
    }

    /// variables reachable from the receiver, in order of first appearance
    pub fn variables(&self) -> Vec<Expr> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        self.collect_variables(&mut seen, &mut found);
        found
    }

    fn collect_variables(&self, seen: &mut HashSet<u64>, found: &mut Vec<Expr>) {
        if !seen.insert(self.id()) {
            return;
        }
        if self.is_variable() {
            found.push(self.clone());
            return;
        }
        for child in self.children() {
            child.collect_variables(seen, found);
        }
    }
}
