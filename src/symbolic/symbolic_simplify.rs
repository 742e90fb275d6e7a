//! # Symbolic Expression Simplification Module
//!
//! Local rewriting rules applied by every factory of the engine, plus whole-graph passes:
//!
//! 1. **Constant Folding**: a node whose children are all constants becomes a constant with
//!    the value the node would evaluate to
//! 2. **Flattening**: nested `Add`/`Multiply`/`Hypot` of the same kind merge into one node,
//!    constants are combined into a single trailing term (leading for `Multiply`)
//! 3. **Identities**: `x - 0 = x`, `0 - x = -x`, `log(e ^ x) = x`, `e ^ log(x) = x`,
//!    `hypot(a, b) ^ 2 = a ^ 2 + b ^ 2`, safe division by a zero constant gives 0
//! 4. **Conditional Folding**: a conditional with a constant condition is replaced by the
//!    selected branch, the other branch is never evaluated
//!
//! Rules never re-simplify the children: whatever reaches a factory is already simplified,
//! so every node produced by the factories is a fixed point of `simplify()`.
//!
//! `share_common_subexpressions()` merges structurally identical subgraphs into one node, and
//! `plain_complexity()`/`unique_complexity()` measure how well that worked.

use crate::symbolic::symbolic_engine::{AssocOp, BinaryOp, Expr, NodeKind, UnaryOp};
use std::collections::{HashMap, HashSet};

/// Builds a node from `kind` applying the root-level rules
pub(crate) fn rewrite(kind: NodeKind) -> Expr {
    match simplify_root(&kind) {
        Some(replacement) => replacement,
        None => Expr::new_raw(kind),
    }
}

/// Replacement for a node with already simplified children, `None` when the node is final
pub(crate) fn simplify_root(kind: &NodeKind) -> Option<Expr> {
    if let Some(value) = fold_constants(kind) {
        return Some(Expr::constant(value));
    }
    match kind {
        NodeKind::Const(_) | NodeKind::Var(_) | NodeKind::Tabulated(..) | NodeKind::Implicit(_) => {
            None
        }
        NodeKind::Unary(op, arg) => simplify_unary(*op, arg),
        NodeKind::Binary(op, arg1, arg2) => simplify_binary(*op, arg1, arg2),
        NodeKind::Assoc(op, args) => {
            if is_canonical(*op, args) {
                None
            } else {
                Some(flatten(*op, args))
            }
        }
        NodeKind::Conditional(op, condition, first, second) => condition.as_constant().map(|value| {
            if op.selects_first(value) {
                first.clone()
            } else {
                second.clone()
            }
        }),
    }
}

/// value of a node whose children are all constants
fn fold_constants(kind: &NodeKind) -> Option<f64> {
    match kind {
        NodeKind::Const(_) | NodeKind::Var(_) | NodeKind::Implicit(_) => return None,
        _ => {}
    }
    let children = kind.children();
    if !children.iter().all(Expr::is_constant) {
        return None;
    }
    let folded = Expr::new_raw(kind.with_children(children)?);
    Some(folded.evaluate())
}

fn simplify_unary(op: UnaryOp, arg: &Expr) -> Option<Expr> {
    match (op, arg.kind()) {
        (UnaryOp::Log, NodeKind::Unary(UnaryOp::Exp, inner))
        | (UnaryOp::Exp, NodeKind::Unary(UnaryOp::Log, inner))
        | (UnaryOp::Invert, NodeKind::Unary(UnaryOp::Invert, inner)) => Some(inner.clone()),
        (UnaryOp::Square, NodeKind::Assoc(AssocOp::Hypot, args)) => {
            Some(Expr::sum(args.iter().map(Expr::square)))
        }
        _ => None,
    }
}

fn simplify_binary(op: BinaryOp, arg1: &Expr, arg2: &Expr) -> Option<Expr> {
    match op {
        BinaryOp::Subtract => {
            if arg2.is_constant_value(0.0) {
                Some(arg1.clone())
            } else if arg1.is_constant_value(0.0) {
                Some(arg2.invert())
            } else {
                None
            }
        }
        BinaryOp::Divide => {
            if arg1.is_constant_value(0.0) || arg2.is_constant_value(0.0) {
                Some(Expr::zero())
            } else {
                arg2.as_constant()
                    .map(|divisor| Expr::product([arg1.clone(), Expr::constant(1.0 / divisor)]))
            }
        }
        BinaryOp::Atan2 | BinaryOp::Max | BinaryOp::Min => None,
    }
}

/// At most one constant at its place, no identity element, no nested node of the same kind
fn is_canonical(op: AssocOp, args: &[Expr]) -> bool {
    if args.iter().all(Expr::is_constant) {
        return false;
    }
    if args.len() < 2 && op != AssocOp::Hypot {
        return false;
    }
    let nested = args
        .iter()
        .any(|arg| matches!(arg.kind(), NodeKind::Assoc(inner, _) if *inner == op));
    if nested {
        return false;
    }
    let constants: Vec<(usize, f64)> = args
        .iter()
        .enumerate()
        .filter_map(|(i, arg)| arg.as_constant().map(|value| (i, value)))
        .collect();
    let last = args.len() - 1;
    match constants.as_slice() {
        [] => true,
        [(index, value)] => match op {
            AssocOp::Add => *index == last && *value != 0.0,
            AssocOp::Multiply => *index == 0 && *value != 1.0 && *value != 0.0,
            AssocOp::Hypot => *index == last && (*value > 0.0 || value.is_nan()),
        },
        _ => false,
    }
}

fn collect_terms(op: AssocOp, args: &[Expr], terms: &mut Vec<Expr>, constants: &mut Vec<f64>) {
    for arg in args {
        match arg.kind() {
            NodeKind::Assoc(inner, nested) if *inner == op => {
                collect_terms(op, nested, terms, constants)
            }
            NodeKind::Const(value) => constants.push(*value),
            _ => terms.push(arg.clone()),
        }
    }
}

fn flatten(op: AssocOp, args: &[Expr]) -> Expr {
    let mut terms = Vec::new();
    let mut constants = Vec::new();
    collect_terms(op, args, &mut terms, &mut constants);
    let combined = match op {
        AssocOp::Add => constants.iter().sum::<f64>(),
        AssocOp::Multiply => {
            if constants.iter().any(|value| *value == 0.0) {
                return Expr::zero();
            }
            constants.iter().product::<f64>()
        }
        AssocOp::Hypot => constants.iter().map(|value| value * value).sum::<f64>().sqrt(),
    };
    if terms.is_empty() {
        return Expr::constant(combined);
    }
    match op {
        AssocOp::Add | AssocOp::Hypot if combined != 0.0 => terms.push(Expr::constant(combined)),
        AssocOp::Multiply if combined != 1.0 => terms.insert(0, Expr::constant(combined)),
        _ => {}
    }
    if terms.len() == 1 && op != AssocOp::Hypot {
        return terms.remove(0);
    }
    Expr::new_raw(NodeKind::Assoc(op, terms))
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// Bottom-up simplification of the whole graph. Shared subgraphs are visited once.
    /// Returns the receiver itself when nothing changes.
    pub fn simplify(&self) -> Expr {
        let mut memo = HashMap::new();
        self.simplify_memo(&mut memo)
    }

    fn simplify_memo(&self, memo: &mut HashMap<u64, Expr>) -> Expr {
        if let Some(done) = memo.get(&self.id()) {
            return done.clone();
        }
        let children = self.children();
        let result = if children.is_empty() {
            self.clone()
        } else {
            let new_children: Vec<Expr> =
                children.iter().map(|child| child.simplify_memo(memo)).collect();
            if children.iter().zip(&new_children).all(|(old, new)| old == new) {
                simplify_root(self.kind()).unwrap_or_else(|| self.clone())
            } else {
                match self.kind().with_children(new_children) {
                    Some(kind) => rewrite(kind),
                    None => self.clone(),
                }
            }
        };
        memo.insert(self.id(), result.clone());
        result
    }

    //___________________________________SHARING____________________________________

    /// Replaces structurally identical subgraphs (same `signature()`) by one node.
    /// The graph is walked top-down, the first occurrence wins.
    pub fn share_common_subexpressions(&self) -> Expr {
        let mut seen = HashMap::new();
        self.share_common_subexpressions_with(&mut seen)
    }

    /// Same as `share_common_subexpressions` but with a caller owned table, so that several
    /// roots (e.g. the coordinates of a point) share nodes with each other
    pub fn share_common_subexpressions_with(&self, seen: &mut HashMap<String, Expr>) -> Expr {
        let key = self.signature();
        if let Some(existing) = seen.get(&key) {
            return existing.clone();
        }
        // an implicit solver binds its own variable, its body is left alone
        let result = if matches!(self.kind(), NodeKind::Implicit(_)) {
            self.clone()
        } else {
            let children = self.children();
            let new_children: Vec<Expr> = children
                .iter()
                .map(|child| child.share_common_subexpressions_with(seen))
                .collect();
            if children.iter().zip(&new_children).all(|(old, new)| old == new) {
                self.clone()
            } else {
                match self.kind().with_children(new_children) {
                    Some(kind) => Expr::new_raw(kind),
                    None => self.clone(),
                }
            }
        };
        seen.insert(key, result.clone());
        result
    }

    /// node count of the graph unfolded into a tree
    pub fn plain_complexity(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(Expr::plain_complexity)
            .sum::<usize>()
    }

    /// number of structurally distinct subexpressions
    pub fn unique_complexity(&self) -> usize {
        let mut keys = HashSet::new();
        self.collect_renderings(&mut keys);
        keys.len()
    }

    fn collect_renderings(&self, keys: &mut HashSet<String>) {
        if keys.insert(self.signature()) {
            for child in self.children() {
                child.collect_renderings(keys);
            }
        }
    }

    /// number of distinct nodes (by identity) reachable from the receiver
    pub fn node_count(&self) -> usize {
        let mut visited = HashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(expr) = stack.pop() {
            if visited.insert(expr.id()) {
                stack.extend(expr.children());
            }
        }
        visited.len()
    }
}
