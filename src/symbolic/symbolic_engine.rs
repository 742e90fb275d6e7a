//! # Symbolic Engine Module
//!
//! This module provides the core of the expression engine: a shared directed acyclic graph
//! of expression nodes that can be evaluated, differentiated, simplified and rewritten.
//!
//! ## Purpose
//!
//! The engine allows users to:
//! - Build formulas programmatically from constants, variables and ~25 node kinds
//! - Evaluate them with a per-node generational cache (see `symbolic_cache`)
//! - Differentiate them analytically (see `symbolic_engine_derivatives`)
//! - Simplify and share common subexpressions (see `symbolic_simplify`)
//! - Substitute variables or freeze them into constants (see `symbolic_substitute`)
//!
//! ## Main Structures
//!
//! ### `Expr`
//! A cheap-to-clone handle to a shared `Node`. Cloning an `Expr` never copies the formula,
//! it only shares it, so the same subexpression may be a child of many parents.
//! Two handles are equal when they point to the same node id.
//!
//! ### `NodeKind`
//! A closed catalog of node shapes:
//! - **Leaves**: `Const(f64)`, `Var(Variable)`
//! - **Unary**: `Invert`, `Square`, `Sqrt`, `Exp`, `Log`, `Sin`, `Cos`, `Atan`, `Acos`, `Ci`, `Si`
//! - **Binary**: `Subtract`, `Divide`, `Atan2`, `Max`, `Min`
//! - **Associative**: `Add`, `Multiply`, `Hypot`
//! - **Conditional**: `Coalesce`, `IfPositive`
//! - **Tabulated**: function given by points on a uniform grid
//! - **Implicit**: a root of an implicit equation found by bracket search
//!
//! ## Interesting Code Features
//!
//! 1. **Identity by integer id**: every node gets a process-unique id at construction;
//!    all memo tables in the engine are keyed by that id.
//!
//! 2. **Simplifying factories**: `Expr::sum`, `Expr::product`, `x.sin()`, the operators
//!    `+ - * /` and so on always return an already simplified node.
//!
//! 3. **Explicit reconstruction**: `NodeKind::with_children` rebuilds a node of the same
//!    kind over new children, which is what substitution and simplification use.

#![allow(non_camel_case_types)]

use crate::symbolic::function_by_points::FunctionByPoints;
use crate::symbolic::special_functions::{ci, si};
use crate::symbolic::symbolic_cache::EvalCache;
use crate::symbolic::symbolic_engine_derivatives::DerivativeMemo;
use crate::symbolic::symbolic_implicit::ImplicitSolve;
use crate::symbolic::symbolic_simplify::rewrite;
use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};
use strum_macros::EnumIter;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

static NIL: LazyLock<Expr> = LazyLock::new(|| Expr::new_raw(NodeKind::Const(0.0)));
static ONE: LazyLock<Expr> = LazyLock::new(|| Expr::new_raw(NodeKind::Const(1.0)));

/// Rendering priority of a node. A child is put in parentheses when the priority of its
/// parent is greater or equal to its own. Has no influence on evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Add,
    Multiply,
    Function,
    Single,
}

/// One-argument node kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum UnaryOp {
    Invert,
    Square,
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Atan,
    Acos,
    /// cosine integral
    Ci,
    /// sine integral
    Si,
}

impl UnaryOp {
    /// raw evaluation over an already evaluated argument
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            UnaryOp::Invert => -value,
            UnaryOp::Square => value * value,
            UnaryOp::Sqrt => value.sqrt(),
            UnaryOp::Exp => value.exp(),
            UnaryOp::Log => {
                if value.is_nan() || value <= 0.0 {
                    f64::NAN
                } else {
                    value.ln()
                }
            }
            UnaryOp::Sin => value.sin(),
            UnaryOp::Cos => value.cos(),
            UnaryOp::Atan => value.atan(),
            UnaryOp::Acos => value.acos(),
            UnaryOp::Ci => ci(value),
            UnaryOp::Si => si(value),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Invert => "neg",
            UnaryOp::Square => "sqr",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Atan => "atan",
            UnaryOp::Acos => "acos",
            UnaryOp::Ci => "Ci",
            UnaryOp::Si => "Si",
        }
    }

    fn priority(&self) -> Priority {
        match self {
            UnaryOp::Invert => Priority::Add,
            _ => Priority::Function,
        }
    }
}

/// Two-argument node kinds with a fixed argument order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum BinaryOp {
    Subtract,
    /// safe division: x / 0 = 0 and 0 / anything = 0
    Divide,
    /// atan2(y; x)
    Atan2,
    Max,
    Min,
}

impl BinaryOp {
    pub fn apply(&self, arg1: f64, arg2: f64) -> f64 {
        match self {
            BinaryOp::Subtract => arg1 - arg2,
            BinaryOp::Divide => {
                if arg1 == 0.0 || arg2 == 0.0 {
                    0.0
                } else {
                    arg1 / arg2
                }
            }
            BinaryOp::Atan2 => arg1.atan2(arg2),
            BinaryOp::Max => arg1.max(arg2),
            BinaryOp::Min => arg1.min(arg2),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Subtract => "-",
            BinaryOp::Divide => "/",
            BinaryOp::Atan2 => "atan2",
            BinaryOp::Max => "max",
            BinaryOp::Min => "min",
        }
    }

    fn priority(&self) -> Priority {
        match self {
            BinaryOp::Subtract => Priority::Add,
            BinaryOp::Divide => Priority::Multiply,
            _ => Priority::Function,
        }
    }
}

/// Variadic node kinds, insensitive to argument order for evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum AssocOp {
    Add,
    Multiply,
    /// sqrt(a^2 + b^2 + ...)
    Hypot,
}

impl AssocOp {
    fn priority(&self) -> Priority {
        match self {
            AssocOp::Add => Priority::Add,
            AssocOp::Multiply => Priority::Multiply,
            AssocOp::Hypot => Priority::Function,
        }
    }
}

/// Three-argument conditionals: (condition, first branch, second branch)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum ConditionalOp {
    /// first branch when condition == 0
    Coalesce,
    /// first branch when condition > 0
    IfPositive,
}

impl ConditionalOp {
    pub fn selects_first(&self, condition: f64) -> bool {
        match self {
            ConditionalOp::Coalesce => condition == 0.0,
            ConditionalOp::IfPositive => condition > 0.0,
        }
    }
}

/// Named mutable value slot. The only mutable state of a graph besides the caches.
///
/// The value is not synchronized with evaluation: a thread that mutates a variable while
/// another thread evaluates a graph containing it must provide its own synchronization.
pub struct Variable {
    name: String,
    value: AtomicU64,
}

impl Variable {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value: AtomicU64::new(value.to_bits()),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }
    pub fn set(&self, value: f64) {
        self.value.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Payload of a node: one variant per node shape
pub enum NodeKind {
    Const(f64),
    Var(Variable),
    Unary(UnaryOp, Expr),
    Binary(BinaryOp, Expr, Expr),
    Assoc(AssocOp, Vec<Expr>),
    Conditional(ConditionalOp, Expr, Expr, Expr),
    Tabulated(Arc<FunctionByPoints>, Expr),
    Implicit(ImplicitSolve),
}

fn take_children<const N: usize>(children: Vec<Expr>) -> [Expr; N] {
    children
        .try_into()
        .unwrap_or_else(|rest: Vec<Expr>| panic!("expected {} children, got {}", N, rest.len()))
}

impl NodeKind {
    /// ordered child references (empty for leaves)
    pub fn children(&self) -> Vec<Expr> {
        match self {
            NodeKind::Const(_) | NodeKind::Var(_) => Vec::new(),
            NodeKind::Unary(_, arg) => vec![arg.clone()],
            NodeKind::Binary(_, arg1, arg2) => vec![arg1.clone(), arg2.clone()],
            NodeKind::Assoc(_, args) => args.clone(),
            NodeKind::Conditional(_, condition, first, second) => {
                vec![condition.clone(), first.clone(), second.clone()]
            }
            NodeKind::Tabulated(_, arg) => vec![arg.clone()],
            NodeKind::Implicit(solve) => solve.children(),
        }
    }

    /// Payload of the same kind over new children. Leaves have no children to replace,
    /// so `None` is returned for them.
    pub fn with_children(&self, children: Vec<Expr>) -> Option<NodeKind> {
        let kind = match self {
            NodeKind::Const(_) | NodeKind::Var(_) => return None,
            NodeKind::Unary(op, _) => {
                let [arg] = take_children(children);
                NodeKind::Unary(*op, arg)
            }
            NodeKind::Binary(op, _, _) => {
                let [arg1, arg2] = take_children(children);
                NodeKind::Binary(*op, arg1, arg2)
            }
            NodeKind::Assoc(op, _) => NodeKind::Assoc(*op, children),
            NodeKind::Conditional(op, _, _, _) => {
                let [condition, first, second] = take_children(children);
                NodeKind::Conditional(*op, condition, first, second)
            }
            NodeKind::Tabulated(table, _) => {
                let [arg] = take_children(children);
                NodeKind::Tabulated(table.clone(), arg)
            }
            NodeKind::Implicit(solve) => NodeKind::Implicit(solve.with_children(children)),
        };
        Some(kind)
    }

    pub fn priority(&self) -> Priority {
        match self {
            NodeKind::Const(value) => {
                if *value >= 0.0 {
                    Priority::Single
                } else {
                    Priority::Add
                }
            }
            NodeKind::Var(_) => Priority::Single,
            NodeKind::Unary(op, _) => op.priority(),
            NodeKind::Binary(op, _, _) => op.priority(),
            NodeKind::Assoc(op, _) => op.priority(),
            NodeKind::Conditional(..) | NodeKind::Tabulated(..) | NodeKind::Implicit(_) => {
                Priority::Function
            }
        }
    }
}

/// A node of the graph: identity, payload, display alias and the caches
pub struct Node {
    id: u64,
    kind: NodeKind,
    alias: Mutex<Option<String>>,
    pub(crate) cache: EvalCache,
    pub(crate) derivatives: Mutex<HashMap<u64, DerivativeMemo>>,
}

/// Shared handle to an expression node
#[derive(Clone)]
pub struct Expr(Arc<Node>);

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Expr {}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Expr {
    //___________________________________NODE ACCESS____________________________________

    /// Wraps a payload into a fresh node without simplifying it.
    ///
    /// Graphs assembled this way are valid but not canonical; call `simplify()` on them.
    pub fn new_raw(kind: NodeKind) -> Expr {
        Expr(Arc::new(Node {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            alias: Mutex::new(None),
            cache: EvalCache::new(),
            derivatives: Mutex::new(HashMap::new()),
        }))
    }

    /// Simplifying constructor used by every factory
    pub(crate) fn build(kind: NodeKind) -> Expr {
        rewrite(kind)
    }

    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    /// handle that does not keep the node alive
    pub(crate) fn downgrade(&self) -> Weak<Node> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<Node>) -> Option<Expr> {
        weak.upgrade().map(Expr)
    }

    pub fn children(&self) -> Vec<Expr> {
        self.kind().children()
    }

    /// Rebuilds the node through the simplifying factories with every child mapped by `f`.
    /// Returns the receiver itself when no child changed.
    pub fn map_children<F>(&self, mut f: F) -> Expr
    where
        F: FnMut(&Expr) -> Expr,
    {
        let children = self.children();
        if children.is_empty() {
            return self.clone();
        }
        let new_children: Vec<Expr> = children.iter().map(&mut f).collect();
        if children.iter().zip(&new_children).all(|(old, new)| old == new) {
            return self.clone();
        }
        match self.kind().with_children(new_children) {
            Some(kind) => Expr::build(kind),
            None => self.clone(),
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self.kind() {
            NodeKind::Const(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.as_constant().is_some()
    }

    /// true only for a constant holding exactly `value`
    pub fn is_constant_value(&self, value: f64) -> bool {
        self.as_constant() == Some(value)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind(), NodeKind::Var(_))
    }

    fn as_variable(&self) -> &Variable {
        match self.kind() {
            NodeKind::Var(variable) => variable,
            _ => panic!("expected a Variable, got {}", self),
        }
    }

    /// name of a variable node
    pub fn name(&self) -> Option<&str> {
        match self.kind() {
            NodeKind::Var(variable) => Some(variable.name()),
            _ => None,
        }
    }

    /// current value of a variable node
    pub fn value(&self) -> f64 {
        self.as_variable().get()
    }

    /// sets the value of a variable node
    pub fn set_value(&self, value: f64) {
        self.as_variable().set(value);
    }

    pub fn alias(&self) -> Option<String> {
        self.0
            .alias
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Human readable label shown by `render` instead of the node structure.
    /// Never affects evaluation nor the structural signature printed by `Display`.
    /// The shared constants `zero()` and `one()` appear in unrelated graphs and keep no alias.
    pub fn set_alias(&self, alias: Option<&str>) {
        if self == &*NIL || self == &*ONE {
            return;
        }
        *self.0.alias.lock().unwrap_or_else(PoisonError::into_inner) = alias.map(str::to_string);
    }

    pub fn priority(&self) -> Priority {
        self.kind().priority()
    }

    //___________________________________LEAVES____________________________________

    pub fn constant(value: f64) -> Expr {
        Expr::new_raw(NodeKind::Const(value))
    }

    /// shared constant 0
    pub fn zero() -> Expr {
        NIL.clone()
    }

    /// shared constant 1
    pub fn one() -> Expr {
        ONE.clone()
    }

    pub fn variable(name: &str, value: f64) -> Expr {
        Expr::new_raw(NodeKind::Var(Variable::new(name, value)))
    }

    /// Creates multiple variables (all set to 0) from a comma-separated string, e.g. "x, y, z"
    pub fn Symbols(symbols: &str) -> Vec<Expr> {
        symbols
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Expr::variable(s, 0.0))
            .collect()
    }

    //___________________________________FACTORIES____________________________________

    pub fn unary(op: UnaryOp, arg: &Expr) -> Expr {
        Expr::build(NodeKind::Unary(op, arg.clone()))
    }

    pub fn binary(op: BinaryOp, arg1: &Expr, arg2: &Expr) -> Expr {
        Expr::build(NodeKind::Binary(op, arg1.clone(), arg2.clone()))
    }

    pub fn assoc<I>(op: AssocOp, args: I) -> Expr
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::build(NodeKind::Assoc(op, args.into_iter().collect()))
    }

    /// Add: flattened, constants summed into one trailing term
    pub fn sum<I>(args: I) -> Expr
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::assoc(AssocOp::Add, args)
    }

    /// Multiply: flattened, constants multiplied into one leading term
    pub fn product<I>(args: I) -> Expr
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::assoc(AssocOp::Multiply, args)
    }

    /// sqrt(a^2 + b^2 + ...)
    pub fn hypot<I>(args: I) -> Expr
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::assoc(AssocOp::Hypot, args)
    }

    pub fn subtract(arg1: &Expr, arg2: &Expr) -> Expr {
        Expr::binary(BinaryOp::Subtract, arg1, arg2)
    }

    pub fn divide(arg1: &Expr, arg2: &Expr) -> Expr {
        Expr::binary(BinaryOp::Divide, arg1, arg2)
    }

    pub fn atan2(y: &Expr, x: &Expr) -> Expr {
        Expr::binary(BinaryOp::Atan2, y, x)
    }

    pub fn max(arg1: &Expr, arg2: &Expr) -> Expr {
        Expr::binary(BinaryOp::Max, arg1, arg2)
    }

    pub fn min(arg1: &Expr, arg2: &Expr) -> Expr {
        Expr::binary(BinaryOp::Min, arg1, arg2)
    }

    /// value_if_zero when condition evaluates to 0, value_if_nonzero otherwise
    pub fn coalesce(condition: &Expr, value_if_zero: &Expr, value_if_nonzero: &Expr) -> Expr {
        Expr::build(NodeKind::Conditional(
            ConditionalOp::Coalesce,
            condition.clone(),
            value_if_zero.clone(),
            value_if_nonzero.clone(),
        ))
    }

    /// value_if_positive when condition evaluates > 0, value_if_non_positive otherwise
    pub fn if_positive(
        condition: &Expr,
        value_if_positive: &Expr,
        value_if_non_positive: &Expr,
    ) -> Expr {
        Expr::build(NodeKind::Conditional(
            ConditionalOp::IfPositive,
            condition.clone(),
            value_if_positive.clone(),
            value_if_non_positive.clone(),
        ))
    }

    /// tabulated function of `arg`
    pub fn function_by_points(table: FunctionByPoints, arg: &Expr) -> Expr {
        Expr::build(NodeKind::Tabulated(Arc::new(table), arg.clone()))
    }

    pub fn invert(&self) -> Expr {
        Expr::unary(UnaryOp::Invert, self)
    }
    pub fn square(&self) -> Expr {
        Expr::unary(UnaryOp::Square, self)
    }
    pub fn sqrt(&self) -> Expr {
        Expr::unary(UnaryOp::Sqrt, self)
    }
    pub fn exp(&self) -> Expr {
        Expr::unary(UnaryOp::Exp, self)
    }
    /// natural logarithm, NaN for non-positive arguments
    pub fn log(&self) -> Expr {
        Expr::unary(UnaryOp::Log, self)
    }
    pub fn sin(&self) -> Expr {
        Expr::unary(UnaryOp::Sin, self)
    }
    pub fn cos(&self) -> Expr {
        Expr::unary(UnaryOp::Cos, self)
    }
    pub fn atan(&self) -> Expr {
        Expr::unary(UnaryOp::Atan, self)
    }
    pub fn acos(&self) -> Expr {
        Expr::unary(UnaryOp::Acos, self)
    }
    pub fn ci(&self) -> Expr {
        Expr::unary(UnaryOp::Ci, self)
    }
    pub fn si(&self) -> Expr {
        Expr::unary(UnaryOp::Si, self)
    }

    fn add_pair(arg1: &Expr, arg2: &Expr) -> Expr {
        Expr::sum([arg1.clone(), arg2.clone()])
    }

    fn mul_pair(arg1: &Expr, arg2: &Expr) -> Expr {
        Expr::product([arg1.clone(), arg2.clone()])
    }

    //___________________________________RENDERING____________________________________

    /// Textual rendering. Aliases are shown only for nodes nested at least `depth` levels
    /// below the receiver; `render(usize::MAX)` (what `Display` prints) is the pure
    /// structural signature.
    pub fn render(&self, depth: usize) -> String {
        self.render_with(depth, false)
    }

    /// Structural signature keying the sharing pass and `unique_complexity`: the `Display`
    /// text, with tabulated tables and solver predicates also told apart by identity.
    pub fn signature(&self) -> String {
        self.render_with(usize::MAX, true)
    }

    fn render_with(&self, depth: usize, tagged: bool) -> String {
        if depth == 0 {
            if let Some(alias) = self.alias() {
                return alias;
            }
        }
        let depth = depth.saturating_sub(1);
        match self.kind() {
            NodeKind::Const(value) => format!("{}", value),
            NodeKind::Var(variable) => variable.name().to_string(),
            NodeKind::Unary(op, arg) => match op {
                UnaryOp::Invert => {
                    format!("-{}", arg.render_enclosed(depth, Priority::Add, tagged))
                }
                UnaryOp::Square => {
                    format!("{} ^ 2", arg.render_enclosed(depth, Priority::Function, tagged))
                }
                UnaryOp::Exp => {
                    format!("e ^ {}", arg.render_enclosed(depth, Priority::Function, tagged))
                }
                _ => format!("{}({})", op.name(), arg.render_with(depth, tagged)),
            },
            NodeKind::Binary(op, arg1, arg2) => match op {
                BinaryOp::Subtract | BinaryOp::Divide => {
                    let priority = op.priority();
                    format!(
                        "{} {} {}",
                        arg1.render_enclosed(depth, priority, tagged),
                        op.name(),
                        arg2.render_enclosed(depth, priority, tagged)
                    )
                }
                _ => format!(
                    "{}({}; {})",
                    op.name(),
                    arg1.render_with(depth, tagged),
                    arg2.render_with(depth, tagged)
                ),
            },
            NodeKind::Assoc(op, args) => match op {
                AssocOp::Add => args
                    .iter()
                    .map(|arg| arg.render_enclosed(depth, Priority::Add, tagged))
                    .join(" + "),
                AssocOp::Multiply => args
                    .iter()
                    .map(|arg| arg.render_enclosed(depth, Priority::Multiply, tagged))
                    .join(" * "),
                AssocOp::Hypot => format!(
                    "hypot({})",
                    args.iter().map(|arg| arg.render_with(depth, tagged)).join(", ")
                ),
            },
            NodeKind::Conditional(op, condition, first, second) => {
                let relation = match op {
                    ConditionalOp::Coalesce => "=",
                    ConditionalOp::IfPositive => "<",
                };
                format!(
                    "if(0 {} {}; {}; {})",
                    relation,
                    condition.render_with(depth, tagged),
                    first.render_with(depth, tagged),
                    second.render_with(depth, tagged)
                )
            }
            NodeKind::Tabulated(table, arg) => {
                let name = if tagged {
                    format!("{}@{:p}", table.name, Arc::as_ptr(table))
                } else {
                    table.name.clone()
                };
                format!("{}({})", name, arg.render_with(depth, tagged))
            }
            NodeKind::Implicit(solve) => {
                let predicate = match &solve.predicate {
                    Some(predicate) if tagged => format!("; where@{:p}", Arc::as_ptr(predicate)),
                    Some(_) => "; where".to_string(),
                    None => String::new(),
                };
                format!(
                    "BinSearch({}; {}; {}; {}; {}{})",
                    solve.variable.render_with(depth, tagged),
                    solve.body.render_with(depth, tagged),
                    solve.min.render_with(depth, tagged),
                    solve.max.render_with(depth, tagged),
                    solve.precision.render_with(depth, tagged),
                    predicate
                )
            }
        }
    }

    fn render_enclosed(&self, depth: usize, caller: Priority, tagged: bool) -> String {
        if depth == 0 {
            if let Some(alias) = self.alias() {
                return alias;
            }
        }
        let rendered = self.render_with(depth, tagged);
        if caller >= self.priority() {
            format!("({})", rendered)
        } else {
            rendered
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(usize::MAX))
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Expr#{}({})", self.id(), self)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::constant(value)
    }
}

impl From<&Expr> for Expr {
    fn from(expr: &Expr) -> Self {
        expr.clone()
    }
}

//___________________________________OPERATORS____________________________________

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $build:path) => {
        impl std::ops::$trait<Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $build(&self, &rhs)
            }
        }
        impl std::ops::$trait<&Expr> for Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $build(&self, rhs)
            }
        }
        impl std::ops::$trait<Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $build(self, &rhs)
            }
        }
        impl std::ops::$trait<&Expr> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $build(self, rhs)
            }
        }
        impl std::ops::$trait<f64> for Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $build(&self, &Expr::constant(rhs))
            }
        }
        impl std::ops::$trait<f64> for &Expr {
            type Output = Expr;
            fn $method(self, rhs: f64) -> Expr {
                $build(self, &Expr::constant(rhs))
            }
        }
        impl std::ops::$trait<Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                $build(&Expr::constant(self), &rhs)
            }
        }
        impl std::ops::$trait<&Expr> for f64 {
            type Output = Expr;
            fn $method(self, rhs: &Expr) -> Expr {
                $build(&Expr::constant(self), rhs)
            }
        }
    };
}

impl_binary_operator!(Add, add, Expr::add_pair);
impl_binary_operator!(Sub, sub, Expr::subtract);
impl_binary_operator!(Mul, mul, Expr::mul_pair);
impl_binary_operator!(Div, div, Expr::divide);

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.invert()
    }
}

impl std::ops::Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        self.invert()
    }
}

impl std::ops::AddAssign for Expr {
    fn add_assign(&mut self, rhs: Self) {
        *self = Expr::add_pair(self, &rhs);
    }
}

impl std::ops::SubAssign for Expr {
    fn sub_assign(&mut self, rhs: Self) {
        *self = Expr::subtract(self, &rhs);
    }
}

impl std::ops::MulAssign for Expr {
    fn mul_assign(&mut self, rhs: Self) {
        *self = Expr::mul_pair(self, &rhs);
    }
}

impl std::ops::DivAssign for Expr {
    fn div_assign(&mut self, rhs: Self) {
        *self = Expr::divide(self, &rhs);
    }
}

//___________________________________MACROS____________________________________

/// Macro to create symbolic variables from a comma-separated list
/// Usage: symbols!(x, y, z) -> creates variables x, y, z set to 0
#[macro_export]
macro_rules! symbols {
    ($($var:ident),+ $(,)?) => {
        ($($crate::symbolic::symbolic_engine::Expr::variable(stringify!($var), 0.0)),+)
    };
}
