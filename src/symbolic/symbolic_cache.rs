//! # Generational evaluation cache
//!
//! Every non-leaf node owns one `EvalCache` slot holding the last computed value together
//! with the generation token it was computed for. Evaluating a graph with one generation
//! computes every shared subexpression exactly once; a new generation invalidates all
//! slots at once, without walking the graph.
//!
//! Generations are drawn from a process-wide atomic counter, so tokens never repeat and
//! independent callers never collide. The slot lock is held while the value is computed,
//! which makes concurrent evaluations with the same generation agree on one value; locks are
//! always taken from parent to child, so the acyclic graph can not deadlock on them.
use crate::symbolic::symbolic_engine::{AssocOp, BinaryOp, Expr, NodeKind};
use crate::symbolic::symbolic_implicit::evaluate_implicit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Token that marks one evaluation pass
pub type Generation = u64;

static GENERATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh generation token, strictly greater than every token handed out before
pub fn next_generation() -> Generation {
    GENERATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

#[derive(Debug, Default)]
struct CacheSlot {
    // 0 means the slot is empty: generations start at 1
    generation: Generation,
    value: f64,
    recomputations: u64,
}

#[derive(Debug, Default)]
pub struct EvalCache {
    slot: Mutex<CacheSlot>,
}

impl EvalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `generation`, computing (and storing) it when the slot is stale
    pub fn get_or_compute<F>(&self, generation: Generation, compute: F) -> f64
    where
        F: FnOnce() -> f64,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.generation != generation || generation == 0 {
            slot.value = compute();
            slot.generation = generation;
            slot.recomputations += 1;
        }
        slot.value
    }

    pub fn recomputations(&self) -> u64 {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recomputations
    }
}

impl Expr {
    /// Evaluates the graph with a fresh generation
    pub fn evaluate(&self) -> f64 {
        self.evaluate_in(next_generation())
    }

    /// Evaluates the graph reusing every node value already computed for `generation`
    pub fn evaluate_in(&self, generation: Generation) -> f64 {
        match self.kind() {
            NodeKind::Const(value) => *value,
            NodeKind::Var(variable) => variable.get(),
            _ => self
                .node()
                .cache
                .get_or_compute(generation, || self.compute(generation)),
        }
    }

    /// how many times the value of this node was actually computed
    pub fn recomputation_count(&self) -> u64 {
        self.node().cache.recomputations()
    }

    fn compute(&self, generation: Generation) -> f64 {
        match self.kind() {
            NodeKind::Const(value) => *value,
            NodeKind::Var(variable) => variable.get(),
            NodeKind::Unary(op, arg) => op.apply(arg.evaluate_in(generation)),
            NodeKind::Binary(op, arg1, arg2) => {
                let value1 = arg1.evaluate_in(generation);
                // the divisor is not needed once the dividend is 0
                if *op == BinaryOp::Divide && value1 == 0.0 {
                    return 0.0;
                }
                op.apply(value1, arg2.evaluate_in(generation))
            }
            NodeKind::Assoc(op, args) => match op {
                AssocOp::Add => args.iter().map(|arg| arg.evaluate_in(generation)).sum(),
                AssocOp::Multiply => {
                    let mut product = 1.0;
                    for arg in args {
                        product *= arg.evaluate_in(generation);
                        if product == 0.0 {
                            break;
                        }
                    }
                    product
                }
                AssocOp::Hypot => args
                    .iter()
                    .map(|arg| {
                        let value = arg.evaluate_in(generation);
                        value * value
                    })
                    .sum::<f64>()
                    .sqrt(),
            },
            NodeKind::Conditional(op, condition, first, second) => {
                if op.selects_first(condition.evaluate_in(generation)) {
                    first.evaluate_in(generation)
                } else {
                    second.evaluate_in(generation)
                }
            }
            NodeKind::Tabulated(table, arg) => table.interpolate(arg.evaluate_in(generation)),
            NodeKind::Implicit(solve) => evaluate_implicit(solve, generation),
        }
    }
}
