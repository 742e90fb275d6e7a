//! # Constrained gradient search
//!
//! One step moves the active variables along the negative gradient of a criterion, so that
//! the linearized decrease of the criterion equals `max(absolute_step, relative_step * |value|)`.
//! Variables may be bounded by `VariableLimitation`s: a variable that would cross its limit
//! is placed exactly on it, taken out of the step, and the step is recomputed for the
//! remaining ones.
//!
//! `GradientSearch` repeats such steps until the criterion settles.
//!
//! # Example
//! ```
//! use RustedExprDAG::numerical::gradient_search::{GradientSearch, VariableLimitation};
//! use RustedExprDAG::symbolic::symbolic_engine::Expr;
//! let x = Expr::variable("x", 0.0);
//! let objective = (&x - 5.0).square();
//! let mut solver = GradientSearch::new();
//! solver.set_problem(objective, vec![x.clone()], vec![VariableLimitation::upper(&x, 3.0)]);
//! solver.set_solver_params(Some("off".to_string()), None, None, Some(1e-9), None);
//! let result = solver.solve().unwrap();
//! assert_eq!(result[0], 3.0);
//! ```
use crate::Utils::logger::init_logger;
use crate::symbolic::symbolic_cache::{Generation, next_generation};
use crate::symbolic::symbolic_engine::Expr;
use log::{debug, info, warn};
use std::collections::HashMap;
use tabled::{builder::Builder, settings::Style};

/// Bound on one variable: with `sign` = +1 the variable may not exceed `limit`,
/// with `sign` = -1 it may not fall below it
#[derive(Debug, Clone)]
pub struct VariableLimitation {
    pub variable: Expr,
    pub limit: f64,
    pub sign: f64,
}

impl VariableLimitation {
    pub fn new(variable: &Expr, limit: f64, sign: f64) -> Self {
        assert!(variable.is_variable(), "only a Variable can be limited, got {}", variable);
        assert!(sign == 1.0 || sign == -1.0, "sign of a limitation must be +1 or -1");
        Self {
            variable: variable.clone(),
            limit,
            sign,
        }
    }

    /// variable <= limit
    pub fn upper(variable: &Expr, limit: f64) -> Self {
        Self::new(variable, limit, 1.0)
    }

    /// variable >= limit
    pub fn lower(variable: &Expr, limit: f64) -> Self {
        Self::new(variable, limit, -1.0)
    }

    /// whether moving the variable by `diff` would violate the limitation
    pub fn is_exceeded(&self, diff: f64) -> bool {
        (self.variable.value() + diff - self.limit) * self.sign > 0.0
    }

    /// move that puts the variable exactly on the limit
    pub fn get_diff(&self) -> f64 {
        self.limit - self.variable.value()
    }
}

/// Criterion value together with its partial derivatives, one per variable
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    pub value: f64,
    pub derivatives: Vec<f64>,
}

/// One constrained step. The evaluator is called once per (re)computation of the direction,
/// at the current values of the variables.
///
/// Returns false if the gradient over the active variables vanishes (nothing is moved);
/// true otherwise, including the case where every variable ended up frozen on its limit.
pub fn step<E>(
    mut criteria_evaluator: E,
    variables: &[Expr],
    limitations: &[VariableLimitation],
    absolute_step: f64,
    relative_step: f64,
) -> bool
where
    E: FnMut() -> EvalResult,
{
    let index_of: HashMap<u64, usize> = variables
        .iter()
        .enumerate()
        .map(|(index, variable)| (variable.id(), index))
        .collect();
    let mut active = vec![true; variables.len()];
    let mut active_count = variables.len();
    loop {
        let criteria = criteria_evaluator();
        assert_eq!(
            criteria.derivatives.len(),
            variables.len(),
            "one derivative per variable expected"
        );
        let step_vector: Vec<f64> = criteria
            .derivatives
            .iter()
            .zip(&active)
            .map(|(derivative, &is_active)| if is_active { -derivative } else { 0.0 })
            .collect();
        let scale: f64 = criteria
            .derivatives
            .iter()
            .zip(&step_vector)
            .zip(&active)
            .filter(|(_, is_active)| **is_active)
            .map(|((derivative, direction), _)| derivative * direction)
            .sum();
        if scale == 0.0 {
            warn!("gradient search: zero gradient over the active variables, no step made");
            return false;
        }
        let step = absolute_step.max(relative_step * criteria.value.abs());
        let mut step_coeff = step / scale.abs();

        let mut failed: Option<(&VariableLimitation, usize)> = None;
        for limitation in limitations {
            let Some(&index) = index_of.get(&limitation.variable.id()) else {
                continue;
            };
            if active[index] {
                let variable_step = step_vector[index];
                if limitation.is_exceeded(variable_step * step_coeff) {
                    step_coeff = limitation.get_diff() / variable_step;
                    failed = Some((limitation, index));
                }
            }
        }

        if let Some((limitation, index)) = failed {
            limitation.variable.set_value(limitation.limit);
            active[index] = false;
            active_count -= 1;
            debug!(
                "gradient search: {} frozen at its limit {}",
                limitation.variable, limitation.limit
            );
            if active_count == 0 {
                return true;
            }
            continue;
        }

        for ((variable, direction), is_active) in variables.iter().zip(&step_vector).zip(&active) {
            if *is_active {
                variable.set_value(variable.value() + direction * step_coeff);
            }
        }
        return true;
    }
}

/// `step` for a criterion given as a graph. The partial derivatives are built once; each
/// evaluation uses one generation for the criterion and all its derivatives, then moves on
/// to a fresh one. Starts with `generation` if given.
pub fn step_expr(
    criteria: &Expr,
    variables: &[Expr],
    limitations: &[VariableLimitation],
    absolute_step: f64,
    relative_step: f64,
    generation: Option<Generation>,
) -> bool {
    let derivatives = criteria.derivatives(variables);
    let mut generation = generation.unwrap_or_else(next_generation);
    step(
        || {
            let result = EvalResult {
                value: criteria.evaluate_in(generation),
                derivatives: derivatives
                    .iter()
                    .map(|derivative| derivative.evaluate_in(generation))
                    .collect(),
            };
            generation = next_generation();
            result
        },
        variables,
        limitations,
        absolute_step,
        relative_step,
    )
}

/// Iterative driver over `step_expr`
pub struct GradientSearch {
    pub objective: Option<Expr>,
    pub variables: Vec<Expr>,
    pub limitations: Vec<VariableLimitation>,
    pub absolute_step: f64,
    pub relative_step: f64,
    /// stop when the objective changes by less than this
    pub tolerance: f64,
    pub max_iterations: usize,
    pub loglevel: Option<String>,
    pub i: usize,
    result: Option<Vec<f64>>,
    calc_statistics: HashMap<String, usize>,
}

impl Default for GradientSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl GradientSearch {
    pub fn new() -> GradientSearch {
        GradientSearch {
            objective: None,
            variables: Vec::new(),
            limitations: Vec::new(),
            absolute_step: 1e-6,
            relative_step: 0.1,
            tolerance: 1e-6,
            max_iterations: 1000,
            loglevel: Some("info".to_string()),
            i: 0,
            result: None,
            calc_statistics: HashMap::new(),
        }
    }

    ////////////////////////////SETTERS///////////////////////////////////////
    pub fn set_problem(
        &mut self,
        objective: Expr,
        variables: Vec<Expr>,
        limitations: Vec<VariableLimitation>,
    ) {
        assert!(
            variables.iter().all(Expr::is_variable),
            "gradient search variables must be Variable nodes"
        );
        self.objective = Some(objective);
        self.variables = variables;
        self.limitations = limitations;
    }

    pub fn set_solver_params(
        &mut self,
        loglevel: Option<String>,
        absolute_step: Option<f64>,
        relative_step: Option<f64>,
        tolerance: Option<f64>,
        max_iterations: Option<usize>,
    ) {
        if let Some(level) = loglevel {
            assert!(
                ["debug", "info", "warn", "error", "off", "none"].contains(&level.as_str()),
                "loglevel must be debug, info, warn, error, off or none"
            );
            self.loglevel = Some(level);
        }
        if let Some(absolute_step) = absolute_step {
            assert!(absolute_step > 0.0, "absolute step must be positive");
            self.absolute_step = absolute_step;
        }
        if let Some(relative_step) = relative_step {
            assert!(relative_step >= 0.0, "relative step must be non-negative");
            self.relative_step = relative_step;
        }
        if let Some(tolerance) = tolerance {
            assert!(tolerance > 0.0, "tolerance must be positive");
            self.tolerance = tolerance;
        }
        if let Some(max_iterations) = max_iterations {
            self.max_iterations = max_iterations;
        }
    }

    fn current_values(&self) -> Vec<f64> {
        self.variables.iter().map(Expr::value).collect()
    }

    /// Steps until the objective settles. Returns the variable values on convergence or
    /// when the gradient vanishes, `None` when the iteration budget runs out.
    pub fn main_loop(&mut self) -> Option<Vec<f64>> {
        let Some(objective) = self.objective.clone() else {
            panic!("objective is not set, call set_problem first");
        };
        let mut previous = objective.evaluate();
        self.i = 0;
        let mut frozen_steps = 0;
        while self.i < self.max_iterations {
            let moved = step_expr(
                &objective,
                &self.variables,
                &self.limitations,
                self.absolute_step,
                self.relative_step,
                None,
            );
            self.i += 1;
            if !moved {
                frozen_steps += 1;
                self.calc_statistics
                    .insert("steps with zero gradient".to_string(), frozen_steps);
                self.result = Some(self.current_values());
                return self.result.clone();
            }
            let value = objective.evaluate();
            let change = (previous - value).abs();
            info!("iteration = {}, objective = {}, change = {}", self.i, value, change);
            if change < self.tolerance {
                self.result = Some(self.current_values());
                return self.result.clone();
            }
            previous = value;
        }
        warn!("Maximum number of iterations reached, objective has not settled.");
        None
    }

    /// `main_loop` with logging set up from `loglevel` and statistics reported at the end
    pub fn solve(&mut self) -> Option<Vec<f64>> {
        init_logger(self.loglevel.as_deref());
        let res = self.main_loop();
        self.calc_statistics();
        self.result = res;
        self.result.clone()
    }

    pub fn get_result(&self) -> Option<Vec<f64>> {
        self.result.clone()
    }

    fn calc_statistics(&self) {
        let mut stats = self.calc_statistics.clone();
        stats.insert("number of iterations".to_string(), self.i);
        stats.insert("number of variables".to_string(), self.variables.len());
        stats.insert("number of limitations".to_string(), self.limitations.len());
        let on_limit = self
            .limitations
            .iter()
            .filter(|limitation| limitation.variable.value() == limitation.limit)
            .count();
        stats.insert("variables on their limits".to_string(), on_limit);
        let mut table = Builder::from(stats).build();
        table.with(Style::modern_rounded());
        info!("\n \n CALC STATISTICS \n \n {}", table);
    }
}
