/// bracket doubling, bisection and a secant step for the root of a monotone predicate
pub mod binary_search;
/// gradient descent with bounds on variables
/// Example#
/// ```
/// use RustedExprDAG::numerical::gradient_search::GradientSearch;
/// use RustedExprDAG::symbolic::symbolic_engine::Expr;
/// let x = Expr::variable("x", 0.0);
/// let y = Expr::variable("y", 0.0);
/// let objective = (&x - 1.0).square() + (&y + 2.0).square();
/// let mut solver = GradientSearch::new();
/// solver.set_problem(objective, vec![x.clone(), y.clone()], vec![]);
/// solver.set_solver_params(Some("off".to_string()), Some(1e-12), Some(0.5), Some(1e-10), Some(10_000));
/// let result = solver.solve().unwrap();
/// assert!((result[0] - 1.0).abs() < 1e-3 && (result[1] + 2.0).abs() < 1e-3);
/// ```
pub mod gradient_search;
