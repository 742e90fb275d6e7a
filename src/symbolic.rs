#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// # Symbolic engine
/// Expressions are shared, immutable nodes of a DAG. A node is created through the factories
/// of `Expr` (or the overloaded operators), which apply the local simplification rules, so a
/// freshly built expression is already simplified.
///
///# Example#
/// ```
/// use RustedExprDAG::symbolic::symbolic_engine::Expr;
/// let x = Expr::variable("x", 2.0);
/// let y = Expr::variable("y", 3.0);
/// let f = &x.square() * &y + 1.0;
/// assert_eq!(f.to_string(), "x ^ 2 * y + 1");
/// assert_eq!(f.evaluate(), 13.0);
/// // derivatives are expressions too
/// let df_dx = f.derivative(&x);
/// assert_eq!(df_dx.evaluate(), 12.0);
/// // values of variables can change, the graph stays
/// x.set_value(1.0);
/// assert_eq!(f.evaluate(), 4.0);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
/// generation cache: every node is computed at most once per evaluation pass
pub mod symbolic_cache;
pub mod symbolic_engine_derivatives;
/// local rewrite rules, whole graph simplification, sharing of identical subexpressions
pub mod symbolic_simplify;
pub mod symbolic_substitute;
///________________________________________________________________________________________________________________________________________________
///
/// Implicit function node: the root of an expression in a bound variable
/// Example#
/// ```
/// use RustedExprDAG::symbolic::symbolic_engine::Expr;
/// let a = Expr::variable("a", 9.0);
/// let t = Expr::variable("t", 0.0);
/// // t(a) such that a - t^2 = 0
/// let root = Expr::binary_search(&(&a - &t.square()), &t, 0.0, 1.0, 1e-12, None);
/// assert!((root.evaluate() - 3.0).abs() < 1e-9);
/// // dt/da = 1 / (2 t)
/// let slope = root.derivative(&a);
/// assert!((slope.evaluate() - 1.0 / 6.0).abs() < 1e-6);
/// ```
pub mod symbolic_implicit;
/// cosine and sine integrals Ci, Si
pub mod special_functions;
/// tabulated function of one argument
pub mod function_by_points;
/// 2D/3D points and matrices made of expressions
pub mod symbolic_vectors;
/// complex numbers made of expressions
pub mod symbolic_complex;
pub mod symbolic_errors;
