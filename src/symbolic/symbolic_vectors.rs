//! Points and matrices whose components are expression nodes.
//!
//! Each composite evaluates all of its components with one generation, so subexpressions
//! shared between the components are computed once. Numeric results are nalgebra values.
use crate::symbolic::function_by_points::FunctionByPoints;
use crate::symbolic::symbolic_cache::{Generation, next_generation};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::ExprError;
use nalgebra::{DMatrix, Vector2, Vector3};
use std::collections::HashMap;
use std::ops::{Add, Div, Index, IndexMut, Mul, Neg, Sub};

///////////////////////////////////////////////////////////////////////////
///                          2D POINT
///////////////////////////////////////////////////////////////////////////
#[derive(Clone, Debug, PartialEq)]
pub struct Point2DExpr {
    pub x: Expr,
    pub y: Expr,
}

impl Point2DExpr {
    pub fn new(x: Expr, y: Expr) -> Self {
        Self { x, y }
    }

    pub fn from_point(point: &Vector2<f64>) -> Self {
        Self::new(Expr::constant(point.x), Expr::constant(point.y))
    }

    pub fn length(&self) -> Expr {
        Expr::hypot([self.x.clone(), self.y.clone()])
    }

    pub fn evaluate(&self) -> Vector2<f64> {
        let generation = next_generation();
        Vector2::new(
            self.x.evaluate_in(generation),
            self.y.evaluate_in(generation),
        )
    }

    pub fn derivative(&self, variable: &Expr) -> Point2DExpr {
        Point2DExpr::new(self.x.derivative(variable), self.y.derivative(variable))
    }

    pub fn simplify(&self) -> Point2DExpr {
        Point2DExpr::new(self.x.simplify(), self.y.simplify())
    }
}

impl Add for Point2DExpr {
    type Output = Point2DExpr;
    fn add(self, rhs: Point2DExpr) -> Point2DExpr {
        Point2DExpr::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2DExpr {
    type Output = Point2DExpr;
    fn sub(self, rhs: Point2DExpr) -> Point2DExpr {
        Point2DExpr::new(self.x - rhs.x, self.y - rhs.y)
    }
}

///////////////////////////////////////////////////////////////////////////
///                          3D POINT
///////////////////////////////////////////////////////////////////////////
#[derive(Clone, Debug, PartialEq)]
pub struct Point3DExpr {
    pub x: Expr,
    pub y: Expr,
    pub z: Expr,
}

/// Decomposition of a point against a unit normal
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionToNormal {
    /// component along the normal
    pub vertical: Point3DExpr,
    /// component orthogonal to the normal
    pub horizontal: Point3DExpr,
}

impl ProjectionToNormal {
    pub fn full(&self) -> Point3DExpr {
        &self.vertical + &self.horizontal
    }
}

impl Point3DExpr {
    pub fn new(x: Expr, y: Expr, z: Expr) -> Self {
        Self { x, y, z }
    }

    pub fn from_point(point: &Vector3<f64>) -> Self {
        Self::new(
            Expr::constant(point.x),
            Expr::constant(point.y),
            Expr::constant(point.z),
        )
    }

    pub fn components(&self) -> [&Expr; 3] {
        [&self.x, &self.y, &self.z]
    }

    pub fn square_length(&self) -> Expr {
        Expr::sum([self.x.square(), self.y.square(), self.z.square()])
    }

    pub fn length(&self) -> Expr {
        Expr::hypot([self.x.clone(), self.y.clone(), self.z.clone()])
    }

    /// unit vector of the same direction; the zero vector stays zero (safe division)
    pub fn normal(&self) -> Point3DExpr {
        self / &self.length()
    }

    pub fn coalesce(
        condition: &Expr,
        value_if_zero: &Point3DExpr,
        value_if_nonzero: &Point3DExpr,
    ) -> Point3DExpr {
        Point3DExpr::new(
            Expr::coalesce(condition, &value_if_zero.x, &value_if_nonzero.x),
            Expr::coalesce(condition, &value_if_zero.y, &value_if_nonzero.y),
            Expr::coalesce(condition, &value_if_zero.z, &value_if_nonzero.z),
        )
    }

    /// applies `f` to each component
    pub fn map<F>(&self, mut f: F) -> Point3DExpr
    where
        F: FnMut(&Expr) -> Expr,
    {
        Point3DExpr::new(f(&self.x), f(&self.y), f(&self.z))
    }

    /// applies a numeric `f` to each component
    pub fn map_values<F>(&self, mut f: F) -> Vector3<f64>
    where
        F: FnMut(&Expr) -> f64,
    {
        Vector3::new(f(&self.x), f(&self.y), f(&self.z))
    }

    pub fn evaluate(&self) -> Vector3<f64> {
        self.evaluate_in(next_generation())
    }

    pub fn evaluate_in(&self, generation: Generation) -> Vector3<f64> {
        self.map_values(|component| component.evaluate_in(generation))
    }

    pub fn evaluate_vars(&self, excluded: &[Expr]) -> Point3DExpr {
        self.map(|component| component.evaluate_vars(excluded))
    }

    pub fn substitute_variables(&self, substitutions: &[(Expr, Expr)]) -> Point3DExpr {
        self.map(|component| component.substitute_variables(substitutions))
    }

    pub fn simplify(&self) -> Point3DExpr {
        self.map(Expr::simplify)
    }

    pub fn derivative(&self, variable: &Expr) -> Point3DExpr {
        self.map(|component| component.derivative(variable))
    }

    /// merges identical subexpressions across all three components
    pub fn share_common_subexpressions(&self) -> Point3DExpr {
        let mut seen = HashMap::new();
        self.map(|component| component.share_common_subexpressions_with(&mut seen))
    }

    pub fn set_alias(&self, alias: &str) {
        self.x.set_alias(Some(&format!("{}.X", alias)));
        self.y.set_alias(Some(&format!("{}.Y", alias)));
        self.z.set_alias(Some(&format!("{}.Z", alias)));
    }

    /// dot product
    pub fn scalar_mult(p1: &Point3DExpr, p2: &Point3DExpr) -> Expr {
        Expr::sum([&p1.x * &p2.x, &p1.y * &p2.y, &p1.z * &p2.z])
    }

    /// cross product
    pub fn vector_mult(p1: &Point3DExpr, p2: &Point3DExpr) -> Point3DExpr {
        Point3DExpr::new(
            &p1.y * &p2.z - &p1.z * &p2.y,
            &p1.z * &p2.x - &p1.x * &p2.z,
            &p1.x * &p2.y - &p1.y * &p2.x,
        )
    }

    pub fn projection_to_normal_length(&self, normal: &Point3DExpr) -> Expr {
        Point3DExpr::scalar_mult(self, normal)
    }

    /// splits the point into parts along and across a unit `normal`
    pub fn project_to_normal_vector(&self, normal: &Point3DExpr) -> ProjectionToNormal {
        let vertical = &self.projection_to_normal_length(normal) * normal;
        let horizontal = self - &vertical;
        ProjectionToNormal {
            vertical,
            horizontal,
        }
    }

    /// Turns the point by |angle| around the axis of `angle`, clockwise when seen from the
    /// tip of the axis. A zero angle vector leaves the point unchanged.
    pub fn rotate_by_angle_3d(&self, angle: &Point3DExpr) -> Point3DExpr {
        let direction = angle.normal();
        let projection = self.project_to_normal_vector(&direction);
        let angle_length = angle.length();
        &(&projection.vertical + &(&projection.horizontal * &angle_length.cos()))
            + &(&Point3DExpr::vector_mult(self, &direction) * &angle_length.sin())
    }

    pub fn to_horizontal_matrix(&self) -> ExprMatrix {
        ExprMatrix::new(vec![vec![self.x.clone(), self.y.clone(), self.z.clone()]])
    }

    pub fn to_vertical_matrix(&self) -> ExprMatrix {
        ExprMatrix::new(vec![
            vec![self.x.clone()],
            vec![self.y.clone()],
            vec![self.z.clone()],
        ])
    }

    /// 3-D curve tabulated on a uniform grid of `arg`, one tabulated function per axis
    pub fn function_by_points(
        name: &str,
        arg: &Expr,
        values: &[Vector3<f64>],
        min: f64,
        step: f64,
        derivative: Option<&Point3DExpr>,
    ) -> Point3DExpr {
        let axis = |suffix: &str, pick: fn(&Vector3<f64>) -> f64, d: Option<&Expr>| {
            let table = FunctionByPoints::new(
                &format!("{}{}", name, suffix),
                values.iter().map(pick).collect(),
                min,
                step,
                d.cloned(),
            );
            Expr::function_by_points(table, arg)
        };
        Point3DExpr::new(
            axis("X", |v| v.x, derivative.map(|d| &d.x)),
            axis("Y", |v| v.y, derivative.map(|d| &d.y)),
            axis("Z", |v| v.z, derivative.map(|d| &d.z)),
        )
    }
}

impl Expr {
    /// gradient with respect to the three variables of a point
    pub fn derivative_by_point(&self, point: &Point3DVariable) -> Point3DExpr {
        Point3DExpr::new(
            self.derivative(&point.x),
            self.derivative(&point.y),
            self.derivative(&point.z),
        )
    }
}

macro_rules! impl_point_componentwise {
    ($trait:ident, $method:ident) => {
        impl $trait<&Point3DExpr> for &Point3DExpr {
            type Output = Point3DExpr;
            fn $method(self, rhs: &Point3DExpr) -> Point3DExpr {
                Point3DExpr::new(
                    (&self.x).$method(&rhs.x),
                    (&self.y).$method(&rhs.y),
                    (&self.z).$method(&rhs.z),
                )
            }
        }
        impl $trait for Point3DExpr {
            type Output = Point3DExpr;
            fn $method(self, rhs: Point3DExpr) -> Point3DExpr {
                (&self).$method(&rhs)
            }
        }
    };
}

impl_point_componentwise!(Add, add);
impl_point_componentwise!(Sub, sub);

impl Neg for &Point3DExpr {
    type Output = Point3DExpr;
    fn neg(self) -> Point3DExpr {
        self.map(Expr::invert)
    }
}

impl Neg for Point3DExpr {
    type Output = Point3DExpr;
    fn neg(self) -> Point3DExpr {
        -&self
    }
}

impl Mul<&Expr> for &Point3DExpr {
    type Output = Point3DExpr;
    fn mul(self, k: &Expr) -> Point3DExpr {
        self.map(|component| component * k)
    }
}

impl Mul<Expr> for Point3DExpr {
    type Output = Point3DExpr;
    fn mul(self, k: Expr) -> Point3DExpr {
        &self * &k
    }
}

impl Mul<&Point3DExpr> for &Expr {
    type Output = Point3DExpr;
    fn mul(self, p: &Point3DExpr) -> Point3DExpr {
        p.map(|component| self * component)
    }
}

impl Mul<Point3DExpr> for Expr {
    type Output = Point3DExpr;
    fn mul(self, p: Point3DExpr) -> Point3DExpr {
        &self * &p
    }
}

impl Div<&Expr> for &Point3DExpr {
    type Output = Point3DExpr;
    fn div(self, k: &Expr) -> Point3DExpr {
        self.map(|component| component / k)
    }
}

impl Div<Expr> for Point3DExpr {
    type Output = Point3DExpr;
    fn div(self, k: Expr) -> Point3DExpr {
        &self / &k
    }
}

impl From<&Vector3<f64>> for Point3DExpr {
    fn from(point: &Vector3<f64>) -> Self {
        Point3DExpr::from_point(point)
    }
}

///////////////////////////////////////////////////////////////////////////
//                           3D VARIABLE
///////////////////////////////////////////////////////////////////////////
/// Three `Variable` nodes forming a point
#[derive(Clone, Debug, PartialEq)]
pub struct Point3DVariable {
    pub x: Expr,
    pub y: Expr,
    pub z: Expr,
}

impl Point3DVariable {
    /// variables named `name` + "x"/"y"/"z", holding `point`
    pub fn new(point: &Vector3<f64>, name: &str) -> Self {
        Self::with_axis_names(point, name, ["x", "y", "z"])
    }

    pub fn with_axis_names(point: &Vector3<f64>, name: &str, axis_names: [&str; 3]) -> Self {
        Self {
            x: Expr::variable(&format!("{}{}", name, axis_names[0]), point.x),
            y: Expr::variable(&format!("{}{}", name, axis_names[1]), point.y),
            z: Expr::variable(&format!("{}{}", name, axis_names[2]), point.z),
        }
    }

    pub fn variables(&self) -> [Expr; 3] {
        [self.x.clone(), self.y.clone(), self.z.clone()]
    }

    pub fn update(&self, point: &Vector3<f64>) {
        self.x.set_value(point.x);
        self.y.set_value(point.y);
        self.z.set_value(point.z);
    }

    pub fn evaluate(&self) -> Vector3<f64> {
        Vector3::new(self.x.value(), self.y.value(), self.z.value())
    }

    pub fn evaluate_vars(&self, excluded: &[Expr]) -> Point3DExpr {
        self.to_expr().evaluate_vars(excluded)
    }

    pub fn to_expr(&self) -> Point3DExpr {
        Point3DExpr::new(self.x.clone(), self.y.clone(), self.z.clone())
    }
}

impl From<&Point3DVariable> for Point3DExpr {
    fn from(point: &Point3DVariable) -> Self {
        point.to_expr()
    }
}

impl TryFrom<Point3DExpr> for Point3DVariable {
    type Error = ExprError;
    fn try_from(point: Point3DExpr) -> Result<Self, Self::Error> {
        for component in point.components() {
            if !component.is_variable() {
                return Err(ExprError::NotAVariable(component.to_string()));
            }
        }
        Ok(Point3DVariable {
            x: point.x,
            y: point.y,
            z: point.z,
        })
    }
}

///////////////////////////////////////////////////////////////////////////
///                          MATRIX
///////////////////////////////////////////////////////////////////////////
#[derive(Clone, Debug, PartialEq)]
pub struct ExprMatrix {
    pub data: Vec<Vec<Expr>>,
    pub nrows: usize,
    pub ncols: usize,
}

impl ExprMatrix {
    /// # Panics
    /// Panics if the rows have different lengths
    pub fn new(data: Vec<Vec<Expr>>) -> Self {
        let nrows = data.len();
        let ncols = data.first().map_or(0, Vec::len);
        for row in &data {
            assert_eq!(row.len(), ncols, "All rows must have the same length");
        }
        Self { data, nrows, ncols }
    }

    /// 3x3 matrix from its rows
    #[allow(clippy::too_many_arguments)]
    pub fn from_3x3(
        a11: Expr,
        a12: Expr,
        a13: Expr,
        a21: Expr,
        a22: Expr,
        a23: Expr,
        a31: Expr,
        a32: Expr,
        a33: Expr,
    ) -> Self {
        Self::new(vec![vec![a11, a12, a13], vec![a21, a22, a23], vec![a31, a32, a33]])
    }

    pub fn from_values(values: &DMatrix<f64>) -> Self {
        Self::new(
            values
                .row_iter()
                .map(|row| row.iter().map(|&v| Expr::constant(v)).collect())
                .collect(),
        )
    }

    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::new(vec![vec![Expr::zero(); ncols]; nrows])
    }

    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zeros(size, size);
        for i in 0..size {
            matrix.data[i][i] = Expr::one();
        }
        matrix
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    //___________________________________ROTATIONS____________________________________
    // each turns the first named axis towards the second one

    fn rotation(angle: &Expr, layout: [[i8; 3]; 3]) -> Self {
        let cos = angle.cos();
        let sin = angle.sin();
        let minus_sin = sin.invert();
        // 0: zero, 1: one, 2: cos, 3: sin, -3: -sin
        let pick = |code: i8| match code {
            1 => Expr::one(),
            2 => cos.clone(),
            3 => sin.clone(),
            -3 => minus_sin.clone(),
            _ => Expr::zero(),
        };
        Self::new(
            layout
                .iter()
                .map(|row| row.iter().map(|&code| pick(code)).collect())
                .collect(),
        )
    }

    pub fn rotate_x_to_y(angle: &Expr) -> Self {
        Self::rotation(angle, [[2, -3, 0], [3, 2, 0], [0, 0, 1]])
    }

    pub fn rotate_y_to_x(angle: &Expr) -> Self {
        Self::rotation(angle, [[2, 3, 0], [-3, 2, 0], [0, 0, 1]])
    }

    pub fn rotate_y_to_z(angle: &Expr) -> Self {
        Self::rotation(angle, [[1, 0, 0], [0, 2, -3], [0, 3, 2]])
    }

    pub fn rotate_z_to_y(angle: &Expr) -> Self {
        Self::rotation(angle, [[1, 0, 0], [0, 2, 3], [0, -3, 2]])
    }

    pub fn rotate_x_to_z(angle: &Expr) -> Self {
        Self::rotation(angle, [[2, 0, -3], [0, 1, 0], [3, 0, 2]])
    }

    pub fn rotate_z_to_x(angle: &Expr) -> Self {
        Self::rotation(angle, [[2, 0, 3], [0, 1, 0], [-3, 0, 2]])
    }

    //___________________________________QUERIES____________________________________

    /// Evaluates all elements with one generation (a fresh one if `None`)
    pub fn evaluate(&self, generation: Option<Generation>) -> DMatrix<f64> {
        let generation = generation.unwrap_or_else(next_generation);
        DMatrix::from_fn(self.nrows, self.ncols, |i, j| {
            self.data[i][j].evaluate_in(generation)
        })
    }

    pub fn map<F>(&self, mut f: F) -> ExprMatrix
    where
        F: FnMut(&Expr) -> Expr,
    {
        ExprMatrix::new(
            self.data
                .iter()
                .map(|row| row.iter().map(&mut f).collect())
                .collect(),
        )
    }

    pub fn simplify(&self) -> ExprMatrix {
        self.map(Expr::simplify)
    }

    pub fn derivative(&self, variable: &Expr) -> ExprMatrix {
        self.map(|element| element.derivative(variable))
    }

    pub fn substitute_variables(&self, substitutions: &[(Expr, Expr)]) -> ExprMatrix {
        self.map(|element| element.substitute_variables(substitutions))
    }

    pub fn evaluate_vars(&self, excluded: &[Expr]) -> ExprMatrix {
        self.map(|element| element.evaluate_vars(excluded))
    }

    pub fn transpose(&self) -> ExprMatrix {
        ExprMatrix::new(
            (0..self.ncols)
                .map(|j| (0..self.nrows).map(|i| self.data[i][j].clone()).collect())
                .collect(),
        )
    }

    //___________________________________PRODUCTS____________________________________

    pub fn try_mul(&self, other: &ExprMatrix) -> Result<ExprMatrix, ExprError> {
        if self.ncols != other.nrows {
            return Err(ExprError::ShapeMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }
        let data = (0..self.nrows)
            .map(|i| {
                (0..other.ncols)
                    .map(|j| {
                        Expr::sum(
                            (0..self.ncols).map(|k| &self.data[i][k] * &other.data[k][j]),
                        )
                    })
                    .collect()
            })
            .collect();
        Ok(ExprMatrix::new(data))
    }

    /// matrix by column point
    pub fn mul_point(&self, point: &Point3DExpr) -> Point3DExpr {
        (self * &point.to_vertical_matrix()).to_vector()
    }

    pub fn try_to_vector(&self) -> Result<Point3DExpr, ExprError> {
        match self.shape() {
            (3, 1) => Ok(Point3DExpr::new(
                self.data[0][0].clone(),
                self.data[1][0].clone(),
                self.data[2][0].clone(),
            )),
            (1, 3) => Ok(Point3DExpr::new(
                self.data[0][0].clone(),
                self.data[0][1].clone(),
                self.data[0][2].clone(),
            )),
            shape => Err(ExprError::NotAVector { shape }),
        }
    }

    /// # Panics
    /// Panics unless the matrix is 1x3 or 3x1
    pub fn to_vector(&self) -> Point3DExpr {
        self.try_to_vector().unwrap_or_else(|e| panic!("{}", e))
    }

    //___________________________________ALGEBRA____________________________________

    /// matrix without row `row` and column `col`
    pub fn minor(&self, row: usize, col: usize) -> ExprMatrix {
        assert!(self.is_square(), "{}", ExprError::NotSquare { shape: self.shape() });
        assert!(row < self.nrows && col < self.ncols, "Index out of bounds");
        ExprMatrix::new(
            self.data
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != row)
                .map(|(_, r)| {
                    r.iter()
                        .enumerate()
                        .filter(|(j, _)| *j != col)
                        .map(|(_, e)| e.clone())
                        .collect()
                })
                .collect(),
        )
    }

    /// cofactor expansion along the first row
    pub fn determinant(&self) -> Expr {
        assert!(self.is_square(), "{}", ExprError::NotSquare { shape: self.shape() });
        match self.nrows {
            0 => Expr::one(),
            1 => self.data[0][0].clone(),
            n => Expr::sum((0..n).map(|j| {
                let term = &self.data[0][j] * &self.minor(0, j).determinant();
                if j % 2 == 0 { term } else { term.invert() }
            })),
        }
    }

    /// adjugate divided by the determinant
    pub fn try_inverse(&self) -> Result<ExprMatrix, ExprError> {
        if !self.is_square() {
            return Err(ExprError::NotSquare { shape: self.shape() });
        }
        let determinant = self.determinant();
        if determinant.is_constant_value(0.0) {
            return Err(ExprError::SingularMatrix);
        }
        if self.nrows == 1 {
            return Ok(ExprMatrix::new(vec![vec![&Expr::one() / &determinant]]));
        }
        let n = self.nrows;
        let data = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let cofactor = self.minor(j, i).determinant();
                        let cofactor = if (i + j) % 2 == 0 { cofactor } else { cofactor.invert() };
                        &cofactor / &determinant
                    })
                    .collect()
            })
            .collect();
        Ok(ExprMatrix::new(data))
    }

    /// # Panics
    /// Panics if the matrix is not square or its determinant is the constant 0
    pub fn inverse(&self) -> ExprMatrix {
        self.try_inverse().unwrap_or_else(|e| panic!("{}", e))
    }
}

impl Index<(usize, usize)> for ExprMatrix {
    type Output = Expr;
    fn index(&self, (i, j): (usize, usize)) -> &Expr {
        &self.data[i][j]
    }
}

impl IndexMut<(usize, usize)> for ExprMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Expr {
        &mut self.data[i][j]
    }
}

impl Mul<&ExprMatrix> for &ExprMatrix {
    type Output = ExprMatrix;
    /// # Panics
    /// Panics if the number of columns of the left matrix differs from the rows of the right
    fn mul(self, other: &ExprMatrix) -> ExprMatrix {
        self.try_mul(other).unwrap_or_else(|e| panic!("{}", e))
    }
}

impl Mul for ExprMatrix {
    type Output = ExprMatrix;
    fn mul(self, other: ExprMatrix) -> ExprMatrix {
        &self * &other
    }
}

impl Mul<&Point3DExpr> for &ExprMatrix {
    type Output = Point3DExpr;
    fn mul(self, point: &Point3DExpr) -> Point3DExpr {
        self.mul_point(point)
    }
}

impl Mul<Point3DExpr> for ExprMatrix {
    type Output = Point3DExpr;
    fn mul(self, point: Point3DExpr) -> Point3DExpr {
        self.mul_point(&point)
    }
}

#[cfg(test)]
mod tests_points {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_point_products_and_length() {
        let a = Point3DExpr::from_point(&Vector3::new(1.0, 2.0, 2.0));
        let t = Expr::variable("t", 2.0);
        let b = Point3DExpr::new(t.clone(), Expr::zero(), Expr::one());
        assert_relative_eq!(a.length().evaluate(), 3.0);
        assert_relative_eq!(a.square_length().evaluate(), 9.0);
        assert_relative_eq!(Point3DExpr::scalar_mult(&a, &b).evaluate(), 4.0);
        let cross = Point3DExpr::vector_mult(&a, &b).evaluate();
        assert_relative_eq!(cross, Vector3::new(2.0, 3.0, -4.0));
        let n = a.normal().evaluate();
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_point_alias_skips_shared_constants() {
        let t = Expr::variable("t", 2.0);
        let b = Point3DExpr::new(t.clone(), Expr::zero(), Expr::one());
        b.set_alias("B");
        assert_eq!(t.alias().as_deref(), Some("B.X"));
        assert_eq!(b.y.alias(), None);
        assert_eq!(b.z.alias(), None);
        assert_eq!((&t + 1.0).render(1), "B.X + 1");
    }

    #[test]
    fn test_projection_to_normal() {
        let p = Point3DExpr::from_point(&Vector3::new(1.0, 2.0, 3.0));
        let normal = Point3DExpr::from_point(&Vector3::new(0.0, 0.0, 1.0));
        let projection = p.project_to_normal_vector(&normal);
        assert_relative_eq!(projection.vertical.evaluate(), Vector3::new(0.0, 0.0, 3.0));
        assert_relative_eq!(projection.horizontal.evaluate(), Vector3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(projection.full().evaluate(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_rotation_by_angle_vector() {
        let p = Point3DExpr::from_point(&Vector3::new(1.0, 0.0, 0.0));
        let angle = Expr::variable("a", FRAC_PI_2);
        let rotated = p.rotate_by_angle_3d(&Point3DExpr::new(Expr::zero(), Expr::zero(), angle.clone()));
        assert_relative_eq!(rotated.evaluate(), Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
        // a zero angle keeps the point
        angle.set_value(0.0);
        assert_relative_eq!(rotated.evaluate(), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_gradient_by_point_variable() {
        let p = Point3DVariable::new(&Vector3::new(1.0, 2.0, 3.0), "p");
        assert_eq!(p.x.name(), Some("px"));
        let f = p.to_expr().square_length();
        let gradient = f.derivative_by_point(&p);
        assert_relative_eq!(gradient.evaluate(), Vector3::new(2.0, 4.0, 6.0));
        p.update(&Vector3::new(-1.0, 0.0, 0.5));
        assert_relative_eq!(gradient.evaluate(), Vector3::new(-2.0, 0.0, 1.0));
        assert_relative_eq!(p.evaluate(), Vector3::new(-1.0, 0.0, 0.5));
        let frozen = p.evaluate_vars(&[p.y.clone()]);
        assert!(frozen.x.is_constant());
        assert!(frozen.y.is_variable());
    }

    #[test]
    fn test_point_variable_conversion() {
        let p = Point3DVariable::new(&Vector3::zeros(), "");
        let back = Point3DVariable::try_from(Point3DExpr::from(&p)).expect("all components are variables");
        assert_eq!(back, p);
        let mixed = Point3DExpr::new(p.x.clone(), p.y.clone(), Expr::one());
        assert_eq!(
            Point3DVariable::try_from(mixed),
            Err(ExprError::NotAVariable("1".to_string()))
        );
    }

    #[test]
    fn test_point_coalesce_and_sharing() {
        let c = Expr::variable("c", 0.0);
        let a = Point3DExpr::from_point(&Vector3::new(1.0, 1.0, 1.0));
        let b = Point3DExpr::from_point(&Vector3::new(2.0, 2.0, 2.0));
        let chosen = Point3DExpr::coalesce(&c, &a, &b);
        assert_relative_eq!(chosen.evaluate(), Vector3::new(1.0, 1.0, 1.0));
        c.set_value(3.0);
        assert_relative_eq!(chosen.evaluate(), Vector3::new(2.0, 2.0, 2.0));

        let x = Expr::variable("x", 0.5);
        let p = Point3DExpr::new(x.sin() * 2.0, x.sin() * 3.0, x.sin().square());
        let shared = p.share_common_subexpressions();
        assert_eq!(shared.evaluate(), p.evaluate());
        let sin_in_x = shared.x.children()[1].clone();
        let sin_in_y = shared.y.children()[1].clone();
        assert_eq!(sin_in_x, sin_in_y);
    }

    #[test]
    fn test_tabulated_curve() {
        let t = Expr::variable("t", 0.5);
        let values = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(2.0, 4.0, 6.0)];
        let curve = Point3DExpr::function_by_points("c", &t, &values, 0.0, 1.0, None);
        assert_eq!(curve.x.to_string(), "cX(t)");
        assert_relative_eq!(curve.evaluate(), Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(curve.derivative(&t).evaluate(), Vector3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_point2d() {
        let x = Expr::variable("x", 3.0);
        let p = Point2DExpr::new(x.clone(), Expr::constant(4.0));
        assert_relative_eq!(p.length().evaluate(), 5.0);
        let q = p.clone() + Point2DExpr::from_point(&Vector2::new(1.0, 1.0));
        assert_relative_eq!(q.evaluate(), Vector2::new(4.0, 5.0));
        assert_relative_eq!(p.derivative(&x).evaluate(), Vector2::new(1.0, 0.0));
    }
}

#[cfg(test)]
mod tests_exprmatrix {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_matrix_multiplication() {
        let a = Expr::variable("a", 1.0);
        let b = Expr::variable("b", 2.0);
        let m1 = ExprMatrix::new(vec![
            vec![a.clone(), b.clone()],
            vec![Expr::constant(3.0), Expr::constant(4.0)],
        ]);
        let m2 = ExprMatrix::identity(2);
        let product = &m1 * &m2;
        assert_eq!(product.shape(), (2, 2));
        assert_relative_eq!(
            product.evaluate(None),
            DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0])
        );
        let wrong = ExprMatrix::zeros(3, 1);
        assert_eq!(
            m1.try_mul(&wrong),
            Err(ExprError::ShapeMismatch {
                left: (2, 2),
                right: (3, 1)
            })
        );
    }

    #[test]
    #[should_panic(expected = "invalid sizes")]
    fn test_matrix_multiplication_shape_panics() {
        let _ = ExprMatrix::zeros(2, 3) * ExprMatrix::zeros(2, 3);
    }

    #[test]
    fn test_rotation_matrices() {
        let angle = Expr::constant(FRAC_PI_2);
        let e_x = Point3DExpr::from_point(&Vector3::new(1.0, 0.0, 0.0));
        let e_y = Point3DExpr::from_point(&Vector3::new(0.0, 1.0, 0.0));
        let e_z = Point3DExpr::from_point(&Vector3::new(0.0, 0.0, 1.0));
        let close = |p: Point3DExpr, expected: Vector3<f64>| {
            assert_relative_eq!(p.evaluate(), expected, epsilon = 1e-12);
        };
        close(ExprMatrix::rotate_x_to_y(&angle) * e_x.clone(), Vector3::new(0.0, 1.0, 0.0));
        close(ExprMatrix::rotate_y_to_x(&angle) * e_y.clone(), Vector3::new(1.0, 0.0, 0.0));
        close(ExprMatrix::rotate_y_to_z(&angle) * e_y.clone(), Vector3::new(0.0, 0.0, 1.0));
        close(ExprMatrix::rotate_z_to_y(&angle) * e_z.clone(), Vector3::new(0.0, 1.0, 0.0));
        close(ExprMatrix::rotate_x_to_z(&angle) * e_x, Vector3::new(0.0, 0.0, 1.0));
        close(ExprMatrix::rotate_z_to_x(&angle) * e_z, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_matrix_to_vector() {
        let p = Point3DExpr::from_point(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(p.to_vertical_matrix().to_vector(), p);
        assert_eq!(p.to_horizontal_matrix().try_to_vector(), Ok(p.clone()));
        assert_eq!(
            ExprMatrix::identity(3).try_to_vector(),
            Err(ExprError::NotAVector { shape: (3, 3) })
        );
    }

    #[test]
    #[should_panic(expected = "3D point")]
    fn test_matrix_to_vector_panics() {
        ExprMatrix::zeros(2, 2).to_vector();
    }

    #[test]
    fn test_determinant_and_inverse() {
        let x = Expr::variable("x", 2.0);
        let m = ExprMatrix::from_3x3(
            x.clone(),
            Expr::zero(),
            Expr::one(),
            Expr::zero(),
            Expr::constant(3.0),
            Expr::zero(),
            Expr::one(),
            Expr::zero(),
            Expr::one(),
        );
        // 3 (x - 1)
        assert_relative_eq!(m.determinant().evaluate(), 3.0);
        let product = (&m * &m.inverse()).evaluate(None);
        assert_relative_eq!(product, DMatrix::identity(3, 3), epsilon = 1e-12);

        let singular = ExprMatrix::from_values(&DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]));
        assert_eq!(singular.try_inverse(), Err(ExprError::SingularMatrix));
        assert_eq!(
            ExprMatrix::zeros(2, 3).try_inverse(),
            Err(ExprError::NotSquare { shape: (2, 3) })
        );
    }

    #[test]
    #[should_panic(expected = "must be square")]
    fn test_minor_of_non_square_panics() {
        ExprMatrix::zeros(2, 3).minor(0, 0);
    }
}
