//! Complex number with expression components.
//!
//! ```
//! use RustedExprDAG::symbolic::symbolic_complex::ComplexExpr;
//! use RustedExprDAG::symbolic::symbolic_engine::Expr;
//! let phi = Expr::variable("phi", std::f64::consts::PI);
//! let z = ComplexExpr::exp(&ComplexExpr::new(Expr::zero(), phi.clone()));
//! let value = z.evaluate();
//! assert!((value.re + 1.0).abs() < 1e-12 && value.im.abs() < 1e-12);
//! ```
use crate::symbolic::symbolic_cache::{Generation, next_generation};
use crate::symbolic::symbolic_engine::Expr;
use num_complex::Complex64;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Clone, Debug, PartialEq)]
pub struct ComplexExpr {
    pub re: Expr,
    pub im: Expr,
}

impl ComplexExpr {
    pub fn new(re: Expr, im: Expr) -> Self {
        Self { re, im }
    }

    pub fn from_value(value: Complex64) -> Self {
        Self::new(Expr::constant(value.re), Expr::constant(value.im))
    }

    /// Labels the components "Re(alias)" and "Im(alias)"
    pub fn set_alias(&self, alias: &str) {
        self.re.set_alias(Some(&format!("Re({})", alias)));
        self.im.set_alias(Some(&format!("Im({})", alias)));
    }

    pub fn square_length(&self) -> Expr {
        Expr::sum([self.re.square(), self.im.square()])
    }

    pub fn length(&self) -> Expr {
        let length = Expr::hypot([self.re.clone(), self.im.clone()]);
        length.set_alias(Some(&format!("Len({})", self.label())));
        length
    }

    pub fn arg(&self) -> Expr {
        let arg = Expr::atan2(&self.im, &self.re);
        arg.set_alias(Some(&format!("Arg({})", self.label())));
        arg
    }

    pub fn normal(&self) -> ComplexExpr {
        let normal = self / &self.length();
        normal.set_alias(&format!("Normal({})", self.label()));
        normal
    }

    pub fn conjugate(&self) -> ComplexExpr {
        ComplexExpr::new(self.re.clone(), self.im.invert())
    }

    /// e^z = e^re (cos im, sin im)
    pub fn exp(z: &ComplexExpr) -> ComplexExpr {
        let modulus = z.re.exp();
        ComplexExpr::new(&modulus * &z.im.cos(), &modulus * &z.im.sin())
    }

    /// (Ci x, Si x), so that the real part is Ci and the imaginary part is Si
    pub fn exp_int_of_imaginary_arg(x: &Expr) -> ComplexExpr {
        ComplexExpr::new(x.ci(), x.si())
    }

    /// (Ci x2 - Ci x1, Si x2 - Si x1)
    pub fn exp_int_of_imaginary_arg_between(x1: &Expr, x2: &Expr) -> ComplexExpr {
        &ComplexExpr::exp_int_of_imaginary_arg(x2) - &ComplexExpr::exp_int_of_imaginary_arg(x1)
    }

    pub fn coalesce(condition: &Expr, value_if_zero: &ComplexExpr, value_if_nonzero: &ComplexExpr) -> ComplexExpr {
        ComplexExpr::new(
            Expr::coalesce(condition, &value_if_zero.re, &value_if_nonzero.re),
            Expr::coalesce(condition, &value_if_zero.im, &value_if_nonzero.im),
        )
    }

    pub fn derivative(&self, variable: &Expr) -> ComplexExpr {
        ComplexExpr::new(self.re.derivative(variable), self.im.derivative(variable))
    }

    pub fn simplify(&self) -> ComplexExpr {
        ComplexExpr::new(self.re.simplify(), self.im.simplify())
    }

    pub fn evaluate(&self) -> Complex64 {
        self.evaluate_in(next_generation())
    }

    pub fn evaluate_in(&self, generation: Generation) -> Complex64 {
        Complex64::new(self.re.evaluate_in(generation), self.im.evaluate_in(generation))
    }

    pub fn evaluate_vars(&self, excluded: &[Expr]) -> ComplexExpr {
        ComplexExpr::new(self.re.evaluate_vars(excluded), self.im.evaluate_vars(excluded))
    }

    fn label(&self) -> String {
        match self.re.alias().as_deref().and_then(|a| a.strip_prefix("Re(")) {
            Some(inner) => inner.strip_suffix(')').unwrap_or(inner).to_string(),
            None => format!("{}; {}", self.re, self.im),
        }
    }
}

impl From<Expr> for ComplexExpr {
    fn from(re: Expr) -> Self {
        ComplexExpr::new(re, Expr::zero())
    }
}

impl From<&Expr> for ComplexExpr {
    fn from(re: &Expr) -> Self {
        ComplexExpr::new(re.clone(), Expr::zero())
    }
}

impl Add for &ComplexExpr {
    type Output = ComplexExpr;
    fn add(self, rhs: &ComplexExpr) -> ComplexExpr {
        ComplexExpr::new(&self.re + &rhs.re, &self.im + &rhs.im)
    }
}

impl Sub for &ComplexExpr {
    type Output = ComplexExpr;
    fn sub(self, rhs: &ComplexExpr) -> ComplexExpr {
        ComplexExpr::new(&self.re - &rhs.re, &self.im - &rhs.im)
    }
}

impl Neg for &ComplexExpr {
    type Output = ComplexExpr;
    fn neg(self) -> ComplexExpr {
        ComplexExpr::new(self.re.invert(), self.im.invert())
    }
}

/// (a + bi)(c + di) = (ac - bd) + (ad + bc)i
impl Mul for &ComplexExpr {
    type Output = ComplexExpr;
    fn mul(self, rhs: &ComplexExpr) -> ComplexExpr {
        ComplexExpr::new(
            &self.re * &rhs.re - &self.im * &rhs.im,
            &self.re * &rhs.im + &self.im * &rhs.re,
        )
    }
}

impl Mul<&Expr> for &ComplexExpr {
    type Output = ComplexExpr;
    fn mul(self, k: &Expr) -> ComplexExpr {
        ComplexExpr::new(&self.re * k, &self.im * k)
    }
}

impl Mul<&ComplexExpr> for &Expr {
    type Output = ComplexExpr;
    fn mul(self, z: &ComplexExpr) -> ComplexExpr {
        ComplexExpr::new(self * &z.re, self * &z.im)
    }
}

impl Div<&Expr> for &ComplexExpr {
    type Output = ComplexExpr;
    fn div(self, k: &Expr) -> ComplexExpr {
        ComplexExpr::new(&self.re / k, &self.im / k)
    }
}

/// k / z = k conj(z) / |z|^2
impl Div<&ComplexExpr> for &Expr {
    type Output = ComplexExpr;
    fn div(self, z: &ComplexExpr) -> ComplexExpr {
        &z.conjugate() * &(self / &z.square_length())
    }
}

/// (a + bi) / (c + di) = ((ac + bd) + (bc - ad)i) / (c^2 + d^2)
impl Div for &ComplexExpr {
    type Output = ComplexExpr;
    fn div(self, rhs: &ComplexExpr) -> ComplexExpr {
        let denominator = rhs.square_length();
        ComplexExpr::new(
            &(&self.re * &rhs.re + &self.im * &rhs.im) / &denominator,
            &(&self.im * &rhs.re - &self.re * &rhs.im) / &denominator,
        )
    }
}

macro_rules! impl_owned_complex_operator {
    ($trait:ident, $method:ident) => {
        impl $trait for ComplexExpr {
            type Output = ComplexExpr;
            fn $method(self, rhs: ComplexExpr) -> ComplexExpr {
                (&self).$method(&rhs)
            }
        }
    };
}

impl_owned_complex_operator!(Add, add);
impl_owned_complex_operator!(Sub, sub);
impl_owned_complex_operator!(Mul, mul);
impl_owned_complex_operator!(Div, div);

impl Neg for ComplexExpr {
    type Output = ComplexExpr;
    fn neg(self) -> ComplexExpr {
        -&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::special_functions::exp_int_of_imaginary_arg;
    use approx::assert_relative_eq;

    fn close(actual: Complex64, expected: Complex64) {
        assert_relative_eq!(actual.re, expected.re, epsilon = 1e-12);
        assert_relative_eq!(actual.im, expected.im, epsilon = 1e-12);
    }

    #[test]
    fn test_arithmetic_matches_num_complex() {
        let a = Expr::variable("a", 1.5);
        let b = Expr::variable("b", -0.5);
        let z1 = ComplexExpr::new(a.clone(), b.clone());
        let z2 = ComplexExpr::from_value(Complex64::new(0.25, 2.0));
        let v1 = Complex64::new(1.5, -0.5);
        let v2 = Complex64::new(0.25, 2.0);
        close((&z1 + &z2).evaluate(), v1 + v2);
        close((&z1 - &z2).evaluate(), v1 - v2);
        close((&z1 * &z2).evaluate(), v1 * v2);
        close((&z1 / &z2).evaluate(), v1 / v2);
        close((-&z1).evaluate(), -v1);
        close(z1.conjugate().evaluate(), v1.conj());
        let k = Expr::constant(3.0);
        close((&z1 * &k).evaluate(), v1 * 3.0);
        close((&k * &z1).evaluate(), v1 * 3.0);
        close((&z1 / &k).evaluate(), v1 / 3.0);
        close((&k / &z1).evaluate(), 3.0 / v1);
        // components follow the variables
        a.set_value(0.0);
        close((&z1 * &z2).evaluate(), Complex64::new(0.0, -0.5) * v2);
    }

    #[test]
    fn test_polar_quantities() {
        let z = ComplexExpr::new(Expr::variable("u", 3.0), Expr::variable("v", -4.0));
        let value = Complex64::new(3.0, -4.0);
        assert_relative_eq!(z.length().evaluate(), 5.0);
        assert_relative_eq!(z.square_length().evaluate(), 25.0);
        assert_relative_eq!(z.arg().evaluate(), value.arg());
        close(z.normal().evaluate(), value / 5.0);
        close(ComplexExpr::exp(&z).evaluate(), value.exp());
    }

    #[test]
    fn test_aliases() {
        let z = ComplexExpr::new(Expr::variable("u", 1.0), Expr::variable("v", 0.0));
        z.set_alias("z");
        assert_eq!(z.re.alias().as_deref(), Some("Re(z)"));
        assert_eq!(z.im.alias().as_deref(), Some("Im(z)"));
        assert_eq!(z.length().alias().as_deref(), Some("Len(z)"));
        assert_eq!(z.arg().alias().as_deref(), Some("Arg(z)"));
        assert_eq!(z.normal().re.alias().as_deref(), Some("Re(Normal(z))"));
        // aliases never change the structural signature
        assert_eq!(z.length().to_string(), "hypot(u, v)");
    }

    #[test]
    fn test_alias_of_real_value_leaves_zero_alone() {
        let phi = Expr::variable("phi", 1.0);
        let z = ComplexExpr::new(Expr::zero(), phi.clone());
        z.set_alias("z");
        assert_eq!(phi.alias().as_deref(), Some("Im(z)"));
        assert_eq!(Expr::zero().alias(), None);
        let (c, x) = (Expr::variable("c", 0.0), Expr::variable("x", 0.0));
        assert_eq!(Expr::coalesce(&c, &Expr::zero(), &x).render(1), "if(0 = c; 0; x)");
        ComplexExpr::from(Expr::variable("r", 2.0)).set_alias("w");
        assert_eq!(Expr::zero().render(0), "0");
    }

    #[test]
    fn test_exponential_integral_of_imaginary_argument() {
        let x = Expr::variable("x", 2.0);
        let f = ComplexExpr::exp_int_of_imaginary_arg(&x);
        close(f.evaluate(), exp_int_of_imaginary_arg(2.0));
        let x1 = Expr::variable("x1", 0.5);
        let between = ComplexExpr::exp_int_of_imaginary_arg_between(&x1, &x);
        close(
            between.evaluate(),
            exp_int_of_imaginary_arg(2.0) - exp_int_of_imaginary_arg(0.5),
        );
        // d/dx (Ci x + i Si x) = e^(ix) / x
        let d = f.derivative(&x).evaluate();
        close(d, Complex64::new(0.0, 2.0).exp() / 2.0);
    }

    #[test]
    fn test_coalesce_and_real_conversion() {
        let c = Expr::variable("c", 0.0);
        let z = ComplexExpr::coalesce(
            &c,
            &ComplexExpr::from(Expr::constant(1.0)),
            &ComplexExpr::from_value(Complex64::new(0.0, 1.0)),
        );
        close(z.evaluate(), Complex64::new(1.0, 0.0));
        c.set_value(-1.0);
        close(z.evaluate(), Complex64::new(0.0, 1.0));
    }
}
