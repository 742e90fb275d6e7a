//! Tabulated one-argument function: values on a uniform grid, linear interpolation between
//! them and linear extrapolation from the outermost segments.
use crate::symbolic::symbolic_engine::Expr;

#[derive(Clone, Debug)]
pub struct FunctionByPoints {
    pub name: String,
    pub values: Vec<f64>,
    /// argument of values[0]
    pub min: f64,
    /// grid step
    pub step: f64,
    /// d f / d argument, if known analytically
    pub derivative: Option<Expr>,
}

impl FunctionByPoints {
    pub fn new(name: &str, values: Vec<f64>, min: f64, step: f64, derivative: Option<Expr>) -> Self {
        assert!(values.len() >= 2, "a tabulated function needs at least 2 points");
        assert!(step > 0.0, "grid step must be positive, got {}", step);
        Self {
            name: name.to_string(),
            values,
            min,
            step,
            derivative,
        }
    }

    /// argument of the last tabulated value
    pub fn max(&self) -> f64 {
        self.min + self.step * (self.values.len() - 1) as f64
    }

    pub fn interpolate(&self, argument: f64) -> f64 {
        let mut position = (argument - self.min) / self.step;
        if position.is_nan() {
            position = 0.0;
        }
        let last_segment = self.values.len() - 2;
        let index = if position <= 0.0 {
            0
        } else {
            (position.floor() as usize).min(last_segment)
        };
        let coeff = position - index as f64;
        self.values[index] * (1.0 - coeff) + self.values[index + 1] * coeff
    }

    /// Table of the derivative estimated from the grid: one-sided differences at the ends,
    /// central differences inside
    pub fn finite_difference_table(&self) -> FunctionByPoints {
        let n = self.values.len();
        let values: Vec<f64> = (0..n)
            .map(|i| {
                if i == 0 {
                    (self.values[1] - self.values[0]) / self.step
                } else if i == n - 1 {
                    (self.values[n - 1] - self.values[n - 2]) / self.step
                } else {
                    (self.values[i + 1] - self.values[i - 1]) / (2.0 * self.step)
                }
            })
            .collect();
        FunctionByPoints::new(&format!("{}'", self.name), values, self.min, self.step, None)
    }

    /// d f / d argument as a graph node over `arg`
    pub fn derivative_over(&self, arg: &Expr) -> Expr {
        match &self.derivative {
            Some(derivative) => derivative.clone(),
            None => Expr::function_by_points(self.finite_difference_table(), arg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interpolation_inside_and_outside_grid() {
        let table = FunctionByPoints::new("f", vec![0.0, 1.0, 4.0, 9.0], 0.0, 1.0, None);
        assert_relative_eq!(table.max(), 3.0);
        assert_relative_eq!(table.interpolate(0.5), 0.5);
        assert_relative_eq!(table.interpolate(2.0), 4.0);
        assert_relative_eq!(table.interpolate(2.5), 6.5);
        // extrapolation continues the last and the first segments
        assert_relative_eq!(table.interpolate(4.0), 14.0);
        assert_relative_eq!(table.interpolate(-1.0), -1.0);
        // NaN argument falls back to the first point
        assert_relative_eq!(table.interpolate(f64::NAN), 0.0);
    }

    #[test]
    fn test_finite_difference_table() {
        let table = FunctionByPoints::new("f", vec![0.0, 1.0, 4.0, 9.0], 0.0, 1.0, None);
        let derivative = table.finite_difference_table();
        assert_eq!(derivative.name, "f'");
        assert_eq!(derivative.values, vec![1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_tabulated_node_evaluation_and_derivative() {
        let x = Expr::variable("x", 1.5);
        let table = FunctionByPoints::new("f", vec![0.0, 1.0, 4.0, 9.0], 0.0, 1.0, None);
        let f = Expr::function_by_points(table, &(&x * 2.0));
        assert_eq!(f.to_string(), "f(2 * x)");
        assert_relative_eq!(f.evaluate(), 9.0);
        // derivative table at 3.0 is 5.0, chain factor 2
        let df = f.derivative(&x);
        assert_relative_eq!(df.evaluate(), 10.0);
        // constant argument folds
        let folded = Expr::function_by_points(
            FunctionByPoints::new("g", vec![0.0, 2.0], 0.0, 1.0, None),
            &Expr::constant(0.25),
        );
        assert_eq!(folded.as_constant(), Some(0.5));
    }

    #[test]
    fn test_supplied_derivative_is_used() {
        let x = Expr::variable("x", 0.3);
        let table = FunctionByPoints::new("lin", vec![0.0, 3.0], 0.0, 1.0, Some(Expr::constant(3.0)));
        let f = Expr::function_by_points(table, &x.square());
        // d/dx lin(x^2) = 3 * 2x
        assert_relative_eq!(f.derivative(&x).evaluate(), 1.8, epsilon = 1e-12);
    }
}
