//! Cosine and sine integrals
//!
//! Ci(x) = gamma + ln x + int_0^x (cos t - 1) / t dt,  Si(x) = int_0^x sin t / t dt,
//! so that Ci(x) + i Si(x) is the antiderivative of e^(ix) / x.
//!
//! For x > 2 the pair is taken from the complex continued fraction of E1(ix) (modified Lentz
//! method), for small x from the power series.
use num_complex::Complex64;
use std::f64::consts::FRAC_PI_2;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
const MAX_ITERATIONS: usize = 100;
const SERIES_LIMIT: f64 = 2.0;
const TINY: f64 = f64::MIN_POSITIVE * 4.0;

/// (Ci(x), Si(x)). Ci of a negative argument is Ci(|x|) (the real part of the analytic
/// continuation), Ci(0) = -inf; Si is odd.
pub fn cos_sin_integrals(x: f64) -> (f64, f64) {
    if x.is_nan() {
        return (f64::NAN, f64::NAN);
    }
    let t = x.abs();
    let (ci, si) = if t == 0.0 {
        (f64::NEG_INFINITY, 0.0)
    } else if t.is_infinite() {
        (0.0, FRAC_PI_2)
    } else if t > SERIES_LIMIT {
        continued_fraction(t)
    } else {
        power_series(t)
    };
    if x < 0.0 { (ci, -si) } else { (ci, si) }
}

fn continued_fraction(t: f64) -> (f64, f64) {
    let mut b = Complex64::new(1.0, t);
    let mut c = Complex64::new(1.0 / TINY, 0.0);
    let mut d = Complex64::new(1.0, 0.0) / b;
    let mut h = d;
    for i in 2..=MAX_ITERATIONS {
        let a = -(((i - 1) * (i - 1)) as f64);
        b += 2.0;
        d = Complex64::new(1.0, 0.0) / (d * a + b);
        c = b + Complex64::new(a, 0.0) / c;
        let delta = c * d;
        h *= delta;
        if (delta.re - 1.0).abs() + delta.im.abs() < f64::EPSILON {
            break;
        }
    }
    let h = Complex64::new(t.cos(), -t.sin()) * h;
    (-h.re, FRAC_PI_2 + h.im)
}

fn power_series(t: f64) -> (f64, f64) {
    let (sum_cos, sum_sin) = if t < TINY.sqrt() {
        (0.0, t)
    } else {
        let mut sum = 0.0;
        let mut sum_sin = 0.0;
        let mut sum_cos = 0.0;
        let mut sign = 1.0;
        let mut fact = 1.0;
        let mut odd = true;
        for k in 1..=MAX_ITERATIONS {
            let k = k as f64;
            fact *= t / k;
            let term = fact / k;
            sum += sign * term;
            let err = term / sum.abs();
            if odd {
                sign = -sign;
                sum_sin = sum;
                sum = sum_cos;
            } else {
                sum_cos = sum;
                sum = sum_sin;
            }
            if err < f64::EPSILON {
                break;
            }
            odd = !odd;
        }
        (sum_cos, sum_sin)
    };
    (sum_cos + t.ln() + EULER_GAMMA, sum_sin)
}

/// cosine integral
pub fn ci(x: f64) -> f64 {
    cos_sin_integrals(x).0
}

/// sine integral
pub fn si(x: f64) -> f64 {
    cos_sin_integrals(x).1
}

/// Ci(x) + i Si(x)
pub fn exp_int_of_imaginary_arg(x: f64) -> Complex64 {
    let (ci, si) = cos_sin_integrals(x);
    Complex64::new(ci, si)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_values() {
        assert_relative_eq!(si(1.0), 0.946083070367183, epsilon = 1e-12);
        assert_relative_eq!(ci(1.0), 0.337403922900968, epsilon = 1e-12);
        assert_relative_eq!(si(5.0), 1.549931244944674, epsilon = 1e-12);
        assert_relative_eq!(ci(5.0), -0.190029749656644, epsilon = 1e-12);
    }

    #[test]
    fn test_branches_agree_near_switch_point() {
        let below = cos_sin_integrals(2.0 - 1e-9);
        let above = cos_sin_integrals(2.0 + 1e-9);
        assert_relative_eq!(below.0, above.0, epsilon = 1e-8);
        assert_relative_eq!(below.1, above.1, epsilon = 1e-8);
    }

    #[test]
    fn test_symmetry_and_limits() {
        assert_relative_eq!(si(-3.0), -si(3.0));
        assert_relative_eq!(ci(-3.0), ci(3.0));
        assert_eq!(si(0.0), 0.0);
        assert_eq!(ci(0.0), f64::NEG_INFINITY);
        assert!(ci(f64::NAN).is_nan());
        assert_relative_eq!(si(1e6), FRAC_PI_2, epsilon = 1e-5);
        let z = exp_int_of_imaginary_arg(1.0);
        assert_relative_eq!(z.re, ci(1.0));
        assert_relative_eq!(z.im, si(1.0));
    }
}
