//! Bracket search for the point where a monotone predicate switches from false to true.
//!
//! 1. if the predicate already holds at `min` the search fails (NaN)
//! 2. while it does not hold at `max`: the bracket moves to [max, 2 max], at most
//!    `MAX_BRACKET_DOUBLINGS` times
//! 3. bisection until the bracket is not wider than `precision`
//! 4. one secant step through the calculator values at the bracket ends, clamped into it
use log::debug;

/// how many times the upper bound may be doubled before the search gives up
pub const MAX_BRACKET_DOUBLINGS: usize = 10;

/// Result of a search together with its work counters
#[derive(Debug, Clone, PartialEq)]
pub struct BinarySearchResult {
    /// NaN when no bracket was found
    pub root: f64,
    pub doublings: usize,
    pub bisections: usize,
}

/// Root estimate, NaN on failure. See `search_with_stats`.
pub fn search<C, F>(min: f64, max: f64, precision: f64, comparer: C, calculator: F) -> f64
where
    C: FnMut(f64) -> bool,
    F: FnMut(f64) -> f64,
{
    search_with_stats(min, max, precision, comparer, calculator).root
}

/// # Arguments
/// * `comparer` - true for trial points at or past the root, must be false at `min`
/// * `calculator` - signed function value used by the final secant step
pub fn search_with_stats<C, F>(
    mut min: f64,
    mut max: f64,
    precision: f64,
    mut comparer: C,
    mut calculator: F,
) -> BinarySearchResult
where
    C: FnMut(f64) -> bool,
    F: FnMut(f64) -> f64,
{
    let mut result = BinarySearchResult {
        root: f64::NAN,
        doublings: 0,
        bisections: 0,
    };
    if comparer(min) {
        debug!("bracket search: predicate already holds at the lower bound {}", min);
        return result;
    }
    while !comparer(max) {
        min = max;
        max *= 2.0;
        result.doublings += 1;
        if result.doublings >= MAX_BRACKET_DOUBLINGS {
            debug!(
                "bracket search: no sign change after {} doublings, upper bound {}",
                result.doublings, max
            );
            return result;
        }
    }
    while max - min > precision {
        let mid = (min + max) / 2.0;
        // the bracket can not shrink below float resolution
        if mid <= min || mid >= max {
            break;
        }
        if comparer(mid) {
            max = mid;
        } else {
            min = mid;
        }
        result.bisections += 1;
    }
    let value_at_min = calculator(min);
    let value_at_max = calculator(max);
    result.root = if value_at_min == value_at_max {
        (min + max) / 2.0
    } else {
        let secant = min - (max - min) * value_at_min / (value_at_max - value_at_min);
        min.max(max.min(secant))
    };
    debug!(
        "bracket search: root {} after {} doublings and {} bisections",
        result.root, result.doublings, result.bisections
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_root_of_two() {
        let root = search(0.0, 10.0, 1e-9, |x| x * x - 2.0 >= 0.0, |x| x * x - 2.0);
        assert_relative_eq!(root, 2.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_bracket_is_expanded() {
        let result = search_with_stats(1.0, 2.0, 1e-10, |x| x >= 20.0, |x| x - 20.0);
        assert_eq!(result.doublings, 4);
        assert_relative_eq!(result.root, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_failure_modes() {
        // predicate true at the lower bound
        assert!(search(0.0, 1.0, 1e-6, |_| true, |x| x).is_nan());
        // predicate never true within the doubling budget
        let result = search_with_stats(1.0, 2.0, 1e-6, |_| false, |x| x);
        assert!(result.root.is_nan());
        assert_eq!(result.doublings, MAX_BRACKET_DOUBLINGS);
    }

    #[test]
    fn test_flat_calculator_returns_midpoint() {
        let root = search(0.0, 1.0, 0.25, |x| x > 0.3, |_| 1.0);
        // bracket shrinks to [0.25, 0.5]
        assert_relative_eq!(root, 0.375);
    }

    #[test]
    fn test_secant_step_is_clamped_into_bracket() {
        let root = search(0.0, 1.0, 0.5, |x| x >= 0.5, |x| if x < 0.5 { -1.0 } else { 1e-9 });
        assert!((0.0..=1.0).contains(&root));
    }

    #[test]
    fn test_zero_precision_terminates() {
        let root = search(0.0, 4.0, 0.0, |x| x * x >= 3.0, |x| x * x - 3.0);
        assert_relative_eq!(root, 3.0_f64.sqrt(), epsilon = 1e-12);
    }
}
