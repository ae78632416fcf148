//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Clamp a value between a minimum and maximum.
///
/// NaN values are passed through unchanged, use [`finite_or`] to sanitise them first.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T 
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Return the value if it is finite, otherwise the given fallback.
pub fn finite_or<T>(value: T, fallback: T) -> T
where
    T: Float
{
    if value.is_finite() {
        value
    }
    else {
        fallback
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0.0, 2.0), (0.0, 1.0), 1.0), 0.5);
        assert_eq!(lin_map((0.0, 1.0), (10.0, 20.0), 0.25), 12.5);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&1.5f64, &0.0, &1.0), 1.0);
        assert_eq!(clamp(&-0.5f64, &0.0, &1.0), 0.0);
        assert_eq!(clamp(&0.3f64, &0.0, &1.0), 0.3);
    }

    #[test]
    fn test_finite_or() {
        assert_eq!(finite_or(f64::NAN, 0.0), 0.0);
        assert_eq!(finite_or(f64::INFINITY, 1.0), 1.0);
        assert_eq!(finite_or(f64::NEG_INFINITY, 2.0), 2.0);
        assert_eq!(finite_or(4.0f64, 0.0), 4.0);
    }
}
