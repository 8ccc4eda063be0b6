//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Evaluate a polynomial at `value`.
///
/// Coefficients are ordered lowest power first, i.e. `coeffs[i]` multiplies
/// `value^i`. An empty coefficient slice evaluates to zero.
pub fn poly_eval<T>(coeffs: &[T], value: T) -> T
where
    T: Float
{
    // Horner's scheme, walking from the highest power down
    coeffs
        .iter()
        .rev()
        .fold(T::zero(), |acc, &c| acc * value + c)
}

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

/// Convert degrees into radians.
pub fn deg_to_rad<T: Float>(deg: T) -> T {
    deg.to_radians()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_poly_eval() {
        // 1 + 2x + 3x^2 + 4x^3
        let c = [1f64, 2f64, 3f64, 4f64];
        assert_eq!(poly_eval(&c, 0f64), 1f64);
        assert_eq!(poly_eval(&c, 1f64), 10f64);
        assert_eq!(poly_eval(&c, 2f64), 49f64);
        assert_eq!(poly_eval::<f64>(&[], 3f64), 0f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&2f64, &-1f64, &1f64), 1f64);
        assert_eq!(clamp(&-2f64, &-1f64, &1f64), -1f64);
        assert_eq!(clamp(&0.5f64, &-1f64, &1f64), 0.5f64);
    }

    #[test]
    fn test_deg_to_rad() {
        const PI: f64 = std::f64::consts::PI;

        assert!((deg_to_rad(180f64) - PI).abs() < 1e-12);
    }
}
