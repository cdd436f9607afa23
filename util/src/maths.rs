//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// Due to floating point round-off the result can equal `rhs.abs()` when
/// `lhs` is a very small negative number.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let wrapped = pi_t - rem_euclid(pi_t - angle, tau_t);

    // rem_euclid can return tau for tiny negative inputs, which would put us
    // at -pi
    if wrapped <= -pi_t {
        wrapped + tau_t
    } else {
        wrapped
    }
}

/// Get the signed shortest angular distance from `from` to `to`.
///
/// The result is in (-pi, pi], positive meaning `to` is anticlockwise of
/// `from`.
pub fn ang_dist<T>(from: T, to: T) -> T
where
    T: Float,
{
    wrap_pi(to - from)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0.1, 1.0), (0.0, 1.0), 0.1), 0.0);
        assert_eq!(lin_map((0.1, 1.0), (0.0, 1.0), 1.0), 1.0);
        assert_eq!(lin_map((0.0, 2.0), (-1.0, 1.0), 1.0), 0.0);
    }

    #[test]
    fn test_wrap_pi() {
        assert_abs_diff_eq!(wrap_pi(0f64), 0.0);
        assert_abs_diff_eq!(wrap_pi(PI), PI);
        assert_abs_diff_eq!(wrap_pi(-PI), PI);
        assert_abs_diff_eq!(wrap_pi(TAU + 1.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_pi(-TAU - 1.0), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(wrap_pi(3.0 * FRAC_PI_2), -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_ang_dist() {
        assert_abs_diff_eq!(ang_dist(1f64, 2f64), 1.0);
        assert_abs_diff_eq!(ang_dist(2f64, 1f64), -1.0);
        assert_abs_diff_eq!(ang_dist(0f64, TAU), 0.0, epsilon = 1e-12);

        // Crossing the +-pi boundary takes the short way round
        let from = PI - 0.1;
        let to = -PI + 0.1;
        assert_abs_diff_eq!(ang_dist(from, to), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(ang_dist(to, from), -0.2, epsilon = 1e-12);
    }
}
