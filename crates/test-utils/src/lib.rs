//! Test helpers shared by the stamp crates.
//!
//! - tolerance assertions for pixel values, scales and positions
//! - one-tract sky maps and Gaussian PSF descriptors ([`fixtures`])
//! - deterministic images: impulses, position-coded pixels, Gaussian stars
//!   ([`generators`])
//! - scratch directories ([`paths`])
//!
//! Pulled in as a dev-dependency only:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Absolute tolerance: `|left - right| <= epsilon`. NaN never passes.
///
/// ```ignore
/// assert_approx_eq!(psf.sum(), 1.0, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Relative tolerance: `|left - right| <= rel * |right|`.
#[macro_export]
macro_rules! assert_rel_eq {
    ($left:expr, $right:expr, $rel:expr) => {{
        let right: f64 = $right as f64;
        $crate::assert_approx_eq!($left, right, ($rel as f64) * right.abs());
    }};
}

/// Compare anything with `x` and `y` fields (pixel positions) to an
/// `(x, y)` pair.
///
/// ```ignore
/// assert_point_approx_eq!(products.target_in_cutout(), (25.3, 24.7), 1e-6);
/// ```
#[macro_export]
macro_rules! assert_point_approx_eq {
    ($point:expr, ($x:expr, $y:expr), $epsilon:expr) => {{
        let point = $point;
        $crate::assert_approx_eq!(point.x, $x, $epsilon);
        $crate::assert_approx_eq!(point.y, $y, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    struct Pixel {
        x: f64,
        y: f64,
    }

    #[test]
    fn test_within_tolerance() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5_f32, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_outside_tolerance() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_nan_never_close() {
        assert_approx_eq!(f64::NAN, 1.0, 0.001);
    }

    #[test]
    fn test_relative_scale() {
        assert_rel_eq!(100_000.5, 100_000.0, 1e-5);
    }

    #[test]
    fn test_point_fields() {
        assert_point_approx_eq!(Pixel { x: 25.3001, y: 24.7 }, (25.3, 24.7), 1e-3);
    }
}
