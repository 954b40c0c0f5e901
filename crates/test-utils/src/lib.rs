//! Test support for the climate-indices workspace.
//!
//! - [`fixtures`]: grids over whole years, model/experiment names, biome
//!   GeoJSON built from rectangles
//! - [`generators`]: daily precipitation whose index values can be worked
//!   out by hand, plus a seeded random generator
//! - [`paths`]: optional real NetCDF files
//!
//! Pull it in as a dev-dependency:
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

/// Resolve a test file by name, or return early from the test.
///
/// ```ignore
/// #[test]
/// fn test_read_pr() {
///     let path = test_utils::require_test_file!("pr_day_sample.nc");
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        let Some(path) = $crate::find_test_file($name) else {
            eprintln!(
                "SKIPPED: {} not found (set {} or add it under testdata/)",
                $name,
                $crate::TEST_DATA_ENV
            );
            return;
        };
        path
    }};
}

/// `|left - right| <= epsilon`, compared as f64. NaN never passes.
///
/// ```ignore
/// assert_approx_eq!(8.1649658, spread, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
            left,
            right,
            diff,
            epsilon
        );
    }};
}

/// Missing index values are NaN; assert one is.
#[macro_export]
macro_rules! assert_nan {
    ($value:expr) => {{
        let value = $value as f64;
        assert!(value.is_nan(), "assertion failed: expected NaN, got `{:?}`", value);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_approx_eq_within_epsilon() {
        assert_approx_eq!(20.0001, 20.0, 0.001);
        assert_approx_eq!(0.0_f32, 0.0_f32, 0.0);
        assert_approx_eq!(-8.1649658, -8.16497, 1e-4);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_approx_eq_outside_epsilon() {
        assert_approx_eq!(365.0, 366.0, 0.5);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_approx_eq_nan_fails() {
        assert_approx_eq!(f64::NAN, f64::NAN, 1.0);
    }

    #[test]
    fn test_assert_nan() {
        assert_nan!(f32::NAN);
    }

    #[test]
    #[should_panic(expected = "expected NaN")]
    fn test_assert_nan_rejects_value() {
        assert_nan!(264.0);
    }
}
