//! Fixtures for the dods-client tests and benches.
//!
//! - [`fixtures`]: canned datasets as a DataDDS plus its DAS
//! - [`transport`]: [`MockTransport`], which serves a fixture and records requests
//! - [`generators`]: value patterns that make slicing mistakes visible
//!
//! ```ignore
//! use test_utils::{hs_grid_dataset, MockTransport};
//!
//! let (data, das) = hs_grid_dataset();
//! let transport = MockTransport::new(data, das);
//! ```

pub mod fixtures;
pub mod generators;
pub mod transport;

pub use fixtures::*;
pub use generators::*;
pub use transport::*;

/// Install a fmt subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`. Safe to call from every test; only the first call
/// installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Assert two numbers differ by at most `epsilon`.
///
/// ```ignore
/// assert_approx_eq!(values[0], -49.5, 1e-4);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "assertion failed: {} is not within {} of {} (diff {})",
            left,
            epsilon,
            right,
            diff
        );
    }};
}

/// Macro for element-wise approximate equality of two value slices.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_values_approx_eq;
///
/// assert_values_approx_eq!(&[1.0001, 2.0], &[1.0, 2.0], 0.001);
/// ```
#[macro_export]
macro_rules! assert_values_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        assert_eq!(left.len(), right.len(), "value counts differ");
        for (l, r) in left.iter().zip(right.iter()) {
            $crate::assert_approx_eq!(*l, *r, $epsilon);
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_values_approx_eq_passes() {
        assert_values_approx_eq!(vec![1.0001, 2.0], vec![1.0, 2.0], 0.001);
    }

    #[test]
    fn test_init_logging_twice() {
        init_test_logging();
        init_test_logging();
    }
}
