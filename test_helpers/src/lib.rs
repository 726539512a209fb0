//! Shared test utilities for the workspace.

use std::sync::Once;

pub mod tracing;

pub use crate::tracing::{LogLine, LogValue, TracingCapture, TracingCaptureConfig};

static LOG_SETUP: Once = Once::new();

/// Enables debug logging if the `RUST_LOG` environment variable is
/// set. Does nothing if `RUST_LOG` is not set.
///
/// Call this at the start of a test when you want to see the profiling
/// logs while debugging it:
///
/// ```text
/// RUST_LOG=debug cargo test -p column_profile -- --nocapture
/// ```
pub fn maybe_start_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        start_logging()
    }
}

/// Installs a global `fmt` subscriber that honours `RUST_LOG`.
///
/// Safe to call multiple times, only the first call has an effect.
pub fn start_logging() {
    LOG_SETUP.call_once(|| {
        // ignore the error, another test harness may have installed a subscriber already
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    })
}

/// Asserts that the first argument, formatted with `to_string()`,
/// contains the second.
#[macro_export]
macro_rules! assert_contains {
    ($ACTUAL: expr, $EXPECTED: expr) => {
        let actual_value: String = $ACTUAL.to_string();
        let expected_value: String = $EXPECTED.to_string();
        assert!(
            actual_value.contains(&expected_value),
            "Can not find expected in actual.\n\nExpected:\n{}\n\nActual:\n{}",
            expected_value,
            actual_value
        );
    };
}

/// Asserts that the first argument, formatted with `to_string()`,
/// does NOT contain the second.
#[macro_export]
macro_rules! assert_not_contains {
    ($ACTUAL: expr, $UNEXPECTED: expr) => {
        let actual_value: String = $ACTUAL.to_string();
        let unexpected_value: String = $UNEXPECTED.to_string();
        assert!(
            !actual_value.contains(&unexpected_value),
            "Found unexpected in actual.\n\nUnexpected:\n{}\n\nActual:\n{}",
            unexpected_value,
            actual_value
        );
    };
}

/// Asserts that a `Result` is an error matching the given pattern.
///
/// ```
/// # use test_helpers::assert_error;
/// #[derive(Debug)]
/// enum Error {
///     TypeMismatch { sampled: usize },
/// }
///
/// let res: Result<(), Error> = Err(Error::TypeMismatch { sampled: 2 });
/// assert_error!(res, Error::TypeMismatch { sampled } if sampled == 2);
/// ```
#[macro_export]
macro_rules! assert_error {
    ($OPERATION: expr, $(|)? $( $ERROR_TYPE: pat_param )|+ $( if $GUARD: expr )? $(,)?) => {
        let err = $OPERATION.unwrap_err();
        assert!(
            matches!(err, $( $ERROR_TYPE )|+ $( if $GUARD )?),
            "Expected {}, but got {:?}",
            stringify!($( $ERROR_TYPE )|+ $( if $GUARD )?),
            err
        );
    };
}
