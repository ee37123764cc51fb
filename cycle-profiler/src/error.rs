use std::io;

use thiserror::Error;

/// Everything that can go wrong around a profiling session.
///
/// Profiling itself never fails: opening and closing scopes is infallible.
/// Errors only arise from configuration and from emitting the
/// [report](crate::report::Report).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("the calibration window must be longer than zero")]
    ZeroCalibrationWindow,

    #[error("environment variable `{name}` has invalid value `{value}`")]
    InvalidEnvironmentVariable { name: String, value: String },

    #[error("failed to write the profiling report")]
    Io(#[from] io::Error),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use assert2::assert;
    use assert2::let_assert;

    use super::*;

    #[test]
    fn io_errors_convert_into_profiler_errors() {
        let io_error = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let_assert!(ProfilerError::Io(source) = ProfilerError::from(io_error));
        assert!(io::ErrorKind::BrokenPipe == source.kind());
    }

    #[test]
    fn invalid_environment_variable_error_names_variable_and_value() {
        let error = ProfilerError::InvalidEnvironmentVariable {
            name: "SOME_VARIABLE".to_string(),
            value: "not a number".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("SOME_VARIABLE"));
        assert!(message.contains("not a number"));
    }
}
