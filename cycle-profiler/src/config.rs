use std::cell::RefCell;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ProfilerError;

/// How long the [frequency estimator](crate::frequency::estimate_counter_frequency)
/// busy-waits on the wall clock, unless configured otherwise.
pub const DEFAULT_CALIBRATION_WINDOW: Duration = Duration::from_millis(100);

/// The width of the label column in a [report](crate::report::Report), unless
/// configured otherwise.
pub const DEFAULT_LABEL_WIDTH: usize = 35;

pub(crate) const ENV_VAR_CALIBRATION_MS: &str = "CYCLE_PROFILER_CALIBRATION_MS";
pub(crate) const ENV_VAR_LABEL_WIDTH: &str = "CYCLE_PROFILER_LABEL_WIDTH";

thread_local! {
    pub(crate) static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Settings for a [`Session`](crate::session::Session).
///
/// Every session takes a snapshot of the current thread's configuration when
/// it is created. Changing the configuration afterwards does not affect
/// sessions that already exist.
///
/// The defaults can be overwritten with the environment variables
/// `CYCLE_PROFILER_CALIBRATION_MS` and `CYCLE_PROFILER_LABEL_WIDTH`, or
/// programmatically through [`overwrite_calibration_window_to`] and
/// [`overwrite_label_width_to`]. Programmatic overwrites take precedence.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Config {
    calibration_window: Duration,
    label_width: usize,
}

impl Config {
    /// The built-in defaults, overwritten by any valid environment variable.
    /// Invalid environment variables are ignored with a warning.
    pub fn from_env() -> Self {
        let calibration_window = match parse_env_var::<u64>(ENV_VAR_CALIBRATION_MS) {
            Ok(Some(0)) => {
                warn!("ignoring {ENV_VAR_CALIBRATION_MS}: {}", ProfilerError::ZeroCalibrationWindow);
                DEFAULT_CALIBRATION_WINDOW
            }
            Ok(Some(millis)) => Duration::from_millis(millis),
            Ok(None) => DEFAULT_CALIBRATION_WINDOW,
            Err(err) => {
                warn!("{err}");
                DEFAULT_CALIBRATION_WINDOW
            }
        };

        let label_width = parse_env_var(ENV_VAR_LABEL_WIDTH)
            .unwrap_or_else(|err| {
                warn!("{err}");
                None
            })
            .unwrap_or(DEFAULT_LABEL_WIDTH);

        Self {
            calibration_window,
            label_width,
        }
    }

    pub fn calibration_window(&self) -> Duration {
        self.calibration_window
    }

    pub fn label_width(&self) -> usize {
        self.label_width
    }

    /// # Errors
    ///
    /// Errors if the window is zero, since no frequency can be estimated from
    /// zero elapsed wall-clock time.
    pub fn with_calibration_window(mut self, window: Duration) -> Result<Self, ProfilerError> {
        if window.is_zero() {
            return Err(ProfilerError::ZeroCalibrationWindow);
        }
        self.calibration_window = window;
        Ok(self)
    }

    #[must_use]
    pub fn with_label_width(mut self, label_width: usize) -> Self {
        self.label_width = label_width;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Overwrite the calibration window of all sessions subsequently created on
/// the current thread. Takes precedence over the environment variable
/// `CYCLE_PROFILER_CALIBRATION_MS`.
///
/// A longer window gives a more accurate estimate of the cycle counter's
/// frequency, but every report takes that much longer to produce.
///
/// # Errors
///
/// Errors if the window is zero. The configuration remains unchanged.
pub fn overwrite_calibration_window_to(window: Duration) -> Result<(), ProfilerError> {
    let config = current().with_calibration_window(window)?;
    CONFIG.set(config);
    Ok(())
}

/// Overwrite the label column width of all sessions subsequently created on
/// the current thread. Takes precedence over the environment variable
/// `CYCLE_PROFILER_LABEL_WIDTH`.
pub fn overwrite_label_width_to(label_width: usize) {
    CONFIG.with_borrow_mut(|config| config.label_width = label_width);
}

/// The configuration of the current thread.
pub(crate) fn current() -> Config {
    CONFIG.with_borrow(|config| *config)
}

fn parse_env_var<T: FromStr>(name: &str) -> Result<Option<T>, ProfilerError> {
    let Ok(value) = std::env::var(name) else {
        return Ok(None);
    };
    parse_value(name, &value).map(Some)
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T, ProfilerError> {
    value
        .trim()
        .parse()
        .map_err(|_| ProfilerError::InvalidEnvironmentVariable {
            name: name.to_string(),
            value: value.to_string(),
        })
}
