//! Configuration for recording load operations.
//!
//! A [`LoaderConfig`] controls the few knobs the ingestion layer exposes:
//! the epoch length used for index math, the clock-string format of the
//! per-sample time labels, and whether auxiliary-source failures abort the
//! load instead of degrading that source to unavailable.

use crate::constants::{EPOCH_SECONDS, TIME_LABEL_FORMAT};

/// Global configuration for recording loads
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Length of one scoring epoch in seconds
    pub epoch_seconds: f64,

    /// `chrono` format string for per-sample clock labels
    pub time_label_format: String,

    /// Treat auxiliary read/parse failures as fatal instead of degrading the
    /// source to unavailable. Absent files are never fatal.
    pub strict_auxiliary: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            epoch_seconds: EPOCH_SECONDS,
            time_label_format: TIME_LABEL_FORMAT.to_string(),
            strict_auxiliary: false,
        }
    }
}

impl LoaderConfig {
    /// Create configuration with a custom epoch length
    pub fn with_epoch_seconds(mut self, epoch_seconds: f64) -> Self {
        self.epoch_seconds = epoch_seconds;
        self
    }

    /// Create configuration with a custom time-label format string
    pub fn with_time_label_format(mut self, format: impl Into<String>) -> Self {
        self.time_label_format = format.into();
        self
    }

    /// Enable strict auxiliary mode
    pub fn with_strict_auxiliary(mut self) -> Self {
        self.strict_auxiliary = true;
        self
    }
}
