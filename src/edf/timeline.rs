//! Timeline alignment of decoded signals.
//!
//! Takes a raw [`EdfData`] and anchors every sample to the wall clock:
//! per-channel sampling rates from the header, a millisecond offset and
//! formatted clock string per sample, and the total recording duration.
//! Everything downstream (epoch indexing, event overlays, scoring) converts
//! between sample index and wall-clock time through the start instant
//! exposed here.

use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

use crate::config::LoaderConfig;
use crate::error::Result;

use super::decoder::EdfData;

/// One sample's position on the recording timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimeLabel {
    /// Milliseconds since the recording start
    pub timestamp_ms: i64,
    /// Clock string at that instant, in the configured format
    pub formatted: String,
}

/// One channel's physical samples with its timing metadata
#[derive(Debug, Clone)]
pub struct SignalData {
    pub label: String,
    pub physical_dimension: String,
    /// Samples per second, `samples_per_record / record_duration`
    pub sampling_rate: f64,
    pub samples: Vec<f64>,
    /// One label per sample, aligned by index
    pub time_labels: Vec<TimeLabel>,
}

/// A decoded recording aligned onto the wall clock
#[derive(Debug, Clone)]
pub struct ProcessedEdf {
    /// Recording start instant from the header
    pub start: DateTime<FixedOffset>,
    /// Total duration in seconds, `record_count * record_duration`
    pub duration_secs: f64,
    pub signals: Vec<SignalData>,
}

impl ProcessedEdf {
    /// The wall-clock instant a given millisecond offset corresponds to
    pub fn instant_at(&self, offset_ms: i64) -> DateTime<FixedOffset> {
        self.start + Duration::milliseconds(offset_ms)
    }
}

/// Align a decoded recording onto its wall-clock timeline.
pub fn process(data: EdfData, config: &LoaderConfig) -> Result<ProcessedEdf> {
    let start = data.header.start;
    let duration_secs = data.header.num_records as f64 * data.header.record_duration;

    debug!(
        start = %start,
        duration_secs,
        num_signals = data.signals.len(),
        "aligning signals onto recording timeline"
    );

    let signals = data
        .signals
        .into_iter()
        .zip(data.samples)
        .map(|(header, samples)| {
            let sampling_rate = header.samples_per_record as f64 / data.header.record_duration;
            let time_labels = build_time_labels(
                &start,
                sampling_rate,
                samples.len(),
                &config.time_label_format,
            );
            SignalData {
                label: header.label,
                physical_dimension: header.physical_dimension,
                sampling_rate,
                samples,
                time_labels,
            }
        })
        .collect();

    Ok(ProcessedEdf {
        start,
        duration_secs,
        signals,
    })
}

/// Sample `i` sits `round(i / rate * 1000)` ms after the start instant.
fn build_time_labels(
    start: &DateTime<FixedOffset>,
    sampling_rate: f64,
    num_samples: usize,
    format: &str,
) -> Vec<TimeLabel> {
    (0..num_samples)
        .map(|i| {
            let timestamp_ms = (i as f64 / sampling_rate * 1000.0).round() as i64;
            let instant = *start + Duration::milliseconds(timestamp_ms);
            TimeLabel {
                timestamp_ms,
                formatted: instant.format(format).to_string(),
            }
        })
        .collect()
}
