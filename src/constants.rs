//! Application constants for the PSG loader
//!
//! Byte-layout constants for the EDF+ container, companion-file suffixes,
//! and fixed analysis parameters shared across the crate.

use std::ops::Range;

// =============================================================================
// EDF+ Fixed Header Layout (byte offsets within the 256-byte prologue)
// =============================================================================

/// Byte ranges for each fixed-width ASCII field of the EDF+ prologue
pub mod prologue {
    use super::Range;

    pub const VERSION: Range<usize> = 0..8;
    pub const PATIENT_ID: Range<usize> = 8..88;
    pub const RECORD_ID: Range<usize> = 88..168;
    pub const START_DATE: Range<usize> = 168..184;
    pub const BYTES_IN_HEADER: Range<usize> = 184..192;
    pub const RESERVED: Range<usize> = 192..236;
    pub const NUM_RECORDS: Range<usize> = 236..244;
    pub const RECORD_DURATION: Range<usize> = 244..252;
    pub const NUM_SIGNALS: Range<usize> = 252..256;
}

/// Size of the fixed EDF+ prologue in bytes
pub const FIXED_HEADER_LEN: usize = 256;

/// Additional header bytes contributed by each signal
pub const PER_SIGNAL_HEADER_LEN: usize = 256;

/// Field widths of the variable (per-signal) header, in declaration order.
/// The layout is column-major: all labels first, then all transducer types,
/// and so on.
pub mod signal_field {
    pub const LABEL: usize = 16;
    pub const TRANSDUCER: usize = 80;
    pub const PHYSICAL_DIMENSION: usize = 8;
    pub const PHYSICAL_MIN: usize = 8;
    pub const PHYSICAL_MAX: usize = 8;
    pub const DIGITAL_MIN: usize = 8;
    pub const DIGITAL_MAX: usize = 8;
    pub const PREFILTERING: usize = 80;
    pub const SAMPLES_PER_RECORD: usize = 8;
    pub const RESERVED: usize = 32;
}

/// Bytes per raw sample (16-bit little-endian signed integer)
pub const BYTES_PER_SAMPLE: usize = 2;

// =============================================================================
// Companion File Suffixes
// =============================================================================

/// Companion files are derived from the primary recording path by replacing
/// its `.edf` suffix with one of these.
pub mod companions {
    pub const FEATURES: &str = ".with_features.csv";
    pub const SLOW_WAVES: &str = ".sw_summary.csv";
    pub const NIGHT_EVENTS: &str = ".night_events.csv";
    pub const FITBIT_HYPNOGRAM: &str = ".fitbit_hypnogram.csv";
    pub const SPINDLES: &str = ".spindle_summary.csv";
    pub const SCORINGS: &str = ".scorings.json";
    pub const MICROWAKINGS: &str = ".microwakings.csv";
}

/// Primary recording extension
pub const EDF_SUFFIX: &str = ".edf";

// =============================================================================
// Analysis Parameters
// =============================================================================

/// Length of one scoring epoch in seconds
pub const EPOCH_SECONDS: f64 = 30.0;

/// Name of the synthetic channel carrying the cross-channel stage vote and
/// the unprefixed feature columns of the epoch feature table
pub const AGGREGATED_CHANNEL: &str = "Aggregated";

/// Default clock-string format for per-sample time labels
pub const TIME_LABEL_FORMAT: &str = "%H:%M:%S";

/// Percentile ranks reported by the feature statistics engine
pub const PERCENTILE_RANKS: &[f64] = &[0.10, 0.25, 0.50, 0.75, 0.90];
