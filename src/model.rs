//! Data models for loaded recordings
//!
//! This module contains the in-memory representation of everything a load
//! produces: the per-source availability wrapper, the per-epoch feature
//! records, detected-event and interval types, the human scoring store
//! entries, and the assembled [`Recording`] snapshot handed to consumers.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::edf::ProcessedEdf;
use crate::error::{Error, Result};
use crate::stats::FeatureStatsTable;

// =============================================================================
// Source Availability
// =============================================================================

/// Availability of one auxiliary data source.
///
/// Companion files are routinely absent (a recording may never have been run
/// through the spindle detector, or the wearable was not worn that night).
/// Every consumer is forced to handle that case explicitly instead of
/// guessing whether an empty collection means "no events" or "no file".
#[derive(Debug, Clone, PartialEq)]
pub enum SourceData<T> {
    /// The source was present and decoded successfully
    Available(T),
    /// The source was absent or unreadable; the reason is human-readable
    Unavailable { reason: String },
}

impl<T> SourceData<T> {
    /// Wrap an absent or failed source with a reason
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// True if the source decoded successfully
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Borrow the decoded value, if any
    pub fn available(&self) -> Option<&T> {
        match self {
            Self::Available(value) => Some(value),
            Self::Unavailable { .. } => None,
        }
    }

    /// The unavailability reason, if any
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Self::Available(_) => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

// =============================================================================
// Epoch Feature Records
// =============================================================================

/// Per-channel slice of one epoch's feature row.
///
/// The feature set is produced by an external, evolving analysis pipeline,
/// so features are an open-ended name-to-value mapping rather than a fixed
/// struct. Only finite-typed `f64` values enter the map; unparseable cells
/// are inserted as NaN by the reader, never as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelEpoch {
    /// Predicted sleep stage label for this channel, if present
    pub stage: Option<String>,
    /// Prediction confidence in [0, 1], if present
    pub confidence: Option<f64>,
    /// Predicting model/source identifier, if present
    pub source: Option<String>,
    /// Named numeric feature values (spectral bands, entropy measures, ...)
    pub features: HashMap<String, f64>,
}

/// One row of the epoch feature table, covering every channel.
///
/// Epoch indices are contiguous from 0; the synthetic `Aggregated` channel
/// carries the cross-channel stage vote and all unprefixed feature columns.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochFeatures {
    /// Zero-based index of the fixed-width 30-second window
    pub epoch: u32,
    /// Wall-clock instant of the epoch start
    pub timestamp: DateTime<FixedOffset>,
    /// Aggregated predicted stage label
    pub stage: Option<String>,
    /// Aggregated prediction confidence
    pub confidence: Option<f64>,
    /// Aggregated prediction source
    pub source: Option<String>,
    /// Integer stage encoding, when the table carries one
    pub stage_int: Option<i32>,
    /// Stage applied by a human scorer in an earlier pass, if any
    pub manual_stage: Option<String>,
    pub definitely_awake: Option<bool>,
    pub definitely_sleep: Option<bool>,
    pub probably_sleep: Option<bool>,
    pub predicted_awake: Option<f64>,
    pub predicted_awake_binary: Option<i32>,
    /// Per-channel stage votes and feature values, keyed by channel name
    /// (including the synthetic `Aggregated` channel)
    pub channels: BTreeMap<String, ChannelEpoch>,
}

impl EpochFeatures {
    /// Borrow one channel's slice of this epoch, if present
    pub fn channel(&self, name: &str) -> Option<&ChannelEpoch> {
        self.channels.get(name)
    }
}

// =============================================================================
// Detected Events and Intervals
// =============================================================================

/// One detected signal event (a slow wave or a spindle), with offsets in
/// seconds from the recording start and the detector's numeric descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    /// Event start, seconds from recording start
    pub start: f64,
    /// Event end, seconds from recording start; never before `start`
    pub end: f64,
    /// Channel the detector attributed the event to
    pub channel: String,
    /// Remaining numeric columns of the detector's summary row
    /// (amplitude, slope, frequency, power, ...)
    pub metrics: HashMap<String, f64>,
}

/// Detected events grouped by channel, preserving each channel's original
/// row order
pub type GroupedEvents = BTreeMap<String, Vec<SignalEvent>>;

/// One row of the night-event table: a point event with a source and an
/// optional extent
#[derive(Debug, Clone, PartialEq)]
pub struct NightEvent {
    /// Event name as recorded
    pub event: String,
    /// Absolute instant of the event
    pub timestamp: DateTime<FixedOffset>,
    /// Originating system
    pub source: String,
    /// Event duration in seconds
    pub duration_secs: f64,
}

/// One interval of the wearable hypnogram: a coarse state over a time span
#[derive(Debug, Clone, PartialEq)]
pub struct HypnogramInterval {
    pub start: DateTime<FixedOffset>,
    /// Coarse state label, passed through verbatim (wake/light/deep/rem)
    pub state: String,
    pub end: DateTime<FixedOffset>,
}

/// One detected microwaking: a brief wake intrusion bounded by two instants
#[derive(Debug, Clone, PartialEq)]
pub struct Microwaking {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

// =============================================================================
// Human Scoring Store
// =============================================================================

/// Stage vocabulary a human scorer can apply to an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepStage {
    Wake,
    Deep,
    #[serde(rename = "Non-Deep")]
    NonDeep,
    #[serde(rename = "Ambiguous Deep")]
    AmbiguousDeep,
    Unsure,
    Noise,
}

impl SleepStage {
    /// All stages in display order
    pub fn all() -> [SleepStage; 6] {
        [
            SleepStage::Wake,
            SleepStage::Deep,
            SleepStage::NonDeep,
            SleepStage::AmbiguousDeep,
            SleepStage::Unsure,
            SleepStage::Noise,
        ]
    }

    /// The on-disk / display label for this stage
    pub fn label(&self) -> &'static str {
        match self {
            SleepStage::Wake => "Wake",
            SleepStage::Deep => "Deep",
            SleepStage::NonDeep => "Non-Deep",
            SleepStage::AmbiguousDeep => "Ambiguous Deep",
            SleepStage::Unsure => "Unsure",
            SleepStage::Noise => "Noise",
        }
    }
}

impl FromStr for SleepStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Wake" => Ok(SleepStage::Wake),
            "Deep" => Ok(SleepStage::Deep),
            "Non-Deep" => Ok(SleepStage::NonDeep),
            "Ambiguous Deep" => Ok(SleepStage::AmbiguousDeep),
            "Unsure" => Ok(SleepStage::Unsure),
            "Noise" => Ok(SleepStage::Noise),
            other => Err(Error::data_validation(format!(
                "Unknown sleep stage '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SleepStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A freeform tag a scorer attached to an epoch, with the instant it was
/// added (kept as the verbatim instant string the interactive layer wrote)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringTag {
    pub tag: String,
    #[serde(rename = "addedAt")]
    pub added_at: String,
}

/// One human scoring decision for one epoch. At most one entry exists per
/// epoch index; saving is last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringEntry {
    #[serde(rename = "epochIndex")]
    pub epoch_index: u32,
    #[serde(rename = "scoredAt")]
    pub scored_at: String,
    pub stage: SleepStage,
    #[serde(default)]
    pub tags: Vec<ScoringTag>,
}

/// Whether a mark opens or closes a microwaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkKind {
    MicrowakingStart,
    MicrowakingEnd,
}

/// A point-in-time mark placed on a channel by the interactive layer.
/// Timestamps are kept as the verbatim instant strings it wrote; this core
/// only reads and writes them faithfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub channel: String,
    #[serde(rename = "scoredAt")]
    pub scored_at: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: MarkKind,
}

// =============================================================================
// Assembled Recording
// =============================================================================

/// The immutable snapshot a load produces: decoded and aligned signals plus
/// every auxiliary source, each wrapped in its own availability state.
///
/// The loader owns assembly; consumers receive shared references only. The
/// sole mutation this layer supports after assembly is the scoring store
/// (upsert + save), whose persistence contract lives here too.
#[derive(Debug)]
pub struct Recording {
    /// Path of the primary `.edf` file this recording was loaded from
    pub edf_path: PathBuf,
    /// Decoded, timeline-aligned signal data
    pub edf: ProcessedEdf,
    /// Per-epoch feature table
    pub epoch_features: SourceData<Vec<EpochFeatures>>,
    /// Slow-wave events grouped by channel
    pub slow_waves: SourceData<GroupedEvents>,
    /// Spindle events grouped by channel
    pub spindles: SourceData<GroupedEvents>,
    /// Night events
    pub night_events: SourceData<Vec<NightEvent>>,
    /// Wearable hypnogram intervals
    pub fitbit_hypnogram: SourceData<Vec<HypnogramInterval>>,
    /// Detected microwakings
    pub microwakings: SourceData<Vec<Microwaking>>,
    /// Human scoring entries, sorted by epoch index
    pub scorings: Vec<ScoringEntry>,
    /// Interactive-layer marks
    pub marks: Vec<Mark>,
    /// Distribution statistics over every epoch feature observation;
    /// `None` when the feature table was unavailable or empty
    pub feature_stats: Option<FeatureStatsTable>,
    /// Epoch length this recording was loaded with, in seconds
    pub epoch_seconds: f64,
}

impl Recording {
    /// Number of fixed-width epochs the recording spans; a trailing partial
    /// window counts as a full epoch
    pub fn epoch_count(&self) -> usize {
        (self.edf.duration_secs / self.epoch_seconds).ceil() as usize
    }

    /// The epoch index a millisecond offset from the recording start falls
    /// into
    pub fn epoch_index_at(&self, offset_ms: i64) -> u32 {
        (offset_ms as f64 / 1000.0 / self.epoch_seconds).floor() as u32
    }

    /// Insert or replace the scoring for `entry.epoch_index`, keeping the
    /// store sorted by epoch index. Last write wins.
    pub fn upsert_scoring(&mut self, entry: ScoringEntry) {
        self.scorings.retain(|s| s.epoch_index != entry.epoch_index);
        self.scorings.push(entry);
        self.scorings.sort_by_key(|s| s.epoch_index);
    }

    /// Persist the scoring store next to the recording, pretty-printed,
    /// creating parent directories if absent.
    pub fn save_scorings(&self) -> Result<()> {
        let path = crate::loader::CompanionPaths::derive(&self.edf_path).scorings;
        crate::readers::scorings::save_scorings(&path, &self.scorings, &self.marks)
    }
}
