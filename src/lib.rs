//! PSG Loader Library
//!
//! A Rust library for loading overnight polysomnography recordings: an EDF+
//! container of raw signals plus the family of companion files an analysis
//! pipeline derives from it (epoch feature tables, detected slow waves and
//! spindles, night events, a wearable hypnogram, microwakings, and the
//! human scoring store).
//!
//! This library provides tools for:
//! - Decoding the EDF+ binary format with digital-to-physical rescaling
//! - Parsing the heterogeneous timestamp encodings the companion files use
//! - Reading each companion table into a strongly-typed in-memory form
//! - Aligning every source onto one shared timeline anchored at the
//!   recording start instant
//! - Computing per-feature distribution statistics for downstream
//!   normalization
//! - Assembling everything into one immutable [`Recording`] snapshot

pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod timestamp;

pub mod edf {
    pub mod decoder;
    pub mod header;
    pub mod timeline;

    pub use decoder::{decode, read_file, EdfData};
    pub use header::{EdfHeader, SignalHeader};
    pub use timeline::{process, ProcessedEdf, SignalData, TimeLabel};
}

pub mod readers {
    pub mod events;
    pub mod features;
    pub mod hypnogram;
    pub mod microwakings;
    pub mod night_events;
    pub mod scorings;

    mod support;
    pub(crate) use support::{lenient_f64, parse_bool_cell, read_optional, ColumnMap};
}

pub mod loader;
pub mod stats;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::LoaderConfig;
pub use error::{Error, Result};
pub use loader::{CompanionPaths, LoadEvent, LoadPhase, Loader};
pub use model::{Recording, SourceData};
