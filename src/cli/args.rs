//! Command-line argument definitions for the PSG loader
//!
//! Defines the complete CLI interface using the clap derive API.

use crate::constants::EPOCH_SECONDS;
use crate::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the PSG recording loader
///
/// Decodes overnight EDF+ recordings together with the companion files an
/// analysis pipeline leaves next to them.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "psg-loader",
    version,
    about = "Load and inspect overnight polysomnography recordings",
    long_about = "Decodes EDF+ recordings with digital-to-physical rescaling, reads every \
                  companion file found next to the recording (epoch features, detected slow \
                  waves and spindles, night events, wearable hypnogram, microwakings, human \
                  scorings), aligns all of it onto one timeline and reports the result."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output, log warnings only
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Decode and print a recording's header and channel table
    Header(HeaderArgs),
    /// Load a recording with every companion source and summarize it
    Load(LoadArgs),
    /// Load a recording and print its feature statistics table
    Stats(LoadArgs),
}

/// Arguments for the header command
#[derive(Debug, Clone, Parser)]
pub struct HeaderArgs {
    /// Path to the EDF+ recording
    #[arg(value_name = "FILE")]
    pub edf_path: PathBuf,
}

/// Arguments for the load and stats commands
#[derive(Debug, Clone, Parser)]
pub struct LoadArgs {
    /// Path to the EDF+ recording
    #[arg(value_name = "FILE")]
    pub edf_path: PathBuf,

    /// Scoring epoch length in seconds
    #[arg(long = "epoch-seconds", value_name = "SECS", default_value_t = EPOCH_SECONDS)]
    pub epoch_seconds: f64,

    /// Treat auxiliary read failures as fatal instead of degrading them
    #[arg(long = "strict")]
    pub strict: bool,
}

impl Args {
    /// The tracing level implied by the verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

impl LoadArgs {
    /// Validate argument combinations before doing any work
    pub fn validate(&self) -> Result<()> {
        if self.epoch_seconds <= 0.0 {
            return Err(Error::configuration(format!(
                "epoch length must be positive, got {}",
                self.epoch_seconds
            )));
        }
        Ok(())
    }
}
