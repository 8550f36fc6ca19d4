//! Concurrent load orchestration.
//!
//! Given a primary `.edf` path, the loader derives every companion path by
//! suffix substitution, fires the binary decode and all auxiliary readers
//! concurrently, then aligns the decoded signals onto the timeline, computes
//! feature statistics, and assembles one immutable [`Recording`].
//!
//! Failure policy follows the data dependencies: the primary decode is
//! fatal on error because every other source is indexed relative to it,
//! while an absent or unreadable auxiliary source degrades to
//! [`SourceData::Unavailable`] without disturbing the rest (unless strict
//! auxiliary mode is on).
//!
//! Progress is reported over an explicit channel handed in by the caller;
//! the loader never touches any global event machinery.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::constants::{companions, EDF_SUFFIX};
use crate::error::{Error, Result};
use crate::model::{Recording, SourceData};
use crate::readers;
use crate::{edf, stats};

/// Sibling file paths derived from the primary recording path by replacing
/// its `.edf` suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanionPaths {
    pub features: PathBuf,
    pub slow_waves: PathBuf,
    pub night_events: PathBuf,
    pub fitbit_hypnogram: PathBuf,
    pub spindles: PathBuf,
    pub scorings: PathBuf,
    pub microwakings: PathBuf,
}

impl CompanionPaths {
    /// Derive every companion path from the primary recording path.
    pub fn derive(edf_path: &Path) -> Self {
        let text = edf_path.to_string_lossy();
        let stem = text.strip_suffix(EDF_SUFFIX).unwrap_or(&text);
        let with = |suffix: &str| PathBuf::from(format!("{}{}", stem, suffix));
        Self {
            features: with(companions::FEATURES),
            slow_waves: with(companions::SLOW_WAVES),
            night_events: with(companions::NIGHT_EVENTS),
            fitbit_hypnogram: with(companions::FITBIT_HYPNOGRAM),
            spindles: with(companions::SPINDLES),
            scorings: with(companions::SCORINGS),
            microwakings: with(companions::MICROWAKINGS),
        }
    }
}

/// Phases a load moves through, in the order they can complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    EdfDecode,
    EpochFeatures,
    SlowWaves,
    Spindles,
    NightEvents,
    FitbitHypnogram,
    Microwakings,
    Scorings,
    TimelineAlignment,
    Statistics,
}

impl LoadPhase {
    /// Human-readable phase name for progress display
    pub fn label(&self) -> &'static str {
        match self {
            LoadPhase::EdfDecode => "EDF decode",
            LoadPhase::EpochFeatures => "epoch features",
            LoadPhase::SlowWaves => "slow waves",
            LoadPhase::Spindles => "spindles",
            LoadPhase::NightEvents => "night events",
            LoadPhase::FitbitHypnogram => "fitbit hypnogram",
            LoadPhase::Microwakings => "microwakings",
            LoadPhase::Scorings => "scorings",
            LoadPhase::TimelineAlignment => "timeline alignment",
            LoadPhase::Statistics => "statistics",
        }
    }
}

/// Progress notifications emitted over the caller's channel during a load
#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// The load began
    Started { path: PathBuf },
    /// One phase finished successfully
    PhaseFinished { phase: LoadPhase, elapsed: Duration },
    /// An auxiliary source was absent or failed and was degraded
    SourceUnavailable { phase: LoadPhase, reason: String },
    /// The whole load finished
    Finished { elapsed: Duration },
}

/// Orchestrates the concurrent load of a recording and its companions.
pub struct Loader {
    config: LoaderConfig,
    progress: Option<UnboundedSender<LoadEvent>>,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Attach a progress channel; every [`LoadEvent`] of subsequent loads
    /// is sent to it.
    pub fn with_progress(mut self, sender: UnboundedSender<LoadEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Load a recording and every companion source concurrently.
    ///
    /// Fails only on a primary-file decode error, an I/O error on the
    /// primary file, or (in strict auxiliary mode) any auxiliary failure.
    pub async fn load(&self, edf_path: &Path) -> Result<Recording> {
        let started = Instant::now();
        info!(path = %edf_path.display(), "loading recording");
        self.emit(LoadEvent::Started {
            path: edf_path.to_path_buf(),
        });

        let paths = CompanionPaths::derive(edf_path);

        // The primary decode is CPU-bound and runs on a blocking thread;
        // the feature reader does the same internally. The small table
        // readers stay inline.
        let decode_task = self.timed(LoadPhase::EdfDecode, async {
            let path = edf_path.to_path_buf();
            tokio::task::spawn_blocking(move || edf::decoder::read_file(&path))
                .await
                .map_err(|e| Error::task_join(e.to_string()))?
        });
        let features_task = self.timed(
            LoadPhase::EpochFeatures,
            readers::features::read_features(&paths.features),
        );
        let slow_waves_task = self.timed(
            LoadPhase::SlowWaves,
            readers::events::read_slow_waves(&paths.slow_waves),
        );
        let spindles_task = self.timed(
            LoadPhase::Spindles,
            readers::events::read_spindles(&paths.spindles),
        );
        let night_events_task = self.timed(
            LoadPhase::NightEvents,
            readers::night_events::read_night_events(&paths.night_events),
        );
        let hypnogram_task = self.timed(
            LoadPhase::FitbitHypnogram,
            readers::hypnogram::read_hypnogram(&paths.fitbit_hypnogram),
        );
        let microwakings_task = self.timed(
            LoadPhase::Microwakings,
            readers::microwakings::read_microwakings(&paths.microwakings),
        );
        let scorings_task = self.timed(
            LoadPhase::Scorings,
            readers::scorings::read_scorings(&paths.scorings),
        );

        let (decoded, features, slow_waves, spindles, night_events, hypnogram, microwakings, scorings) = tokio::join!(
            decode_task,
            features_task,
            slow_waves_task,
            spindles_task,
            night_events_task,
            hypnogram_task,
            microwakings_task,
            scorings_task,
        );

        // Primary decode failure aborts; everything downstream is indexed
        // relative to it.
        let decoded = decoded?;

        let epoch_features = self.settle(LoadPhase::EpochFeatures, features)?;
        let slow_waves = self.settle(LoadPhase::SlowWaves, slow_waves)?;
        let spindles = self.settle(LoadPhase::Spindles, spindles)?;
        let night_events = self.settle(LoadPhase::NightEvents, night_events)?;
        let fitbit_hypnogram = self.settle(LoadPhase::FitbitHypnogram, hypnogram)?;
        let microwakings = self.settle(LoadPhase::Microwakings, microwakings)?;
        let scoring_file = self.settle_scorings(scorings)?;

        let align_started = Instant::now();
        let edf = edf::timeline::process(decoded, &self.config)?;
        self.emit(LoadEvent::PhaseFinished {
            phase: LoadPhase::TimelineAlignment,
            elapsed: align_started.elapsed(),
        });

        let stats_started = Instant::now();
        let feature_stats = epoch_features.available().and_then(|epochs| stats::compute(epochs));
        self.emit(LoadEvent::PhaseFinished {
            phase: LoadPhase::Statistics,
            elapsed: stats_started.elapsed(),
        });

        let elapsed = started.elapsed();
        info!(
            path = %edf_path.display(),
            signals = edf.signals.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "recording loaded"
        );
        self.emit(LoadEvent::Finished { elapsed });

        Ok(Recording {
            edf_path: edf_path.to_path_buf(),
            edf,
            epoch_features,
            slow_waves,
            spindles,
            night_events,
            fitbit_hypnogram,
            microwakings,
            scorings: scoring_file.scorings,
            marks: scoring_file.marks,
            feature_stats,
            epoch_seconds: self.config.epoch_seconds,
        })
    }

    /// Run one source's future, emitting a phase-completion event when it
    /// resolves successfully.
    async fn timed<T>(
        &self,
        phase: LoadPhase,
        task: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        let phase_started = Instant::now();
        let result = task.await;
        if result.is_ok() {
            self.emit(LoadEvent::PhaseFinished {
                phase,
                elapsed: phase_started.elapsed(),
            });
        }
        result
    }

    /// Fold one auxiliary outcome into its availability state. Absence and
    /// failure both degrade; failure is fatal only in strict mode.
    fn settle<T>(&self, phase: LoadPhase, outcome: Result<Option<T>>) -> Result<SourceData<T>> {
        match outcome {
            Ok(Some(value)) => Ok(SourceData::Available(value)),
            Ok(None) => {
                debug!(source = phase.label(), "companion file not present");
                self.emit(LoadEvent::SourceUnavailable {
                    phase,
                    reason: "file not found".to_string(),
                });
                Ok(SourceData::unavailable("file not found"))
            }
            Err(e) if self.config.strict_auxiliary => Err(e),
            Err(e) => {
                warn!(source = phase.label(), error = %e, "companion source degraded");
                self.emit(LoadEvent::SourceUnavailable {
                    phase,
                    reason: e.to_string(),
                });
                Ok(SourceData::unavailable(e.to_string()))
            }
        }
    }

    /// The scoring store always yields concrete arrays; a failed read
    /// degrades to an empty store outside strict mode.
    fn settle_scorings(
        &self,
        outcome: Result<readers::scorings::ScoringFile>,
    ) -> Result<readers::scorings::ScoringFile> {
        match outcome {
            Ok(file) => Ok(file),
            Err(e) if self.config.strict_auxiliary => Err(e),
            Err(e) => {
                warn!(error = %e, "scoring store unreadable, starting empty");
                self.emit(LoadEvent::SourceUnavailable {
                    phase: LoadPhase::Scorings,
                    reason: e.to_string(),
                });
                Ok(readers::scorings::ScoringFile::default())
            }
        }
    }

    fn emit(&self, event: LoadEvent) {
        if let Some(sender) = &self.progress {
            // A dropped receiver just means nobody is watching.
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_companion_paths_by_suffix_substitution() {
        let paths = CompanionPaths::derive(Path::new("/data/night_2024-08-26.edf"));
        assert_eq!(
            paths.features,
            PathBuf::from("/data/night_2024-08-26.with_features.csv")
        );
        assert_eq!(
            paths.scorings,
            PathBuf::from("/data/night_2024-08-26.scorings.json")
        );
        assert_eq!(
            paths.microwakings,
            PathBuf::from("/data/night_2024-08-26.microwakings.csv")
        );
    }

    #[test]
    fn test_derive_without_edf_suffix_appends() {
        let paths = CompanionPaths::derive(Path::new("/data/night"));
        assert_eq!(
            paths.night_events,
            PathBuf::from("/data/night.night_events.csv")
        );
    }

    #[test]
    fn test_settle_degrades_failures_by_default() {
        let loader = Loader::new(LoaderConfig::default());
        let outcome: Result<Option<Vec<i32>>> =
            Err(Error::data_validation("broken table"));
        let settled = loader.settle(LoadPhase::NightEvents, outcome).unwrap();
        assert!(!settled.is_available());
        assert!(settled.unavailable_reason().unwrap().contains("broken table"));
    }

    #[test]
    fn test_settle_is_fatal_in_strict_mode() {
        let loader = Loader::new(LoaderConfig::default().with_strict_auxiliary());
        let outcome: Result<Option<Vec<i32>>> =
            Err(Error::data_validation("broken table"));
        assert!(loader.settle(LoadPhase::NightEvents, outcome).is_err());
    }
}
