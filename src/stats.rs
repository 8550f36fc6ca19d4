//! Distribution statistics over epoch feature values.
//!
//! After a load, every numeric feature gets a min/max/spread summary
//! computed over all of its (epoch, channel) observations. Downstream
//! color-coding normalizes against these, so the scan happens exactly once
//! per load rather than per rendered frame.

use std::collections::BTreeMap;

use tracing::debug;

use crate::constants::{AGGREGATED_CHANNEL, PERCENTILE_RANKS};
use crate::model::EpochFeatures;

/// Summary of one feature's value distribution across the recording
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStats {
    pub min: f64,
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

/// Per-feature statistics, keyed by feature name
pub type FeatureStatsTable = BTreeMap<String, FeatureStats>;

/// Compute distribution statistics over every feature observation.
///
/// Feature names come from one representative channel of the first epoch
/// (the synthetic aggregated channel when present, otherwise the first).
/// Values are then accumulated across every epoch and every channel that
/// carries the feature; NaN observations are skipped. Returns `None` when
/// no epochs were loaded, which is distinct from a zero-filled table.
pub fn compute(epochs: &[EpochFeatures]) -> Option<FeatureStatsTable> {
    let first = epochs.first()?;
    let representative = first
        .channels
        .get(AGGREGATED_CHANNEL)
        .or_else(|| first.channels.values().next())?;

    let feature_names: Vec<String> = representative.features.keys().cloned().collect();
    debug!(
        features = feature_names.len(),
        epochs = epochs.len(),
        "computing feature statistics"
    );

    let mut table = FeatureStatsTable::new();
    for name in feature_names {
        let mut values: Vec<f64> = epochs
            .iter()
            .flat_map(|epoch| epoch.channels.values())
            .filter_map(|channel| channel.features.get(&name))
            .copied()
            .filter(|v| !v.is_nan())
            .collect();
        if values.is_empty() {
            continue;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        table.insert(name, summarize(&values));
    }

    Some(table)
}

/// Summarize one sorted value list
fn summarize(sorted: &[f64]) -> FeatureStats {
    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    let p = |rank: f64| nearest_rank(sorted, rank);
    FeatureStats {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        std_dev: variance.sqrt(),
        p10: p(PERCENTILE_RANKS[0]),
        p25: p(PERCENTILE_RANKS[1]),
        p50: p(PERCENTILE_RANKS[2]),
        p75: p(PERCENTILE_RANKS[3]),
        p90: p(PERCENTILE_RANKS[4]),
    }
}

/// Nearest-rank percentile: `sorted[floor(len * p)]`, no interpolation.
fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    let index = ((sorted.len() as f64 * p).floor() as usize).min(sorted.len() - 1);
    sorted[index]
}
