//! Epoch feature table reader (`*.with_features.csv`).
//!
//! One row per 30-second epoch. A fixed set of typed columns describes the
//! aggregated prediction; every other column is either channel-prefixed
//! (`<Channel>_<Feature>`) or an unprefixed numeric feature belonging to the
//! synthetic `Aggregated` channel. Channels are discovered from the header
//! row by looking for `<Channel>_Stage` / `<Channel>_Confidence` columns,
//! so the reader needs no channel list up front.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::constants::AGGREGATED_CHANNEL;
use crate::error::{Error, Result};
use crate::model::{ChannelEpoch, EpochFeatures};
use crate::timestamp::parse_timestamp;

use super::{lenient_f64, parse_bool_cell, read_optional, ColumnMap};

/// Typed columns of the aggregated prediction; everything else in the row
/// is a feature cell.
const TYPED_COLUMNS: &[&str] = &[
    "Epoch",
    "Timestamp",
    "Stage",
    "Confidence",
    "Source",
    "StageInt",
    "ManualStage",
    "DefinitelyAwake",
    "DefinitelySleep",
    "ProbablySleep",
    "PredictedAwake",
    "PredictedAwakeBinary",
];

/// Read the epoch feature table next to a recording, if present.
///
/// The table can run to tens of thousands of rows, so the parse happens on
/// a blocking thread rather than the async executor.
pub async fn read_features(path: &Path) -> Result<Option<Vec<EpochFeatures>>> {
    match read_optional(path).await? {
        Some(contents) => {
            let path = path.to_path_buf();
            let parsed =
                tokio::task::spawn_blocking(move || parse_features(&path, &contents))
                    .await
                    .map_err(|e| Error::task_join(e.to_string()))??;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Parse the feature table from its raw contents.
///
/// Fails on a missing `Epoch`/`Timestamp` column, an unparseable epoch
/// index or timestamp, or non-contiguous epoch indices. Numeric feature
/// cells never fail the row; unparseable ones become NaN.
pub fn parse_features(path: &Path, contents: &str) -> Result<Vec<EpochFeatures>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::csv_parsing(path.display().to_string(), "missing header row", Some(e)))?
        .clone();
    let columns = ColumnMap::analyze(&headers);

    let epoch_col = columns.require(path, "Epoch")?;
    let timestamp_col = columns.require(path, "Timestamp")?;

    let channels = discover_channels(&columns);
    debug!(
        file = %path.display(),
        channels = channels.len(),
        "parsing epoch feature table"
    );

    let mut epochs = Vec::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            Error::csv_parsing(
                path.display().to_string(),
                format!("failed to read row {}", row_index + 1),
                Some(e),
            )
        })?;
        let cell = |index: usize| record.get(index).unwrap_or("").trim();

        let epoch: u32 = cell(epoch_col).parse().map_err(|_| {
            Error::data_validation(format!(
                "row {}: epoch index '{}' is not an integer",
                row_index + 1,
                cell(epoch_col)
            ))
        })?;
        if epoch as usize != row_index {
            return Err(Error::data_validation(format!(
                "epoch indices must be contiguous from 0: row {} carries epoch {}",
                row_index + 1,
                epoch
            )));
        }

        let timestamp = parse_timestamp(cell(timestamp_col))?;

        let mut channel_map: BTreeMap<String, ChannelEpoch> = BTreeMap::new();
        let mut aggregated = ChannelEpoch {
            stage: optional_text(&columns, &record, "Stage"),
            confidence: optional_number(&columns, &record, "Confidence"),
            source: optional_text(&columns, &record, "Source"),
            features: HashMap::new(),
        };

        for (name, index) in columns.iter() {
            if TYPED_COLUMNS.contains(&name) {
                continue;
            }
            match split_channel_column(name, &channels) {
                Some((channel, field)) => {
                    let entry = channel_map.entry(channel.to_string()).or_default();
                    let value = cell(index);
                    match field {
                        "Stage" => entry.stage = non_empty(value),
                        "Confidence" => entry.confidence = finite(lenient_f64(value)),
                        "Source" => entry.source = non_empty(value),
                        _ => {
                            entry.features.insert(field.to_string(), lenient_f64(value));
                        }
                    }
                }
                None => {
                    // Unprefixed feature columns, Predictions_* included,
                    // belong to the aggregated channel.
                    aggregated
                        .features
                        .insert(name.to_string(), lenient_f64(cell(index)));
                }
            }
        }
        channel_map.insert(AGGREGATED_CHANNEL.to_string(), aggregated);

        epochs.push(EpochFeatures {
            epoch,
            timestamp,
            stage: optional_text(&columns, &record, "Stage"),
            confidence: optional_number(&columns, &record, "Confidence"),
            source: optional_text(&columns, &record, "Source"),
            stage_int: optional_int(&columns, &record, "StageInt"),
            manual_stage: optional_text(&columns, &record, "ManualStage"),
            definitely_awake: optional_bool(&columns, &record, "DefinitelyAwake"),
            definitely_sleep: optional_bool(&columns, &record, "DefinitelySleep"),
            probably_sleep: optional_bool(&columns, &record, "ProbablySleep"),
            predicted_awake: optional_number(&columns, &record, "PredictedAwake"),
            predicted_awake_binary: optional_int(&columns, &record, "PredictedAwakeBinary"),
            channels: channel_map,
        });
    }

    Ok(epochs)
}

/// Channels are the prefixes of `<Channel>_Stage` / `<Channel>_Confidence`
/// columns.
fn discover_channels(columns: &ColumnMap) -> BTreeSet<String> {
    columns
        .iter()
        .filter_map(|(name, _)| {
            name.strip_suffix("_Stage")
                .or_else(|| name.strip_suffix("_Confidence"))
        })
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a column into its channel prefix and field name, if it belongs to
/// a discovered channel. Longest prefix wins so channel names containing
/// underscores resolve correctly.
fn split_channel_column<'a>(
    name: &'a str,
    channels: &BTreeSet<String>,
) -> Option<(&'a str, &'a str)> {
    channels
        .iter()
        .filter_map(|channel| {
            name.strip_prefix(channel.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| (&name[..channel.len()], field))
        })
        .max_by_key(|(channel, _)| channel.len())
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn finite(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

fn optional_text(columns: &ColumnMap, record: &csv::StringRecord, name: &str) -> Option<String> {
    columns
        .get(name)
        .and_then(|i| record.get(i))
        .map(str::trim)
        .and_then(non_empty)
}

fn optional_number(columns: &ColumnMap, record: &csv::StringRecord, name: &str) -> Option<f64> {
    columns
        .get(name)
        .and_then(|i| record.get(i))
        .and_then(|cell| finite(lenient_f64(cell)))
}

fn optional_int(columns: &ColumnMap, record: &csv::StringRecord, name: &str) -> Option<i32> {
    columns
        .get(name)
        .and_then(|i| record.get(i))
        .and_then(|cell| cell.trim().parse::<i32>().ok())
}

fn optional_bool(columns: &ColumnMap, record: &csv::StringRecord, name: &str) -> Option<bool> {
    columns
        .get(name)
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(parse_bool_cell)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Epoch,Timestamp,Stage,Confidence,Source,StageInt,DefinitelyAwake,\
                          eeg_alpha,Predictions_model_a,Fpz_Stage,Fpz_Confidence,Fpz_eeg_alpha";

    fn table(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn test_channels_discovered_from_suffix_columns() {
        let contents = table(&[
            "0,2024-08-26 22:00:00+01:00,Deep,0.9,yasa,3,False,1.5,0.2,Deep,0.8,2.5",
        ]);
        let epochs = parse_features(Path::new("t.with_features.csv"), &contents).unwrap();

        assert_eq!(epochs.len(), 1);
        let epoch = &epochs[0];
        assert_eq!(epoch.epoch, 0);
        assert_eq!(epoch.stage.as_deref(), Some("Deep"));
        assert_eq!(epoch.confidence, Some(0.9));
        assert_eq!(epoch.stage_int, Some(3));
        assert_eq!(epoch.definitely_awake, Some(false));

        let channels: Vec<&str> = epoch.channels.keys().map(String::as_str).collect();
        assert_eq!(channels, vec!["Aggregated", "Fpz"]);

        let fpz = epoch.channel("Fpz").unwrap();
        assert_eq!(fpz.stage.as_deref(), Some("Deep"));
        assert_eq!(fpz.confidence, Some(0.8));
        assert_eq!(fpz.features.get("eeg_alpha"), Some(&2.5));
    }

    #[test]
    fn test_unprefixed_features_land_on_aggregated() {
        let contents = table(&[
            "0,2024-08-26 22:00:00+01:00,Deep,0.9,yasa,3,False,1.5,0.2,Deep,0.8,2.5",
        ]);
        let epochs = parse_features(Path::new("t.with_features.csv"), &contents).unwrap();

        let aggregated = epochs[0].channel("Aggregated").unwrap();
        assert_eq!(aggregated.features.get("eeg_alpha"), Some(&1.5));
        assert_eq!(aggregated.features.get("Predictions_model_a"), Some(&0.2));
        assert_eq!(aggregated.stage.as_deref(), Some("Deep"));
    }

    #[test]
    fn test_unparseable_feature_cell_is_nan_not_fatal() {
        let contents = table(&[
            "0,2024-08-26 22:00:00+01:00,Deep,0.9,yasa,3,False,oops,0.2,Deep,0.8,2.5",
        ]);
        let epochs = parse_features(Path::new("t.with_features.csv"), &contents).unwrap();
        let aggregated = epochs[0].channel("Aggregated").unwrap();
        assert!(aggregated.features.get("eeg_alpha").unwrap().is_nan());
    }

    #[test]
    fn test_non_contiguous_epochs_fail() {
        let contents = table(&[
            "0,2024-08-26 22:00:00+01:00,Deep,0.9,yasa,3,False,1.0,0.2,Deep,0.8,2.5",
            "2,2024-08-26 22:01:00+01:00,Deep,0.9,yasa,3,False,1.0,0.2,Deep,0.8,2.5",
        ]);
        let err = parse_features(Path::new("t.with_features.csv"), &contents).unwrap_err();
        assert!(err.to_string().contains("contiguous"));
    }

    #[test]
    fn test_missing_required_column_names_it() {
        let err =
            parse_features(Path::new("t.with_features.csv"), "Timestamp,Stage\nx,y").unwrap_err();
        assert!(err.to_string().contains("Epoch"));
    }

    #[test]
    fn test_bad_timestamp_is_fatal() {
        let contents = table(&[
            "0,not a time,Deep,0.9,yasa,3,False,1.0,0.2,Deep,0.8,2.5",
        ]);
        assert!(parse_features(Path::new("t.with_features.csv"), &contents).is_err());
    }

    #[tokio::test]
    async fn test_absent_file_reads_as_none() {
        let result = read_features(Path::new("/nonexistent/t.with_features.csv"))
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
