//! Detected-event readers (`*.sw_summary.csv`, `*.spindle_summary.csv`).
//!
//! Both detector outputs share one shape: a `Channel` column, `Start` and
//! `End` offsets in seconds from the recording start, and a variable set of
//! numeric descriptor columns. Rows are grouped by channel with each
//! channel's original row order preserved, since the detectors emit events
//! in time order and downstream overlays rely on that.

use std::collections::HashMap;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{GroupedEvents, SignalEvent};

use super::{read_optional, ColumnMap};

/// Read the slow-wave summary next to a recording, if present.
pub async fn read_slow_waves(path: &Path) -> Result<Option<GroupedEvents>> {
    read_grouped(path, "slow-wave").await
}

/// Read the spindle summary next to a recording, if present.
pub async fn read_spindles(path: &Path) -> Result<Option<GroupedEvents>> {
    read_grouped(path, "spindle").await
}

async fn read_grouped(path: &Path, kind: &str) -> Result<Option<GroupedEvents>> {
    match read_optional(path).await? {
        Some(contents) => {
            let grouped = parse_grouped_events(path, &contents)?;
            debug!(
                file = %path.display(),
                channels = grouped.len(),
                "parsed {} events",
                kind
            );
            Ok(Some(grouped))
        }
        None => Ok(None),
    }
}

/// Parse a detector summary table, grouping rows by channel.
///
/// `Channel`, `Start`, and `End` are required; every other column that
/// parses as a number joins the event's metric map under its column name.
/// Non-numeric extra columns are skipped. An event ending before it starts
/// is a validation error.
pub fn parse_grouped_events(path: &Path, contents: &str) -> Result<GroupedEvents> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::csv_parsing(path.display().to_string(), "missing header row", Some(e)))?
        .clone();
    let columns = ColumnMap::analyze(&headers);

    let channel_col = columns.require(path, "Channel")?;
    let start_col = columns.require(path, "Start")?;
    let end_col = columns.require(path, "End")?;

    let mut grouped = GroupedEvents::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            Error::csv_parsing(
                path.display().to_string(),
                format!("failed to read row {}", row_index + 1),
                Some(e),
            )
        })?;
        let cell = |index: usize| record.get(index).unwrap_or("").trim();

        let channel = cell(channel_col).to_string();
        if channel.is_empty() {
            return Err(Error::data_validation(format!(
                "row {}: event has no channel",
                row_index + 1
            )));
        }

        let start = required_number(path, row_index, "Start", cell(start_col))?;
        let end = required_number(path, row_index, "End", cell(end_col))?;
        if end < start {
            return Err(Error::data_validation(format!(
                "row {}: event on '{}' ends at {}s before it starts at {}s",
                row_index + 1,
                channel,
                end,
                start
            )));
        }

        let mut metrics = HashMap::new();
        for (name, index) in columns.iter() {
            if index == channel_col || index == start_col || index == end_col {
                continue;
            }
            if let Ok(value) = cell(index).parse::<f64>() {
                metrics.insert(name.to_string(), value);
            }
        }

        grouped.entry(channel.clone()).or_default().push(SignalEvent {
            start,
            end,
            channel,
            metrics,
        });
    }

    Ok(grouped)
}

fn required_number(path: &Path, row_index: usize, column: &str, cell: &str) -> Result<f64> {
    cell.parse::<f64>().map_err(|_| {
        Error::csv_parsing(
            path.display().to_string(),
            format!(
                "row {}: column '{}' value '{}' is not a number",
                row_index + 1,
                column,
                cell
            ),
            None,
        )
    })
}
