//! Night-event reader (`*.night_events.csv`).
//!
//! Point events recorded during the night by external systems (lights off,
//! supplement taken, alarm). Each row carries an event name, an absolute
//! timestamp, the originating system, and a duration in seconds.

use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{Error, Result};
use crate::model::NightEvent;
use crate::timestamp::parse_timestamp;

use super::{read_optional, ColumnMap};

/// Read the night-event table next to a recording, if present.
pub async fn read_night_events(path: &Path) -> Result<Option<Vec<NightEvent>>> {
    match read_optional(path).await? {
        Some(contents) => Ok(Some(parse_night_events(path, &contents)?)),
        None => Ok(None),
    }
}

/// Parse the night-event table from its raw contents.
pub fn parse_night_events(path: &Path, contents: &str) -> Result<Vec<NightEvent>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::csv_parsing(path.display().to_string(), "missing header row", Some(e)))?
        .clone();
    let columns = ColumnMap::analyze(&headers);

    let event_col = columns.require(path, "event")?;
    let timestamp_col = columns.require(path, "timestamp_uk")?;
    let source_col = columns.require(path, "source")?;
    let duration_col = columns.require(path, "duration_secs")?;

    let mut events = Vec::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            Error::csv_parsing(
                path.display().to_string(),
                format!("failed to read row {}", row_index + 1),
                Some(e),
            )
        })?;
        let cell = |index: usize| record.get(index).unwrap_or("").trim();

        let duration_secs = cell(duration_col).parse::<f64>().map_err(|_| {
            Error::csv_parsing(
                path.display().to_string(),
                format!(
                    "row {}: duration_secs '{}' is not a number",
                    row_index + 1,
                    cell(duration_col)
                ),
                None,
            )
        })?;

        events.push(NightEvent {
            event: cell(event_col).to_string(),
            timestamp: parse_timestamp(cell(timestamp_col))?,
            source: cell(source_col).to_string(),
            duration_secs,
        });
    }

    Ok(events)
}
