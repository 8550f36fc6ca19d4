//! Wearable hypnogram reader (`*.fitbit_hypnogram.csv`).
//!
//! Coarse sleep-state intervals exported from a wearable. State labels are
//! passed through verbatim; only the interval timing is validated (each
//! interval time-ordered, intervals non-overlapping in file order).

use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{Error, Result};
use crate::model::HypnogramInterval;
use crate::timestamp::{epoch_millis, parse_timestamp};

use super::{read_optional, ColumnMap};

/// Read the wearable hypnogram next to a recording, if present.
pub async fn read_hypnogram(path: &Path) -> Result<Option<Vec<HypnogramInterval>>> {
    match read_optional(path).await? {
        Some(contents) => Ok(Some(parse_hypnogram(path, &contents)?)),
        None => Ok(None),
    }
}

/// Parse the hypnogram table from its raw contents.
pub fn parse_hypnogram(path: &Path, contents: &str) -> Result<Vec<HypnogramInterval>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::csv_parsing(path.display().to_string(), "missing header row", Some(e)))?
        .clone();
    let columns = ColumnMap::analyze(&headers);

    let start_col = columns.require(path, "startTime")?;
    let state_col = columns.require(path, "state")?;
    let end_col = columns.require(path, "endTime")?;

    let mut intervals: Vec<HypnogramInterval> = Vec::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            Error::csv_parsing(
                path.display().to_string(),
                format!("failed to read row {}", row_index + 1),
                Some(e),
            )
        })?;
        let cell = |index: usize| record.get(index).unwrap_or("").trim();

        let start = parse_timestamp(cell(start_col))?;
        let end = parse_timestamp(cell(end_col))?;
        if epoch_millis(&end) < epoch_millis(&start) {
            return Err(Error::data_validation(format!(
                "row {}: hypnogram interval ends before it starts",
                row_index + 1
            )));
        }
        if let Some(previous) = intervals.last() {
            if epoch_millis(&start) < epoch_millis(&previous.end) {
                return Err(Error::data_validation(format!(
                    "row {}: hypnogram interval overlaps the previous one",
                    row_index + 1
                )));
            }
        }

        intervals.push(HypnogramInterval {
            start,
            state: cell(state_col).to_string(),
            end,
        });
    }

    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_ordered_intervals() {
        let contents = "startTime,state,endTime\n\
                        2024-08-26T22:00:00Z,light,2024-08-26T22:30:00Z\n\
                        2024-08-26T22:30:00Z,deep,2024-08-26T23:10:00Z\n";
        let intervals = parse_hypnogram(Path::new("t.fitbit_hypnogram.csv"), contents).unwrap();

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].state, "light");
        assert_eq!(intervals[1].state, "deep");
    }

    #[test]
    fn test_state_label_passes_through_verbatim() {
        let contents = "startTime,state,endTime\n\
                        2024-08-26T22:00:00Z,REM-ish?,2024-08-26T22:30:00Z\n";
        let intervals = parse_hypnogram(Path::new("t.fitbit_hypnogram.csv"), contents).unwrap();
        assert_eq!(intervals[0].state, "REM-ish?");
    }

    #[test]
    fn test_overlapping_intervals_fail() {
        let contents = "startTime,state,endTime\n\
                        2024-08-26T22:00:00Z,light,2024-08-26T22:30:00Z\n\
                        2024-08-26T22:20:00Z,deep,2024-08-26T23:00:00Z\n";
        let err = parse_hypnogram(Path::new("t.fitbit_hypnogram.csv"), contents).unwrap_err();
        assert!(err.to_string().contains("overlaps"));
    }

    #[test]
    fn test_reversed_interval_fails() {
        let contents = "startTime,state,endTime\n\
                        2024-08-26T23:00:00Z,light,2024-08-26T22:00:00Z\n";
        assert!(parse_hypnogram(Path::new("t.fitbit_hypnogram.csv"), contents).is_err());
    }
}
