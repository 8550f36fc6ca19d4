//! Microwaking reader (`*.microwakings.csv`).
//!
//! Brief wake intrusions detected by a downstream model, each bounded by a
//! start and end instant.

use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{Error, Result};
use crate::model::Microwaking;
use crate::timestamp::{epoch_millis, parse_timestamp};

use super::{read_optional, ColumnMap};

/// Read the microwaking table next to a recording, if present.
pub async fn read_microwakings(path: &Path) -> Result<Option<Vec<Microwaking>>> {
    match read_optional(path).await? {
        Some(contents) => Ok(Some(parse_microwakings(path, &contents)?)),
        None => Ok(None),
    }
}

/// Parse the microwaking table from its raw contents.
pub fn parse_microwakings(path: &Path, contents: &str) -> Result<Vec<Microwaking>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| Error::csv_parsing(path.display().to_string(), "missing header row", Some(e)))?
        .clone();
    let columns = ColumnMap::analyze(&headers);

    let start_col = columns.require(path, "Start")?;
    let end_col = columns.require(path, "End")?;

    let mut microwakings = Vec::new();
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
                "row {}: microwaking ends before it starts",
                row_index + 1
            )));
        }

        microwakings.push(Microwaking { start, end });
    }

    Ok(microwakings)
}
