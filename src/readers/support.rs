//! Shared helpers for the companion-file readers.
//!
//! Every CSV companion is read the same way: the file is optional (absence
//! is an expected condition, not an error), columns are located by header
//! name rather than position, and numeric feature cells degrade to NaN
//! instead of failing the row.

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;

use crate::error::{Error, Result};

/// Read a companion file to a string, mapping absence to `Ok(None)`.
///
/// Any other I/O failure is a real error and propagates.
pub async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(
            format!("failed to read '{}'", path.display()),
            e,
        )),
    }
}

/// Column name to index mapping built from a CSV header row.
///
/// Readers resolve every column through this map so files remain valid
/// under column reordering, and missing required columns fail with the
/// column and file named.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: HashMap<String, usize>,
}

impl ColumnMap {
    /// Build the mapping from a parsed header row
    pub fn analyze(headers: &StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect();
        Self { columns }
    }

    /// Index of an optional column
    pub fn get(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    /// Index of a required column, or a missing-column error naming the file
    pub fn require(&self, file: &Path, name: &str) -> Result<usize> {
        self.get(name)
            .ok_or_else(|| Error::missing_column(file.display().to_string(), name))
    }

    /// Iterate over all `(name, index)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|(name, &index)| (name.as_str(), index))
    }
}

/// Parse a numeric cell leniently: empty or malformed cells become NaN.
///
/// The feature tables carry occasional artifact cells; a single bad value
/// must not discard the whole epoch row.
pub fn lenient_f64(cell: &str) -> f64 {
    cell.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Boolean-like cells are the literal strings `True` / `False`; anything
/// else reads as false, matching the exporter.
pub fn parse_bool_cell(cell: &str) -> bool {
    cell.trim() == "True"
}
