//! Human scoring store (`*.scorings.json`).
//!
//! The interactive layer persists its per-epoch stage decisions and channel
//! marks as one JSON document, `{ "scorings": [...], "marks": [...] }` in
//! camelCase. This module reads and writes that document faithfully: a
//! missing file reads as two empty arrays (the store is created on first
//! save), writes are pretty-printed, and parent directories are created as
//! needed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Mark, ScoringEntry};

use super::read_optional;

/// On-disk shape of the scoring store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringFile {
    #[serde(default)]
    pub scorings: Vec<ScoringEntry>,
    #[serde(default)]
    pub marks: Vec<Mark>,
}

/// Read the scoring store next to a recording.
///
/// A missing file is the normal state before any scoring has happened and
/// reads as an empty store. Malformed JSON is an error; the caller decides
/// whether that degrades or aborts.
pub async fn read_scorings(path: &Path) -> Result<ScoringFile> {
    match read_optional(path).await? {
        Some(contents) => serde_json::from_str(&contents).map_err(|e| {
            Error::json(
                path.display().to_string(),
                "scoring store is not valid JSON",
                Some(e),
            )
        }),
        None => {
            debug!(file = %path.display(), "no scoring store yet, starting empty");
            Ok(ScoringFile::default())
        }
    }
}

/// Write the scoring store pretty-printed, creating parent directories.
pub fn save_scorings(path: &Path, scorings: &[ScoringEntry], marks: &[Mark]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::io(
                format!("failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    let file = ScoringFile {
        scorings: scorings.to_vec(),
        marks: marks.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file).map_err(|e| {
        Error::json(
            path.display().to_string(),
            "failed to serialize scoring store",
            Some(e),
        )
    })?;

    std::fs::write(path, json)
        .map_err(|e| Error::io(format!("failed to write '{}'", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MarkKind, SleepStage};
    use tempfile::TempDir;

    fn entry(epoch_index: u32, stage: SleepStage) -> ScoringEntry {
        ScoringEntry {
            epoch_index,
            scored_at: "2024-08-27T01:02:03Z".to_string(),
            stage,
            tags: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = read_scorings(&dir.path().join("n.scorings.json")).await.unwrap();
        assert!(store.scorings.is_empty());
        assert!(store.marks.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_reload_round_trips() {
        let dir = TempDir::new().unwrap();
        // Parent directory does not exist yet; save must create it.
        let path = dir.path().join("nested").join("n.scorings.json");

        let scorings = vec![entry(0, SleepStage::Wake), entry(4, SleepStage::Deep)];
        let marks = vec![Mark {
            channel: "Fpz".to_string(),
            scored_at: "2024-08-27T01:02:03Z".to_string(),
            timestamp: "2024-08-26T23:00:00Z".to_string(),
            kind: MarkKind::MicrowakingStart,
        }];
        save_scorings(&path, &scorings, &marks).unwrap();

        let store = read_scorings(&path).await.unwrap();
        assert_eq!(store.scorings, scorings);
        assert_eq!(store.marks, marks);
    }

    #[tokio::test]
    async fn test_double_save_keeps_one_entry_per_epoch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n.scorings.json");

        // Simulate two saves of epoch 4, replicating the upsert the
        // assembled recording performs before each save.
        let mut scorings = vec![entry(4, SleepStage::Deep)];
        save_scorings(&path, &scorings, &[]).unwrap();

        scorings.retain(|s| s.epoch_index != 4);
        scorings.push(entry(4, SleepStage::Wake));
        scorings.sort_by_key(|s| s.epoch_index);
        save_scorings(&path, &scorings, &[]).unwrap();

        let store = read_scorings(&path).await.unwrap();
        assert_eq!(store.scorings.len(), 1);
        assert_eq!(store.scorings[0].epoch_index, 4);
        assert_eq!(store.scorings[0].stage, SleepStage::Wake);
    }

    #[tokio::test]
    async fn test_malformed_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n.scorings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = read_scorings(&path).await.unwrap_err();
        assert!(err.to_string().contains("scorings.json"));
    }

    #[test]
    fn test_written_document_is_pretty_camel_case() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n.scorings.json");
        save_scorings(&path, &[entry(2, SleepStage::NonDeep)], &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"epochIndex\": 2"));
        assert!(text.contains("\"Non-Deep\""));
        assert!(text.contains('\n'));
    }
}
