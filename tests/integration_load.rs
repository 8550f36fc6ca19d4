//! End-to-end load tests over a synthetic recording and its companions.

mod common;

use psg_loader::loader::{LoadEvent, LoadPhase, Loader};
use psg_loader::{LoaderConfig, SourceData};
use tempfile::TempDir;
use tokio::sync::mpsc;

#[tokio::test]
async fn test_full_load_with_all_companions() {
    let dir = TempDir::new().unwrap();
    let edf_path = common::write_recording(dir.path());
    common::write_all_companions(&edf_path);

    let recording = Loader::new(LoaderConfig::default())
        .load(&edf_path)
        .await
        .unwrap();

    // Signals decoded and aligned.
    assert_eq!(recording.edf.signals.len(), 2);
    assert_eq!(recording.edf.duration_secs, 2.0);
    assert_eq!(recording.edf.signals[0].label, "Fpz");
    assert_eq!(recording.edf.signals[0].sampling_rate, 4.0);
    assert_eq!(recording.edf.signals[0].samples.len(), 8);
    assert_eq!(recording.edf.signals[1].samples.len(), 4);

    // Every companion came back available.
    let epochs = recording.epoch_features.available().unwrap();
    assert_eq!(epochs.len(), 3);
    assert_eq!(epochs[1].channel("Aggregated").unwrap().features["eeg_alpha"], 5.0);

    let slow_waves = recording.slow_waves.available().unwrap();
    assert_eq!(slow_waves["Fpz"].len(), 2);
    assert_eq!(slow_waves["C3"].len(), 1);
    assert!(recording.spindles.is_available());
    assert_eq!(recording.night_events.available().unwrap().len(), 2);
    assert_eq!(recording.fitbit_hypnogram.available().unwrap().len(), 2);
    assert_eq!(recording.microwakings.available().unwrap().len(), 1);

    // No scoring store yet; arrays start empty.
    assert!(recording.scorings.is_empty());
    assert!(recording.marks.is_empty());

    // Epoch math against the configured 30-second windows.
    assert_eq!(recording.epoch_count(), 1);
    assert_eq!(recording.epoch_index_at(61_000), 2);

    // Statistics over the aggregated feature: the reference fixture.
    let stats = recording.feature_stats.as_ref().unwrap();
    let alpha = &stats["eeg_alpha"];
    assert_eq!(alpha.min, 1.0);
    assert_eq!(alpha.max, 6.0);
}

#[tokio::test]
async fn test_absent_night_events_degrades_only_that_source() {
    let dir = TempDir::new().unwrap();
    let edf_path = common::write_recording(dir.path());
    common::write_companion(&edf_path, ".with_features.csv", &common::features_csv());
    // No night_events file on disk.

    let recording = Loader::new(LoaderConfig::default())
        .load(&edf_path)
        .await
        .unwrap();

    assert_eq!(recording.edf.signals.len(), 2);
    assert!(recording.epoch_features.is_available());
    match &recording.night_events {
        SourceData::Unavailable { reason } => assert!(reason.contains("not found")),
        SourceData::Available(_) => panic!("night events should be unavailable"),
    }
}

#[tokio::test]
async fn test_missing_primary_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let edf_path = dir.path().join("absent.edf");

    let result = Loader::new(LoaderConfig::default()).load(&edf_path).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_corrupt_auxiliary_degrades_by_default_but_fails_strict() {
    let dir = TempDir::new().unwrap();
    let edf_path = common::write_recording(dir.path());
    // End before start makes the table invalid, not just absent.
    common::write_companion(&edf_path, ".sw_summary.csv", "Start,End,Channel\n5.0,4.0,Fpz\n");

    let recording = Loader::new(LoaderConfig::default())
        .load(&edf_path)
        .await
        .unwrap();
    assert!(!recording.slow_waves.is_available());
    assert!(recording
        .slow_waves
        .unavailable_reason()
        .unwrap()
        .contains("before it starts"));

    let strict = Loader::new(LoaderConfig::default().with_strict_auxiliary())
        .load(&edf_path)
        .await;
    assert!(strict.is_err());
}

#[tokio::test]
async fn test_progress_events_are_ordered() {
    let dir = TempDir::new().unwrap();
    let edf_path = common::write_recording(dir.path());
    common::write_all_companions(&edf_path);

    let (sender, mut receiver) = mpsc::unbounded_channel();
    Loader::new(LoaderConfig::default())
        .with_progress(sender)
        .load(&edf_path)
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(LoadEvent::Started { .. })));
    assert!(matches!(events.last(), Some(LoadEvent::Finished { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, LoadEvent::PhaseFinished { phase: LoadPhase::EdfDecode, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, LoadEvent::PhaseFinished { phase: LoadPhase::Statistics, .. })));
}

#[tokio::test]
async fn test_rescale_and_timeline_agree_with_header() {
    let dir = TempDir::new().unwrap();
    let edf_path = common::write_recording(dir.path());

    let recording = Loader::new(LoaderConfig::default())
        .load(&edf_path)
        .await
        .unwrap();

    let fpz = &recording.edf.signals[0];
    // Raw 0 on a symmetric 16-bit range sits just above the physical
    // midpoint; verify via the exact affine expression.
    let expected = (0.0 + 32768.0) / 65535.0 * 1000.0 - 500.0;
    assert_eq!(fpz.samples[0], expected);

    // Labels anchored at the header start, 250 ms apart at 4 Hz.
    assert_eq!(fpz.time_labels[0].timestamp_ms, 0);
    assert_eq!(fpz.time_labels[1].timestamp_ms, 250);
    assert_eq!(fpz.time_labels[0].formatted, "21:10:07");
}
