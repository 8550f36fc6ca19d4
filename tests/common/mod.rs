//! Shared fixture builders for integration tests: a synthetic EDF+ file and
//! the companion tables next to it.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::TimeZone;
use psg_loader::edf::{EdfHeader, SignalHeader};

/// Build a valid two-channel EDF+ byte buffer: 2 records of 1 second, 4
/// samples per record on `Fpz`, 2 on `C3`, raw values counting up from 0.
pub fn synthetic_edf() -> Vec<u8> {
    let signals = vec![signal("Fpz", 4), signal("C3", 2)];
    let header = EdfHeader {
        version: "0".to_string(),
        patient_id: "X F 01-JAN-1980 Test".to_string(),
        record_id: "Startdate 26-AUG-2024".to_string(),
        start: chrono::Utc
            .with_ymd_and_hms(2024, 8, 26, 21, 10, 7)
            .unwrap()
            .fixed_offset(),
        bytes_in_header: 256 + signals.len() * 256,
        reserved: "EDF+C".to_string(),
        num_records: 2,
        record_duration: 1.0,
        num_signals: signals.len(),
    };

    let mut buf = header.encode();
    buf.extend_from_slice(&SignalHeader::encode_all(&signals));
    let samples_per_record: usize = signals.iter().map(|s| s.samples_per_record).sum();
    for raw in 0..(header.num_records * samples_per_record) as i16 {
        buf.extend_from_slice(&raw.to_le_bytes());
    }
    buf
}

fn signal(label: &str, samples_per_record: usize) -> SignalHeader {
    SignalHeader {
        label: label.to_string(),
        transducer_type: "AgAgCl electrode".to_string(),
        physical_dimension: "uV".to_string(),
        physical_min: -500.0,
        physical_max: 500.0,
        digital_min: -32768,
        digital_max: 32767,
        prefiltering: "HP:0.1Hz LP:75Hz".to_string(),
        samples_per_record,
        reserved: String::new(),
    }
}

/// Write the synthetic recording into `dir` and return its path.
pub fn write_recording(dir: &Path) -> PathBuf {
    let path = dir.join("night.edf");
    std::fs::write(&path, synthetic_edf()).unwrap();
    path
}

/// A three-epoch feature table with an aggregated feature and one channel.
pub fn features_csv() -> String {
    let header = "Epoch,Timestamp,Stage,Confidence,Source,eeg_alpha,Fpz_Stage,Fpz_Confidence,Fpz_eeg_alpha";
    let rows = [
        "0,2024-08-26 22:10:07+01:00,Deep,0.9,yasa,1.0,Deep,0.8,2.0",
        "1,2024-08-26 22:10:37+01:00,Deep,0.7,yasa,5.0,Deep,0.6,6.0",
        "2,2024-08-26 22:11:07+01:00,Wake,0.95,yasa,3.0,Wake,0.9,4.0",
    ];
    format!("{}\n{}\n", header, rows.join("\n"))
}

pub fn slow_waves_csv() -> String {
    "Start,End,Duration,Amplitude,Channel\n\
     10.0,11.2,1.2,84.5,Fpz\n\
     30.5,31.0,0.5,77.2,Fpz\n\
     5.0,5.9,0.9,91.0,C3\n"
        .to_string()
}

pub fn spindles_csv() -> String {
    "Start,End,Duration,Frequency,Channel\n\
     42.0,42.8,0.8,13.1,Fpz\n"
        .to_string()
}

pub fn night_events_csv() -> String {
    "event,timestamp_uk,source,duration_secs\n\
     lights_off,2024-08-26 22:30:00+01:00,manual,0\n\
     alarm,2024-08-27T06:30:00Z,phone,30\n"
        .to_string()
}

pub fn hypnogram_csv() -> String {
    "startTime,state,endTime\n\
     2024-08-26T22:00:00Z,light,2024-08-26T22:30:00Z\n\
     2024-08-26T22:30:00Z,deep,2024-08-26T23:10:00Z\n"
        .to_string()
}

pub fn microwakings_csv() -> String {
    "Start,End\n\
     2024-08-27T02:00:00Z,2024-08-27T02:00:12Z\n"
        .to_string()
}

/// Write one companion file next to a recording by suffix substitution.
pub fn write_companion(edf_path: &Path, suffix: &str, contents: &str) -> PathBuf {
    let text = edf_path.to_string_lossy();
    let stem = text.strip_suffix(".edf").unwrap();
    let path = PathBuf::from(format!("{}{}", stem, suffix));
    std::fs::write(&path, contents).unwrap();
    path
}

/// Write every companion file next to a recording.
pub fn write_all_companions(edf_path: &Path) {
    write_companion(edf_path, ".with_features.csv", &features_csv());
    write_companion(edf_path, ".sw_summary.csv", &slow_waves_csv());
    write_companion(edf_path, ".spindle_summary.csv", &spindles_csv());
    write_companion(edf_path, ".night_events.csv", &night_events_csv());
    write_companion(edf_path, ".fitbit_hypnogram.csv", &hypnogram_csv());
    write_companion(edf_path, ".microwakings.csv", &microwakings_csv());
}
