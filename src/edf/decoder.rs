//! EDF+ data-record decoding.
//!
//! The data section is a sequence of records; within each record the samples
//! are grouped per signal (all of signal 0's samples for that record, then
//! signal 1's, and so on), each sample a 16-bit little-endian signed
//! integer. Raw values are rescaled to physical units immediately, so
//! nothing downstream ever sees a digital count.

use std::path::Path;

use tracing::debug;

use crate::constants::BYTES_PER_SAMPLE;
use crate::error::{Error, Result};

use super::header::{EdfHeader, SignalHeader};

/// A fully decoded recording: headers plus one physical-unit sample vector
/// per signal, concatenated across all data records.
#[derive(Debug, Clone)]
pub struct EdfData {
    pub header: EdfHeader,
    pub signals: Vec<SignalHeader>,
    /// `samples[i]` holds every sample of signal `i` in record order, with
    /// length `num_records * samples_per_record`
    pub samples: Vec<Vec<f64>>,
}

/// Decode a complete EDF+ file from memory.
///
/// Fails if the buffer is shorter than the header declares, if any signal
/// has a zero digital or physical range, or if the data section does not
/// hold every declared record.
pub fn decode(buf: &[u8]) -> Result<EdfData> {
    let header = EdfHeader::parse(buf)?;
    let signals = SignalHeader::parse_all(buf, header.num_signals)?;

    debug!(
        num_signals = header.num_signals,
        num_records = header.num_records,
        record_duration = header.record_duration,
        "decoding EDF data section"
    );

    // Precompute per-signal rescale coefficients, rejecting degenerate
    // ranges up front rather than mid-record.
    let mut scales = Vec::with_capacity(signals.len());
    for signal in &signals {
        let digital_range = f64::from(signal.digital_max) - f64::from(signal.digital_min);
        if digital_range == 0.0 {
            return Err(Error::zero_signal_range(&signal.label, "digital"));
        }
        let physical_range = signal.physical_max - signal.physical_min;
        if physical_range == 0.0 {
            return Err(Error::zero_signal_range(&signal.label, "physical"));
        }
        scales.push(Rescale {
            digital_min: f64::from(signal.digital_min),
            digital_range,
            physical_min: signal.physical_min,
            physical_range,
        });
    }

    let record_samples: usize = signals.iter().map(|s| s.samples_per_record).sum();
    let record_bytes = record_samples * BYTES_PER_SAMPLE;
    let expected = header.bytes_in_header + header.num_records * record_bytes;
    if buf.len() < expected {
        return Err(Error::edf_truncated(expected, buf.len()));
    }

    let mut samples: Vec<Vec<f64>> = signals
        .iter()
        .map(|s| Vec::with_capacity(s.samples_per_record * header.num_records))
        .collect();

    let mut offset = header.bytes_in_header;
    for _ in 0..header.num_records {
        for (i, signal) in signals.iter().enumerate() {
            let out = &mut samples[i];
            let scale = &scales[i];
            for _ in 0..signal.samples_per_record {
                let raw = i16::from_le_bytes([buf[offset], buf[offset + 1]]);
                out.push(scale.apply(raw));
                offset += BYTES_PER_SAMPLE;
            }
        }
    }

    Ok(EdfData {
        header,
        signals,
        samples,
    })
}

/// Read and decode an EDF+ file from disk.
///
/// Synchronous by design; callers on an async runtime run it through a
/// blocking task.
pub fn read_file(path: &Path) -> Result<EdfData> {
    let buf = std::fs::read(path)
        .map_err(|e| Error::io(format!("failed to read '{}'", path.display()), e))?;
    decode(&buf)
}

/// Digital-to-physical affine transform for one signal
struct Rescale {
    digital_min: f64,
    digital_range: f64,
    physical_min: f64,
    physical_range: f64,
}

impl Rescale {
    /// `(raw - dmin) / (dmax - dmin) * (pmax - pmin) + pmin`, evaluated in
    /// exactly this order so boundary values land exactly on the physical
    /// extremes.
    fn apply(&self, raw: i16) -> f64 {
        (f64::from(raw) - self.digital_min) / self.digital_range * self.physical_range
            + self.physical_min
    }
}
