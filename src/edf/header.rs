//! EDF+ header parsing.
//!
//! The container opens with a fixed 256-byte ASCII prologue followed by 256
//! bytes of metadata per signal. The per-signal section is column-major:
//! all labels first, then all transducer types, and so on. Reading it
//! row-major would silently misattribute metadata across channels, so the
//! field order here is load-bearing.
//!
//! Parsing and encoding are symmetric: any header parsed from a valid file
//! re-encodes to fields that parse back identically.

use std::ops::Range;

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

use crate::constants::{prologue, signal_field, FIXED_HEADER_LEN, PER_SIGNAL_HEADER_LEN};
use crate::error::{Error, Result};
use crate::timestamp::parse_timestamp;

/// Parsed fixed prologue of an EDF+ file
#[derive(Debug, Clone, PartialEq)]
pub struct EdfHeader {
    /// Format version tag, normally `0`
    pub version: String,
    /// Free-text local patient identification
    pub patient_id: String,
    /// Free-text local recording identification
    pub record_id: String,
    /// Recording start instant, decoded from the dotted date/time fields
    pub start: DateTime<FixedOffset>,
    /// Declared header length; must equal `256 + 256 * num_signals`
    pub bytes_in_header: usize,
    /// Reserved field, kept verbatim
    pub reserved: String,
    /// Number of data records in the file
    pub num_records: usize,
    /// Duration of one data record in seconds; may be fractional
    pub record_duration: f64,
    /// Number of signals (channels) in each data record
    pub num_signals: usize,
}

/// Per-signal metadata from the variable header
#[derive(Debug, Clone, PartialEq)]
pub struct SignalHeader {
    pub label: String,
    pub transducer_type: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
    pub prefiltering: String,
    pub samples_per_record: usize,
    pub reserved: String,
}

impl EdfHeader {
    /// Parse the fixed 256-byte prologue.
    ///
    /// Every textual field is trimmed of padding whitespace; numeric fields
    /// fail with an error naming the field and its byte range.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < FIXED_HEADER_LEN {
            return Err(Error::edf_truncated(FIXED_HEADER_LEN, buf.len()));
        }

        let start_text = ascii_field(buf, prologue::START_DATE, "start-date")?;
        let start = parse_timestamp(start_text)?;

        let header = Self {
            version: ascii_field(buf, prologue::VERSION, "version")?.to_string(),
            patient_id: ascii_field(buf, prologue::PATIENT_ID, "patient-id")?.to_string(),
            record_id: ascii_field(buf, prologue::RECORD_ID, "record-id")?.to_string(),
            start,
            bytes_in_header: int_field(buf, prologue::BYTES_IN_HEADER, "header-length")?,
            reserved: ascii_field(buf, prologue::RESERVED, "reserved")?.to_string(),
            num_records: int_field(buf, prologue::NUM_RECORDS, "record-count")?,
            record_duration: float_field(buf, prologue::RECORD_DURATION, "record-duration")?,
            num_signals: int_field(buf, prologue::NUM_SIGNALS, "signal-count")?,
        };

        let expected = FIXED_HEADER_LEN + header.num_signals * PER_SIGNAL_HEADER_LEN;
        if header.bytes_in_header != expected {
            return Err(Error::edf_format(
                "header-length",
                prologue::BYTES_IN_HEADER,
                format!(
                    "declared {} bytes but {} signals require {}",
                    header.bytes_in_header, header.num_signals, expected
                ),
            ));
        }

        Ok(header)
    }

    /// Re-encode the prologue as fixed-width ASCII.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_HEADER_LEN);
        push_fixed(&mut out, &self.version, prologue::VERSION.len());
        push_fixed(&mut out, &self.patient_id, prologue::PATIENT_ID.len());
        push_fixed(&mut out, &self.record_id, prologue::RECORD_ID.len());
        push_fixed(&mut out, &self.encode_start(), prologue::START_DATE.len());
        push_fixed(
            &mut out,
            &self.bytes_in_header.to_string(),
            prologue::BYTES_IN_HEADER.len(),
        );
        push_fixed(&mut out, &self.reserved, prologue::RESERVED.len());
        push_fixed(
            &mut out,
            &self.num_records.to_string(),
            prologue::NUM_RECORDS.len(),
        );
        push_fixed(
            &mut out,
            &format_number(self.record_duration),
            prologue::RECORD_DURATION.len(),
        );
        push_fixed(
            &mut out,
            &self.num_signals.to_string(),
            prologue::NUM_SIGNALS.len(),
        );
        out
    }

    /// The start instant in the dotted `DD.MM.YYHH.MM.SS` on-disk form
    fn encode_start(&self) -> String {
        format!(
            "{:02}.{:02}.{:02}{:02}.{:02}.{:02}",
            self.start.day(),
            self.start.month(),
            self.start.year() % 100,
            self.start.hour(),
            self.start.minute(),
            self.start.second()
        )
    }
}

impl SignalHeader {
    /// Parse all signal headers from the column-major variable section.
    ///
    /// `buf` is the whole file; parsing starts at byte 256 and consumes one
    /// field block (all signals' values for that field) at a time.
    pub fn parse_all(buf: &[u8], num_signals: usize) -> Result<Vec<Self>> {
        let section_len = num_signals * PER_SIGNAL_HEADER_LEN;
        if buf.len() < FIXED_HEADER_LEN + section_len {
            return Err(Error::edf_truncated(
                FIXED_HEADER_LEN + section_len,
                buf.len(),
            ));
        }

        let mut offset = FIXED_HEADER_LEN;

        let labels = text_block(buf, &mut offset, num_signals, signal_field::LABEL, "label")?;
        let transducers = text_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::TRANSDUCER,
            "transducer-type",
        )?;
        let dimensions = text_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::PHYSICAL_DIMENSION,
            "physical-dimension",
        )?;
        let physical_mins = float_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::PHYSICAL_MIN,
            "physical-min",
        )?;
        let physical_maxs = float_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::PHYSICAL_MAX,
            "physical-max",
        )?;
        let digital_mins = int_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::DIGITAL_MIN,
            "digital-min",
        )?;
        let digital_maxs = int_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::DIGITAL_MAX,
            "digital-max",
        )?;
        let prefilterings = text_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::PREFILTERING,
            "prefiltering",
        )?;
        let samples = usize_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::SAMPLES_PER_RECORD,
            "samples-per-record",
        )?;
        let reserveds = text_block(
            buf,
            &mut offset,
            num_signals,
            signal_field::RESERVED,
            "signal-reserved",
        )?;

        Ok((0..num_signals)
            .map(|i| SignalHeader {
                label: labels[i].clone(),
                transducer_type: transducers[i].clone(),
                physical_dimension: dimensions[i].clone(),
                physical_min: physical_mins[i],
                physical_max: physical_maxs[i],
                digital_min: digital_mins[i] as i32,
                digital_max: digital_maxs[i] as i32,
                prefiltering: prefilterings[i].clone(),
                samples_per_record: samples[i],
                reserved: reserveds[i].clone(),
            })
            .collect())
    }

    /// Re-encode a set of signal headers in the column-major on-disk layout
    pub fn encode_all(signals: &[Self]) -> Vec<u8> {
        let mut out = Vec::with_capacity(signals.len() * PER_SIGNAL_HEADER_LEN);
        for s in signals {
            push_fixed(&mut out, &s.label, signal_field::LABEL);
        }
        for s in signals {
            push_fixed(&mut out, &s.transducer_type, signal_field::TRANSDUCER);
        }
        for s in signals {
            push_fixed(
                &mut out,
                &s.physical_dimension,
                signal_field::PHYSICAL_DIMENSION,
            );
        }
        for s in signals {
            push_fixed(
                &mut out,
                &format_number(s.physical_min),
                signal_field::PHYSICAL_MIN,
            );
        }
        for s in signals {
            push_fixed(
                &mut out,
                &format_number(s.physical_max),
                signal_field::PHYSICAL_MAX,
            );
        }
        for s in signals {
            push_fixed(&mut out, &s.digital_min.to_string(), signal_field::DIGITAL_MIN);
        }
        for s in signals {
            push_fixed(&mut out, &s.digital_max.to_string(), signal_field::DIGITAL_MAX);
        }
        for s in signals {
            push_fixed(&mut out, &s.prefiltering, signal_field::PREFILTERING);
        }
        for s in signals {
            push_fixed(
                &mut out,
                &s.samples_per_record.to_string(),
                signal_field::SAMPLES_PER_RECORD,
            );
        }
        for s in signals {
            push_fixed(&mut out, &s.reserved, signal_field::RESERVED);
        }
        out
    }
}

// =============================================================================
// Field helpers
// =============================================================================

/// A trimmed ASCII field at a fixed byte range
fn ascii_field<'a>(buf: &'a [u8], range: Range<usize>, field: &str) -> Result<&'a str> {
    let bytes = &buf[range.clone()];
    std::str::from_utf8(bytes)
        .map(str::trim)
        .map_err(|_| Error::edf_format(field, range, "field is not ASCII text"))
}

fn int_field(buf: &[u8], range: Range<usize>, field: &str) -> Result<usize> {
    let text = ascii_field(buf, range.clone(), field)?;
    text.parse::<usize>()
        .map_err(|_| Error::edf_format(field, range, format!("'{}' is not an integer", text)))
}

fn float_field(buf: &[u8], range: Range<usize>, field: &str) -> Result<f64> {
    let text = ascii_field(buf, range.clone(), field)?;
    text.parse::<f64>()
        .map_err(|_| Error::edf_format(field, range, format!("'{}' is not a number", text)))
}

/// Read one column-major block of trimmed text fields, advancing `offset`
fn text_block(
    buf: &[u8],
    offset: &mut usize,
    count: usize,
    width: usize,
    field: &str,
) -> Result<Vec<String>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let range = *offset..*offset + width;
        values.push(ascii_field(buf, range, field)?.to_string());
        *offset += width;
    }
    Ok(values)
}

fn float_block(
    buf: &[u8],
    offset: &mut usize,
    count: usize,
    width: usize,
    field: &str,
) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let range = *offset..*offset + width;
        values.push(float_field(buf, range, field)?);
        *offset += width;
    }
    Ok(values)
}

/// Like `int_block` but for counts: negative values are rejected rather
/// than wrapped, since they would otherwise turn into absurd allocations.
fn usize_block(
    buf: &[u8],
    offset: &mut usize,
    count: usize,
    width: usize,
    field: &str,
) -> Result<Vec<usize>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let range = *offset..*offset + width;
        let text = ascii_field(buf, range.clone(), field)?;
        values.push(text.parse::<usize>().map_err(|_| {
            Error::edf_format(
                field,
                range,
                format!("'{}' is not a non-negative integer", text),
            )
        })?);
        *offset += width;
    }
    Ok(values)
}

fn int_block(
    buf: &[u8],
    offset: &mut usize,
    count: usize,
    width: usize,
    field: &str,
) -> Result<Vec<i64>> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let range = *offset..*offset + width;
        let text = ascii_field(buf, range.clone(), field)?;
        values.push(text.parse::<i64>().map_err(|_| {
            Error::edf_format(field, range, format!("'{}' is not an integer", text))
        })?);
        *offset += width;
    }
    Ok(values)
}

/// Space-pad (or truncate) a field to its fixed on-disk width
fn push_fixed(out: &mut Vec<u8>, value: &str, width: usize) {
    let mut bytes = value.as_bytes().to_vec();
    bytes.truncate(width);
    bytes.resize(width, b' ');
    out.extend_from_slice(&bytes);
}

/// Numbers render without a trailing `.0` so integral values re-parse from
/// the same digits they were written with
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e8 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_header(num_signals: usize) -> EdfHeader {
        EdfHeader {
            version: "0".to_string(),
            patient_id: "X F 01-JAN-1980 Patient".to_string(),
            record_id: "Startdate 26-AUG-2024".to_string(),
            start: chrono::Utc
                .with_ymd_and_hms(2024, 8, 26, 21, 10, 7)
                .unwrap()
                .fixed_offset(),
            bytes_in_header: FIXED_HEADER_LEN + num_signals * PER_SIGNAL_HEADER_LEN,
            reserved: "EDF+C".to_string(),
            num_records: 10,
            record_duration: 1.0,
            num_signals,
        }
    }

    fn test_signal(label: &str) -> SignalHeader {
        SignalHeader {
            label: label.to_string(),
            transducer_type: "AgAgCl electrode".to_string(),
            physical_dimension: "uV".to_string(),
            physical_min: -500.0,
            physical_max: 500.0,
            digital_min: -32768,
            digital_max: 32767,
            prefiltering: "HP:0.1Hz LP:75Hz".to_string(),
            samples_per_record: 256,
            reserved: String::new(),
        }
    }

    #[test]
    fn test_prologue_round_trip() {
        let header = test_header(2);
        let encoded = header.encode();
        assert_eq!(encoded.len(), FIXED_HEADER_LEN);

        // Pad out so the header-length invariant check passes.
        let mut buf = encoded;
        buf.resize(header.bytes_in_header, b' ');
        let reparsed = EdfHeader::parse(&buf).unwrap();
        assert_eq!(reparsed, header);
    }

    #[test]
    fn test_signal_headers_round_trip() {
        let header = test_header(3);
        let signals = vec![test_signal("Fpz"), test_signal("C3"), test_signal("O1")];

        let mut buf = header.encode();
        buf.extend_from_slice(&SignalHeader::encode_all(&signals));
        let reparsed = SignalHeader::parse_all(&buf, 3).unwrap();
        assert_eq!(reparsed, signals);
    }

    #[test]
    fn test_column_major_layout_keeps_fields_per_signal() {
        let header = test_header(2);
        let mut a = test_signal("Fpz");
        let mut b = test_signal("C3");
        a.samples_per_record = 256;
        b.samples_per_record = 1;
        b.physical_dimension = "mV".to_string();

        let mut buf = header.encode();
        buf.extend_from_slice(&SignalHeader::encode_all(&[a, b]));
        let reparsed = SignalHeader::parse_all(&buf, 2).unwrap();

        assert_eq!(reparsed[0].label, "Fpz");
        assert_eq!(reparsed[0].samples_per_record, 256);
        assert_eq!(reparsed[0].physical_dimension, "uV");
        assert_eq!(reparsed[1].label, "C3");
        assert_eq!(reparsed[1].samples_per_record, 1);
        assert_eq!(reparsed[1].physical_dimension, "mV");
    }

    #[test]
    fn test_non_numeric_field_names_offender() {
        let header = test_header(0);
        let mut buf = header.encode();
        // Corrupt the record-count field.
        buf[prologue::NUM_RECORDS.start..prologue::NUM_RECORDS.end]
            .copy_from_slice(b"oops    ");
        let err = EdfHeader::parse(&buf).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("record-count"));
        assert!(msg.contains("oops"));
    }

    #[test]
    fn test_negative_samples_per_record_is_a_parse_error() {
        let header = test_header(1);
        let mut buf = header.encode();
        buf.extend_from_slice(&SignalHeader::encode_all(&[test_signal("Fpz")]));

        // Overwrite the samples-per-record block with a negative count.
        let samples_offset = FIXED_HEADER_LEN
            + signal_field::LABEL
            + signal_field::TRANSDUCER
            + signal_field::PHYSICAL_DIMENSION
            + signal_field::PHYSICAL_MIN
            + signal_field::PHYSICAL_MAX
            + signal_field::DIGITAL_MIN
            + signal_field::DIGITAL_MAX
            + signal_field::PREFILTERING;
        buf[samples_offset..samples_offset + signal_field::SAMPLES_PER_RECORD]
            .copy_from_slice(b"-1      ");

        let err = SignalHeader::parse_all(&buf, 1).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("samples-per-record"));
        assert!(msg.contains("-1"));
    }

    #[test]
    fn test_header_length_mismatch_is_fatal() {
        let mut header = test_header(2);
        header.bytes_in_header += 1;
        let mut buf = header.encode();
        buf.resize(header.bytes_in_header, b' ');
        assert!(EdfHeader::parse(&buf).is_err());
    }

    #[test]
    fn test_short_buffer_is_truncation_error() {
        let err = EdfHeader::parse(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, Error::EdfTruncated { .. }));
    }
}
