//! Timestamp normalization for the companion-file family.
//!
//! The auxiliary sources were written by different exporters over the years
//! and carry four distinct textual encodings. This module folds all of them
//! into one canonical `DateTime<FixedOffset>` so the rest of the crate can
//! do timeline math in epoch milliseconds without caring which file a value
//! came from.
//!
//! Recognized forms, dispatched on shape:
//!
//! 1. `YYYY-MM-DD HH:MM:SS[.frac]+HH[:MM]` — offset-qualified local form,
//!    as written by the feature-table exporter.
//! 2. `YYYY-MM-DDTHH:MM:SS[.frac]Z` — ISO UTC form.
//! 3. `YYYY-MM-DDTHH:MM:SS[.frac]±HH:MM` — ISO with explicit offset.
//! 4. `DD.MM.YYHH.MM.SS` — the dotted 16-byte EDF start-date field, with a
//!    two-digit year interpreted as 2000+YY.
//!
//! The dotted form is always interpreted as UTC while the others carry an
//! explicit offset. That asymmetry matches the legacy exporter and is kept
//! deliberately; recordings taken in non-UTC zones with that exporter would
//! need a corrected source file, not a parser change.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::error::{Error, Result};

/// Parse one of the four recognized timestamp encodings into a canonical
/// zoned instant with millisecond precision.
///
/// Inputs matching none of the forms fail with an error naming the string.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::timestamp(value, "empty timestamp"));
    }

    if trimmed.contains('T') {
        parse_iso(trimmed)
    } else if trimmed.contains('-') {
        parse_offset_local(trimmed)
    } else {
        parse_dotted_legacy(trimmed)
    }
}

/// Epoch milliseconds of a parsed instant; the unit every timeline consumer
/// indexes by.
pub fn epoch_millis(instant: &DateTime<FixedOffset>) -> i64 {
    instant.timestamp_millis()
}

/// ISO forms (`T` separator): UTC `Z` or explicit `±HH:MM` offset.
fn parse_iso(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::timestamp(value, format!("invalid ISO timestamp: {}", e)))
}

/// `YYYY-MM-DD HH:MM:SS[.frac]+HH[:MM]`: date and time separated by a
/// space, with a mandatory positive UTC offset after a `+`.
fn parse_offset_local(value: &str) -> Result<DateTime<FixedOffset>> {
    let (date_part, time_part) = value
        .split_once(' ')
        .ok_or_else(|| Error::timestamp(value, "expected a space between date and time"))?;

    let (clock_part, offset_part) = time_part
        .split_once('+')
        .ok_or_else(|| Error::timestamp(value, "missing '+HH' UTC offset"))?;

    let (hms_part, frac_part) = match clock_part.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (clock_part, None),
    };

    let date = parse_ymd(value, date_part)?;
    let (hour, minute, second) = parse_hms(value, hms_part, ':')?;
    let millis = parse_fraction_millis(value, frac_part)?;
    let offset = parse_offset(value, offset_part)?;

    offset
        .from_local_datetime(
            &date
                .and_hms_milli_opt(hour, minute, second, millis)
                .ok_or_else(|| Error::timestamp(value, "time of day out of range"))?,
        )
        .single()
        .ok_or_else(|| Error::timestamp(value, "ambiguous local time"))
}

/// `DD.MM.YYHH.MM.SS`: the concatenated EDF start-date and start-time
/// fields. The middle dotted segment packs a two-digit year against the
/// hour; always UTC.
fn parse_dotted_legacy(value: &str) -> Result<DateTime<FixedOffset>> {
    let segments: Vec<&str> = value.split('.').collect();
    if segments.len() != 5 {
        return Err(Error::timestamp(
            value,
            "matches no recognized timestamp form",
        ));
    }

    let year_and_hour = segments[2];
    if year_and_hour.len() != 4 {
        return Err(Error::timestamp(
            value,
            "expected a packed two-digit year and hour",
        ));
    }

    let day = parse_int(value, segments[0], "day")?;
    let month = parse_int(value, segments[1], "month")?;
    let year = 2000 + parse_int(value, &year_and_hour[..2], "year")? as i32;
    let hour = parse_int(value, &year_and_hour[2..], "hour")?;
    let minute = parse_int(value, segments[3], "minute")?;
    let second = parse_int(value, segments[4], "second")?;

    let instant = Utc
        .with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .ok_or_else(|| Error::timestamp(value, "date or time of day out of range"))?;

    Ok(instant.fixed_offset())
}

fn parse_ymd(value: &str, date_part: &str) -> Result<NaiveDate> {
    let mut fields = date_part.split('-');
    let year = fields
        .next()
        .map(|f| parse_int(value, f, "year"))
        .transpose()?
        .ok_or_else(|| Error::timestamp(value, "missing year"))? as i32;
    let month = fields
        .next()
        .map(|f| parse_int(value, f, "month"))
        .transpose()?
        .ok_or_else(|| Error::timestamp(value, "missing month"))?;
    let day = fields
        .next()
        .map(|f| parse_int(value, f, "day"))
        .transpose()?
        .ok_or_else(|| Error::timestamp(value, "missing day"))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::timestamp(value, "calendar date out of range"))
}

fn parse_hms(value: &str, hms_part: &str, separator: char) -> Result<(u32, u32, u32)> {
    let fields: Vec<&str> = hms_part.split(separator).collect();
    if fields.len() != 3 {
        return Err(Error::timestamp(value, "expected HH:MM:SS time of day"));
    }
    Ok((
        parse_int(value, fields[0], "hour")?,
        parse_int(value, fields[1], "minute")?,
        parse_int(value, fields[2], "second")?,
    ))
}

/// Fractional seconds truncated to three significant digits and read as
/// milliseconds, matching the legacy exporter's behavior exactly (so `.5`
/// reads as 5 ms, not 500).
fn parse_fraction_millis(value: &str, frac_part: Option<&str>) -> Result<u32> {
    match frac_part {
        None => Ok(0),
        Some(frac) => {
            // Truncate by characters, not bytes; a malformed multibyte cell
            // must surface as a parse error.
            let truncated: String = frac.chars().take(3).collect();
            parse_int(value, &truncated, "fractional seconds")
        }
    }
}

/// Offsets arrive as a bare hour count (`01`) or as `HH:MM`; both are
/// reconstructed into a full fixed offset east of UTC.
fn parse_offset(value: &str, offset_part: &str) -> Result<FixedOffset> {
    let (hours, minutes) = match offset_part.split_once(':') {
        Some((h, m)) => (
            parse_int(value, h, "offset hours")?,
            parse_int(value, m, "offset minutes")?,
        ),
        None => (parse_int(value, offset_part, "offset hours")?, 0),
    };

    FixedOffset::east_opt((hours * 3600 + minutes * 60) as i32)
        .ok_or_else(|| Error::timestamp(value, "UTC offset out of range"))
}

fn parse_int(value: &str, field: &str, name: &str) -> Result<u32> {
    field
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::timestamp(value, format!("invalid {} '{}'", name, field)))
}
