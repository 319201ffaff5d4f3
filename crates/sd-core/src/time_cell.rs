//! Reading and writing time and duration cells.
//!
//! Spreadsheet cells holding times are often hand-edited, so decoding accepts
//! epoch numbers, serial day numbers, instants, numeric strings, RFC 3339 and
//! loose tokens such as `10pm`, `7:30`, `Noon` or `10pm - 6am`.

use std::sync::LazyLock;

use chrono::DateTime;
use regex::Regex;

use crate::grid::{CellValue, Epoch, MS_PER_DAY};

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;

/// Numbers at or above this are Unix milliseconds; below, serial days.
const UNIX_MS_THRESHOLD: f64 = 1e10;

static TIME_OF_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?::(\d{2}))?\s*(am|pm)?$").unwrap()
});

static CLOCK_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d{2})(?::(\d{2}))?$").unwrap());

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+-\s+(.+)$").unwrap());

/// Decodes a time cell to Unix milliseconds.
///
/// Times of day without a date decode to an offset from midnight.
#[must_use]
pub fn decode_time(value: &CellValue, epoch: Epoch) -> Option<i64> {
    match value {
        CellValue::Null => None,
        CellValue::Number(n) => number_to_ms(*n, epoch),
        CellValue::Instant { instant } => Some(instant.timestamp_millis() + epoch.instant_shift_ms()),
        CellValue::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if let Ok(n) = text.parse::<f64>() {
                return number_to_ms(n, epoch);
            }
            if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
                return Some(instant.timestamp_millis());
            }
            parse_time_of_day(text)
        }
    }
}

/// Encodes Unix milliseconds as an instant cell for a workbook with `epoch`.
#[must_use]
pub fn encode_time(ms: i64, epoch: Epoch) -> Option<CellValue> {
    CellValue::instant_ms(ms - epoch.instant_shift_ms())
}

/// Decodes a duration cell to milliseconds.
#[must_use]
pub fn decode_duration(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Null | CellValue::Instant { .. } => None,
        CellValue::Number(n) => finite_ms(*n),
        CellValue::Text(text) => parse_duration(text.trim()),
    }
}

/// Parses `H[:MM][AM|PM]`, `Noon` or `Midnight` into milliseconds after midnight.
#[must_use]
pub fn parse_time_of_day(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("noon") {
        return Some(12 * MS_PER_HOUR);
    }
    if text.eq_ignore_ascii_case("midnight") {
        return Some(0);
    }

    let caps = TIME_OF_DAY_RE.captures(text)?;
    let mut hours: i64 = caps[1].parse().ok()?;
    let minutes: i64 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if minutes > 59 {
        return None;
    }
    match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hours) {
                return None;
            }
            hours %= 12;
            if meridiem == "pm" {
                hours += 12;
            }
        }
        None if hours > 23 => return None,
        None => {}
    }
    Some(hours * MS_PER_HOUR + minutes * MS_PER_MINUTE)
}

/// Parses a duration written as a number of milliseconds, `H:MM[:SS]`, or
/// `<start> - <end>` where both sides are times of day.
#[must_use]
pub fn parse_duration(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<f64>() {
        return finite_ms(n);
    }
    if let Some(caps) = CLOCK_DURATION_RE.captures(text) {
        let hours: i64 = caps[1].parse().ok()?;
        let minutes: i64 = caps[2].parse().ok()?;
        let seconds: i64 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if minutes > 59 || seconds > 59 {
            return None;
        }
        return Some(hours * MS_PER_HOUR + minutes * MS_PER_MINUTE + seconds * 1000);
    }
    let caps = RANGE_RE.captures(text)?;
    let lhs = parse_time_of_day(&caps[1])?;
    let rhs = parse_time_of_day(&caps[2])?;
    Some((rhs - lhs).rem_euclid(MS_PER_DAY))
}

#[allow(clippy::cast_possible_truncation)]
fn finite_ms(n: f64) -> Option<i64> {
    (n.is_finite() && n.abs() < 9.0e15).then(|| n.round() as i64)
}

#[allow(clippy::cast_precision_loss)]
fn number_to_ms(n: f64, epoch: Epoch) -> Option<i64> {
    if !n.is_finite() {
        return None;
    }
    if n.abs() >= UNIX_MS_THRESHOLD {
        finite_ms(n)
    } else {
        finite_ms(n * MS_PER_DAY as f64).map(|offset| epoch.base_ms() + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    const JAN_1_2024_MS: i64 = 1_704_067_200_000;

    #[test]
    fn time_of_day_tokens() {
        assert_eq!(parse_time_of_day("10pm"), Some(22 * MS_PER_HOUR));
        assert_eq!(parse_time_of_day("10 PM"), Some(22 * MS_PER_HOUR));
        assert_eq!(parse_time_of_day("12am"), Some(0));
        assert_eq!(parse_time_of_day("12pm"), Some(12 * MS_PER_HOUR));
        assert_eq!(
            parse_time_of_day("7:45"),
            Some(7 * MS_PER_HOUR + 45 * MS_PER_MINUTE)
        );
        assert_eq!(parse_time_of_day("Noon"), Some(12 * MS_PER_HOUR));
        assert_eq!(parse_time_of_day("MIDNIGHT"), Some(0));
        assert_eq!(parse_time_of_day("13pm"), None);
        assert_eq!(parse_time_of_day("24"), None);
        assert_eq!(parse_time_of_day("7:75"), None);
        assert_eq!(parse_time_of_day("soon"), None);
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("1:30"), Some(90 * MS_PER_MINUTE));
        assert_eq!(parse_duration("0:00:05"), Some(5000));
        assert_eq!(parse_duration("10pm - 6am"), Some(8 * MS_PER_HOUR));
        assert_eq!(parse_duration("9am - 5pm"), Some(8 * MS_PER_HOUR));
        assert_eq!(parse_duration("2500"), Some(2500));
        assert_eq!(parse_duration("later - sooner"), None);
        assert_eq!(decode_duration(&CellValue::Number(60_000.0)), Some(60_000));
        assert_eq!(decode_duration(&CellValue::Null), None);
    }

    #[test]
    fn epoch_numbers_and_serial_days() {
        let epoch = Epoch::Excel1900;
        assert_eq!(
            decode_time(&CellValue::Number(JAN_1_2024_MS as f64), epoch),
            Some(JAN_1_2024_MS)
        );
        // 2024-01-01 is serial day 45292 in a 1900 workbook.
        assert_eq!(
            decode_time(&CellValue::Number(45292.0), epoch),
            Some(JAN_1_2024_MS)
        );
        assert_eq!(
            decode_time(&CellValue::Number(45292.5), epoch),
            Some(JAN_1_2024_MS + 12 * MS_PER_HOUR)
        );
        // The same day is serial 43830 in a 1904 workbook.
        assert_eq!(
            decode_time(&CellValue::Number(43830.0), Epoch::Excel1904),
            Some(JAN_1_2024_MS)
        );
    }

    #[test]
    fn text_forms() {
        let epoch = Epoch::Excel1900;
        assert_eq!(
            decode_time(&CellValue::text("1704067200000"), epoch),
            Some(JAN_1_2024_MS)
        );
        assert_eq!(
            decode_time(&CellValue::text("2024-01-01T00:00:00Z"), epoch),
            Some(JAN_1_2024_MS)
        );
        assert_eq!(
            decode_time(&CellValue::text("2024-01-01T02:00:00+02:00"), epoch),
            Some(JAN_1_2024_MS)
        );
        assert_eq!(
            decode_time(&CellValue::text("11pm"), epoch),
            Some(23 * MS_PER_HOUR)
        );
        assert_eq!(decode_time(&CellValue::text("  "), epoch), None);
        assert_eq!(decode_time(&CellValue::text("whenever"), epoch), None);
    }

    #[test]
    fn instants_are_corrected_for_1904_workbooks() {
        let instant = Utc.timestamp_millis_opt(JAN_1_2024_MS).unwrap();
        let cell = CellValue::Instant { instant };
        assert_eq!(decode_time(&cell, Epoch::Excel1900), Some(JAN_1_2024_MS));
        assert_eq!(
            decode_time(&cell, Epoch::Excel1904),
            Some(JAN_1_2024_MS + Epoch::Excel1904.instant_shift_ms())
        );

        let encoded = encode_time(JAN_1_2024_MS, Epoch::Excel1904).unwrap();
        assert_eq!(decode_time(&encoded, Epoch::Excel1904), Some(JAN_1_2024_MS));
    }
}
