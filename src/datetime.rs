//! Date/time utilities for Gator.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{GatorError, Result};

/// Layout of RSS `pubDate` values after the weekday, e.g. `01 Oct 2024 09:15:00 +0000`.
pub const PUB_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Format a UTC timestamp for storage.
///
/// Always emits microsecond precision and a `Z` suffix, so lexicographic
/// order of the stored text matches chronological order.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp back into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GatorError::Database(format!("invalid stored timestamp '{s}': {e}")))
}

/// Parse an RSS item publish date.
///
/// The value must look like `Tue, 01 Oct 2024 09:15:00 +0000`: a weekday
/// name, a two-digit day and a `+HHMM`/`-HHMM` offset. The weekday is only
/// checked for shape, not against the date. Anything else is a
/// [`GatorError::DateFormat`].
pub fn parse_pub_date(s: &str) -> Result<DateTime<Utc>> {
    let input = s.trim();
    let invalid = |reason: &str| GatorError::DateFormat(format!("'{s}': {reason}"));

    let (weekday, rest) = input
        .split_once(", ")
        .ok_or_else(|| invalid("expected '<weekday>, ' prefix"))?;
    if !WEEKDAYS.iter().any(|day| day.eq_ignore_ascii_case(weekday)) {
        return Err(invalid("unknown weekday"));
    }

    let fields: Vec<&str> = rest.split(' ').collect();
    let &[day, month, year, time, offset] = fields.as_slice() else {
        return Err(invalid("expected 'DD Mon YYYY HH:MM:SS -0700'"));
    };
    let all_digits = |v: &str| v.bytes().all(|b| b.is_ascii_digit());
    if day.len() != 2 || !all_digits(day) {
        return Err(invalid("day must have two digits"));
    }
    if month.len() != 3 || year.len() != 4 || time.len() != 8 {
        return Err(invalid("expected 'DD Mon YYYY HH:MM:SS -0700'"));
    }
    let offset_ok = offset.len() == 5
        && matches!(offset.as_bytes()[0], b'+' | b'-')
        && all_digits(&offset[1..]);
    if !offset_ok {
        return Err(invalid("zone offset must be +HHMM or -HHMM"));
    }

    DateTime::parse_from_str(rest, PUB_DATE_FORMAT)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| invalid(&e.to_string()))
}

/// Parse a polling interval such as `20s`, `2m`, `1h` or `1m30s`.
///
/// Each segment is an unsigned integer followed by `s`, `m` or `h`.
/// Empty, malformed or zero intervals are a [`GatorError::Config`].
pub fn parse_interval(s: &str) -> Result<Duration> {
    let input = s.trim();
    let invalid = |reason: &str| GatorError::Config(format!("invalid interval '{s}': {reason}"));

    if input.is_empty() {
        return Err(invalid("empty"));
    }

    let mut total: u64 = 0;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let multiplier = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            _ => return Err(invalid(&format!("unknown unit '{c}'"))),
        };
        if digits.is_empty() {
            return Err(invalid("missing number before unit"));
        }
        let value: u64 = digits
            .parse()
            .map_err(|_| invalid("number out of range"))?;
        total = value
            .checked_mul(multiplier)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| invalid("number out of range"))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(invalid("missing unit (use s, m or h)"));
    }
    if total == 0 {
        return Err(invalid("must be greater than zero"));
    }

    Ok(Duration::from_secs(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_fixed_precision() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_timestamp(&dt), "2024-01-15T10:30:00.000000Z");
    }

    #[test]
    fn test_format_timestamp_orders_lexicographically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let later = earlier + chrono::Duration::microseconds(1500);
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
    }

    #[test]
    fn test_parse_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let parsed = parse_timestamp(&format_timestamp(&dt)).unwrap();
        assert_eq!(parsed, dt);
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        let result = parse_timestamp("2024-01-15 10:30");
        assert!(matches!(result, Err(GatorError::Database(_))));
    }

    #[test]
    fn test_parse_pub_date() {
        let dt = parse_pub_date("Tue, 01 Oct 2024 09:15:00 +0000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 10, 1, 9, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_converts_offset_to_utc() {
        let dt = parse_pub_date("Tue, 01 Oct 2024 18:15:00 +0900").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 10, 1, 9, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_named_zone_rejected() {
        let result = parse_pub_date("Tue, 01 Oct 2024 09:15:00 GMT");
        assert!(matches!(result, Err(GatorError::DateFormat(_))));
    }

    #[test]
    fn test_parse_pub_date_ignores_wrong_weekday() {
        // 1 Oct 2024 was a Tuesday
        let dt = parse_pub_date("Mon, 01 Oct 2024 09:15:00 +0000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 10, 1, 9, 15, 0).unwrap());
    }

    #[test]
    fn test_parse_pub_date_unknown_weekday_rejected() {
        let result = parse_pub_date("Tus, 01 Oct 2024 09:15:00 +0000");
        assert!(matches!(result, Err(GatorError::DateFormat(_))));
    }

    #[test]
    fn test_parse_pub_date_single_digit_day_rejected() {
        let result = parse_pub_date("Tue, 1 Oct 2024 09:15:00 +0000");
        assert!(matches!(result, Err(GatorError::DateFormat(_))));
    }

    #[test]
    fn test_parse_pub_date_colon_offset_rejected() {
        let result = parse_pub_date("Tue, 01 Oct 2024 09:15:00 +00:00");
        assert!(matches!(result, Err(GatorError::DateFormat(_))));
    }

    #[test]
    fn test_parse_pub_date_garbage() {
        let result = parse_pub_date("yesterday");
        assert!(matches!(result, Err(GatorError::DateFormat(_))));

        let result = parse_pub_date("");
        assert!(matches!(result, Err(GatorError::DateFormat(_))));
    }

    #[test]
    fn test_parse_interval_single_unit() {
        assert_eq!(parse_interval("20s").unwrap(), Duration::from_secs(20));
        assert_eq!(parse_interval("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_interval_compound() {
        assert_eq!(parse_interval("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_interval("1h1m1s").unwrap(), Duration::from_secs(3661));
    }

    #[test]
    fn test_parse_interval_invalid() {
        for input in ["", "abc", "10", "m", "5d", "1.5m", "-1s"] {
            let result = parse_interval(input);
            assert!(
                matches!(result, Err(GatorError::Config(_))),
                "expected config error for {input:?}"
            );
        }
    }

    #[test]
    fn test_parse_interval_zero() {
        let result = parse_interval("0s");
        assert!(matches!(result, Err(GatorError::Config(_))));
    }

    #[test]
    fn test_parse_interval_overflow() {
        let result = parse_interval("99999999999999999999h");
        assert!(matches!(result, Err(GatorError::Config(_))));
    }
}
