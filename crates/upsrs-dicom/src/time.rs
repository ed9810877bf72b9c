//! Parsing of DICOM DA / TM / DT strings.

use chrono::NaiveDateTime;

/// Parse a DICOM date/time string into a timestamp.
///
/// Handles:
/// - DA (`YYYYMMDD`),
/// - TM (`HHMMSS[.FFFFFF]`, shorter forms zero-padded), anchored to
///   1900-01-01 so times stay comparable,
/// - DT (`YYYYMMDD[HHMMSS[.FFFFFF]]`, shorter forms zero-padded).
///
/// Trailing timezone offsets are stripped before parsing. Returns `None`
/// for empty input, `"*"`, or anything unparseable.
pub fn parse_partial_datetime(input: &str) -> Option<NaiveDateTime> {
    if input.is_empty() || input == "*" {
        return None;
    }

    // Strip a timezone suffix; offsets never appear in range queries,
    // which are split on '-' before reaching this function.
    let text = input.split(['+', '-']).next().unwrap_or("");
    if text.is_empty() || !text.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }

    let (main, fraction) = match text.split_once('.') {
        Some((m, f)) => (m, Some(f)),
        None => (text, None),
    };

    if text.len() == 8 && fraction.is_none() {
        // DA
        let date = chrono::NaiveDate::parse_from_str(text, "%Y%m%d").ok()?;
        return date.and_hms_opt(0, 0, 0);
    }

    if main.len() <= 6 {
        // TM, anchored to 1900-01-01.
        return parse_with_fraction(&format!("19000101{}", pad(main, 6)), fraction);
    }

    // DT
    parse_with_fraction(&pad(main, 14), fraction)
}

fn parse_with_fraction(main: &str, fraction: Option<&str>) -> Option<NaiveDateTime> {
    match fraction {
        Some(frac) => {
            let micros = pad(frac, 6);
            NaiveDateTime::parse_from_str(
                &format!("{main}.{micros}"),
                "%Y%m%d%H%M%S%.f",
            )
            .ok()
        }
        None => NaiveDateTime::parse_from_str(main, "%Y%m%d%H%M%S").ok(),
    }
}

/// Right-pad with zeroes to `len`, truncating anything longer.
fn pad(value: &str, len: usize) -> String {
    let mut out: String = value.chars().take(len).collect();
    while out.len() < len {
        out.push('0');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_partial_datetime("20220101"), Some(dt(2022, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_parse_datetime() {
        assert_eq!(
            parse_partial_datetime("20220101120000"),
            Some(dt(2022, 1, 1, 12, 0, 0))
        );
        // Partial DT is padded out.
        assert_eq!(
            parse_partial_datetime("202201011230"),
            Some(dt(2022, 1, 1, 12, 30, 0))
        );
    }

    #[test]
    fn test_parse_time_anchored() {
        assert_eq!(parse_partial_datetime("123000"), Some(dt(1900, 1, 1, 12, 30, 0)));
        assert_eq!(parse_partial_datetime("1230"), Some(dt(1900, 1, 1, 12, 30, 0)));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let parsed = parse_partial_datetime("20220101120000.250000").unwrap();
        assert_eq!(parsed.nanosecond(), 250_000_000);
        let parsed = parse_partial_datetime("123000.5").unwrap();
        assert_eq!(parsed.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_timezone_suffix_stripped() {
        assert_eq!(
            parse_partial_datetime("20220101120000+0200"),
            Some(dt(2022, 1, 1, 12, 0, 0))
        );
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_partial_datetime(""), None);
        assert_eq!(parse_partial_datetime("*"), None);
        assert_eq!(parse_partial_datetime("not-a-date"), None);
        assert_eq!(parse_partial_datetime("20221301"), None);
    }
}
