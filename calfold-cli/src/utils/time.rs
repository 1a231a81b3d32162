//! Parsing of user-supplied instants and durations.
//!
//! All instants are UTC. Natural-language input ("tomorrow 3pm") goes through
//! fuzzydate and is read as UTC wall time.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Expand common abbreviations that fuzzydate doesn't handle.
fn expand_abbreviations(input: &str) -> String {
    let abbrevs = [
        ("mon", "monday"),
        ("tue", "tuesday"),
        ("tues", "tuesday"),
        ("wed", "wednesday"),
        ("thu", "thursday"),
        ("thurs", "thursday"),
        ("fri", "friday"),
        ("sat", "saturday"),
        ("sun", "sunday"),
        ("jan", "january"),
        ("feb", "february"),
        ("mar", "march"),
        ("apr", "april"),
        ("jun", "june"),
        ("jul", "july"),
        ("aug", "august"),
        ("sep", "september"),
        ("sept", "september"),
        ("oct", "october"),
        ("nov", "november"),
        ("dec", "december"),
    ];

    input
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            abbrevs
                .iter()
                .find(|(abbr, _)| *abbr == word)
                .map(|(_, full)| full.to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse an instant: RFC 3339, `YYYY-MM-DD[ HH:MM[:SS]]`, or natural language.
pub fn parse_when(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    let expanded = expand_abbreviations(input);
    let dt = fuzzydate::parse(&expanded)
        .map_err(|_| anyhow::anyhow!("Could not parse date/time: \"{}\"", input))?;

    Ok(dt.and_utc())
}

/// Parse a duration as whole minutes: a bare number ("45") or a humantime
/// string ("1h 30m").
pub fn parse_minutes(input: &str) -> Result<i64> {
    let input = input.trim();

    if let Ok(minutes) = input.parse::<i64>() {
        return Ok(minutes);
    }

    let std_dur =
        humantime::parse_duration(input).with_context(|| format!("Could not parse duration: \"{}\"", input))?;
    let duration = TimeDelta::from_std(std_dur).context("Duration too large")?;

    Ok(duration.num_minutes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc3339_is_converted_to_utc() {
        assert_eq!(
            parse_when("2024-03-04T10:00:00+01:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_naive_formats_are_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0).unwrap();
        assert_eq!(parse_when("2024-03-04T09:30").unwrap(), expected);
        assert_eq!(parse_when("2024-03-04 09:30").unwrap(), expected);
        assert_eq!(parse_when("2024-03-04T09:30:00").unwrap(), expected);
    }

    #[test]
    fn test_date_only_is_midnight() {
        assert_eq!(
            parse_when("2024-03-04").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_natural_language() {
        assert!(parse_when("tomorrow 3pm").is_ok());
        assert!(parse_when("not a date at all xyz").is_err());
    }

    #[test]
    fn test_expand_abbreviations() {
        assert_eq!(expand_abbreviations("Sat 3pm"), "saturday 3pm");
        assert_eq!(expand_abbreviations("sept 5"), "september 5");
        assert_eq!(expand_abbreviations("next friday"), "next friday");
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_minutes("45").unwrap(), 45);
        assert_eq!(parse_minutes("1h 30m").unwrap(), 90);
        assert_eq!(parse_minutes("2hours").unwrap(), 120);
        assert!(parse_minutes("a while").is_err());
    }
}
