//! Plain-English recurrence patterns.
//!
//! Translates phrases such as "every week", "every 2 days",
//! "every weekday until 2024-06-30" or "every week on mon and fri for 6 times"
//! into an RRULE value (without the `RRULE:` prefix).

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frequency {
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    fn as_rrule(self) -> &'static str {
        match self {
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    fn from_unit(word: &str) -> Option<Self> {
        match word {
            "minute" | "minutes" => Some(Frequency::Minutely),
            "hour" | "hours" => Some(Frequency::Hourly),
            "day" | "days" => Some(Frequency::Daily),
            "week" | "weeks" => Some(Frequency::Weekly),
            "month" | "months" => Some(Frequency::Monthly),
            "year" | "years" => Some(Frequency::Yearly),
            _ => None,
        }
    }

    fn from_adverb(word: &str) -> Option<Self> {
        match word {
            "hourly" => Some(Frequency::Hourly),
            "daily" => Some(Frequency::Daily),
            "weekly" => Some(Frequency::Weekly),
            "monthly" => Some(Frequency::Monthly),
            "yearly" | "annually" => Some(Frequency::Yearly),
            _ => None,
        }
    }
}

const WORKWEEK: [&str; 5] = ["MO", "TU", "WE", "TH", "FR"];

fn weekday(word: &str) -> Option<&'static str> {
    let word = word.strip_suffix('s').unwrap_or(word);
    let code = match word {
        "monday" | "mon" => "MO",
        "tuesday" | "tue" | "tues" => "TU",
        "wednesday" | "wed" => "WE",
        "thursday" | "thu" | "thur" | "thurs" => "TH",
        "friday" | "fri" => "FR",
        "saturday" | "sat" => "SA",
        "sunday" | "sun" => "SU",
        _ => return None,
    };
    Some(code)
}

pub(super) fn to_rrule(text: &str) -> Result<String, String> {
    let lower = text.to_lowercase().replace(',', " ");
    let mut tokens = lower
        .split_whitespace()
        .filter(|t| *t != "and")
        .peekable();

    let mut interval: u32 = 1;
    let mut by_day: Vec<&'static str> = Vec::new();

    let first = tokens.next().ok_or("pattern is empty")?;

    let frequency = if let Some(freq) = Frequency::from_adverb(first) {
        freq
    } else if first == "every" {
        let mut word = tokens.next().ok_or("expected a frequency after 'every'")?;
        let mut counted = false;

        if word == "other" {
            interval = 2;
            counted = true;
            word = tokens.next().ok_or("expected a unit after 'every other'")?;
        } else if let Ok(n) = word.parse::<u32>() {
            if n == 0 {
                return Err("interval must be at least 1".into());
            }
            interval = n;
            counted = true;
            word = tokens
                .next()
                .ok_or_else(|| format!("expected a unit after 'every {}'", n))?;
        }

        if let Some(freq) = Frequency::from_unit(word) {
            freq
        } else if word == "weekday" || word == "weekdays" {
            if counted {
                return Err("'every weekday' does not take an interval".into());
            }
            by_day.extend(WORKWEEK);
            Frequency::Weekly
        } else if let Some(day) = weekday(word) {
            if counted {
                return Err(format!("'{}' does not take an interval", word));
            }
            by_day.push(day);
            while let Some(day) = tokens.peek().and_then(|t| weekday(t)) {
                by_day.push(day);
                tokens.next();
            }
            Frequency::Weekly
        } else {
            return Err(format!("unknown frequency '{}'", word));
        }
    } else {
        return Err(format!("expected 'every' or a frequency, found '{}'", first));
    };

    let mut count: Option<u32> = None;
    let mut until: Option<NaiveDate> = None;

    while let Some(word) = tokens.next() {
        match word {
            "on" => {
                let before = by_day.len();
                while let Some(day) = tokens.peek().and_then(|t| weekday(t)) {
                    by_day.push(day);
                    tokens.next();
                }
                if by_day.len() == before {
                    return Err("expected a weekday after 'on'".into());
                }
            }
            "for" => {
                let n = tokens
                    .next()
                    .and_then(|t| t.parse::<u32>().ok())
                    .filter(|n| *n > 0)
                    .ok_or("expected a positive count after 'for'")?;
                match tokens.next() {
                    Some("time") | Some("times") => {}
                    _ => return Err(format!("expected 'times' after 'for {}'", n)),
                }
                count = Some(n);
            }
            "until" => {
                let raw = tokens.next().ok_or("expected a date after 'until'")?;
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", raw))?;
                until = Some(date);
            }
            other => return Err(format!("unexpected '{}'", other)),
        }
    }

    if count.is_some() && until.is_some() {
        return Err("use either 'for N times' or 'until', not both".into());
    }

    let mut parts = vec![
        format!("FREQ={}", frequency.as_rrule()),
        format!("INTERVAL={}", interval),
    ];

    let mut seen = Vec::new();
    by_day.retain(|d| {
        let fresh = !seen.contains(d);
        seen.push(*d);
        fresh
    });
    if !by_day.is_empty() {
        parts.push(format!("BYDAY={}", by_day.join(",")));
    }
    if let Some(n) = count {
        parts.push(format!("COUNT={}", n));
    }
    if let Some(date) = until {
        // The whole named day is included.
        parts.push(format!("UNTIL={}T235959Z", date.format("%Y%m%d")));
    }

    Ok(parts.join(";"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_unit() {
        assert_eq!(to_rrule("every week").unwrap(), "FREQ=WEEKLY;INTERVAL=1");
        assert_eq!(to_rrule("Every Day").unwrap(), "FREQ=DAILY;INTERVAL=1");
        assert_eq!(to_rrule("every 3 months").unwrap(), "FREQ=MONTHLY;INTERVAL=3");
        assert_eq!(to_rrule("every other year").unwrap(), "FREQ=YEARLY;INTERVAL=2");
        assert_eq!(to_rrule("every 15 minutes").unwrap(), "FREQ=MINUTELY;INTERVAL=15");
        assert_eq!(to_rrule("every minute").unwrap(), "FREQ=MINUTELY;INTERVAL=1");
    }

    #[test]
    fn test_adverbs() {
        assert_eq!(to_rrule("daily").unwrap(), "FREQ=DAILY;INTERVAL=1");
        assert_eq!(to_rrule("annually").unwrap(), "FREQ=YEARLY;INTERVAL=1");
    }

    #[test]
    fn test_weekdays() {
        assert_eq!(
            to_rrule("every weekday").unwrap(),
            "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,TU,WE,TH,FR"
        );
        assert_eq!(
            to_rrule("every Monday and Wednesday").unwrap(),
            "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,WE"
        );
        assert_eq!(
            to_rrule("every 2 weeks on tue, thurs").unwrap(),
            "FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH"
        );
    }

    #[test]
    fn test_duplicate_weekdays_collapse() {
        assert_eq!(
            to_rrule("every week on fridays and fri").unwrap(),
            "FREQ=WEEKLY;INTERVAL=1;BYDAY=FR"
        );
    }

    #[test]
    fn test_terminators() {
        assert_eq!(
            to_rrule("every day for 5 times").unwrap(),
            "FREQ=DAILY;INTERVAL=1;COUNT=5"
        );
        assert_eq!(
            to_rrule("every week until 2024-06-30").unwrap(),
            "FREQ=WEEKLY;INTERVAL=1;UNTIL=20240630T235959Z"
        );
    }

    #[test]
    fn test_rejects_nonsense() {
        assert!(to_rrule("").is_err());
        assert!(to_rrule("sometimes").is_err());
        assert!(to_rrule("every").is_err());
        assert!(to_rrule("every 0 days").is_err());
        assert!(to_rrule("every fortnight").is_err());
        assert!(to_rrule("every 2 weekdays").is_err());
        assert!(to_rrule("every week on").is_err());
        assert!(to_rrule("every day for 3").is_err());
        assert!(to_rrule("every day until tomorrow").is_err());
        assert!(to_rrule("every day for 3 times until 2024-01-01").is_err());
        assert!(to_rrule("every day please").is_err());
    }
}
