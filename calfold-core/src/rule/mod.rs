//! Recurrence rules.
//!
//! A pattern is either RFC 5545 text (`FREQ=WEEKLY;BYDAY=MO`, an `RRULE:` line,
//! or a block with `DTSTART`/`RRULE`/`RDATE`/`EXDATE` lines) or a plain-English
//! phrase like "every 2 weeks". Both end up as an `rrule::RRuleSet` anchored at
//! a UTC start instant.

mod text;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use rrule::RRuleSet;
use tracing::warn;

use crate::constants::MAX_OCCURRENCES;
use crate::error::{CalFoldError, CalFoldResult};

/// A parsed recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pattern: String,
    /// RRULE / RDATE / EXDATE content lines, without DTSTART.
    lines: Vec<String>,
    anchor: Option<DateTime<Utc>>,
}

impl Rule {
    /// Parse a recurrence pattern.
    ///
    /// Grammar errors are reported here, not when occurrences are requested.
    pub fn parse(pattern: &str) -> CalFoldResult<Rule> {
        let trimmed = pattern.trim();

        if trimmed.is_empty() {
            return Err(CalFoldError::pattern(pattern, "pattern is empty"));
        }

        let rule = if is_rfc5545(trimmed) {
            parse_rfc5545(pattern, trimmed)?
        } else {
            let body = text::to_rrule(trimmed).map_err(|reason| CalFoldError::pattern(pattern, reason))?;
            Rule {
                pattern: pattern.to_string(),
                lines: vec![format!("RRULE:{}", body)],
                anchor: None,
            }
        };

        rule.rrule_set(rule.anchor.unwrap_or_else(|| rule.earliest_start()))?;

        Ok(rule)
    }

    /// Check the rule against its anchor.
    ///
    /// `parse` only proves the grammar. Some rules are valid or not depending
    /// on where they start, e.g. an UNTIL before the start.
    pub fn validate(&self) -> CalFoldResult<()> {
        let anchor = self
            .anchor
            .ok_or_else(|| CalFoldError::pattern(&self.pattern, "rule has no start anchor"))?;

        self.rrule_set(anchor).map(|_| ())
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The explicit DTSTART, if the pattern carried one.
    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }

    /// Use `start` as the anchor unless the pattern already names one.
    pub fn anchored_at(mut self, start: DateTime<Utc>) -> Self {
        self.anchor.get_or_insert(start);
        self
    }

    /// Occurrence starts in `[window_start, window_end)`, ascending.
    pub fn occurrences_between(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> CalFoldResult<Vec<DateTime<Utc>>> {
        if window_end <= window_start {
            return Ok(Vec::new());
        }

        let anchor = self
            .anchor
            .ok_or_else(|| CalFoldError::pattern(&self.pattern, "rule has no start anchor"))?;

        let set = self.rrule_set(anchor)?;

        // Widen by a second on each side; the half-open bound is applied below.
        let tz: rrule::Tz = Utc.into();
        let after = window_start
            .checked_sub_signed(TimeDelta::seconds(1))
            .unwrap_or(window_start)
            .with_timezone(&tz);
        let before = window_end
            .checked_add_signed(TimeDelta::seconds(1))
            .unwrap_or(window_end)
            .with_timezone(&tz);

        let result = set.after(after).before(before).all(MAX_OCCURRENCES);

        if result.limited {
            warn!(
                pattern = %self.pattern,
                "recurrence expansion stopped after {} occurrences",
                result.dates.len()
            );
        }

        Ok(result
            .dates
            .iter()
            .map(|dt| dt.with_timezone(&Utc))
            .filter(|t| *t >= window_start && *t < window_end)
            .collect())
    }

    /// A start no UNTIL in the rule can precede: the earliest UNTIL, or the
    /// epoch when there is none.
    fn earliest_start(&self) -> DateTime<Utc> {
        self.lines
            .iter()
            .flat_map(|line| line.split(|c| c == ';' || c == ':'))
            .filter_map(|part| {
                let (key, value) = part.split_once('=')?;
                if !key.trim().eq_ignore_ascii_case("UNTIL") {
                    return None;
                }
                parse_until(value.trim())
            })
            .min()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    fn rrule_set(&self, anchor: DateTime<Utc>) -> CalFoldResult<RRuleSet> {
        let mut ical = format!("DTSTART:{}", anchor.format("%Y%m%dT%H%M%SZ"));
        for line in &self.lines {
            ical.push('\n');
            ical.push_str(line);
        }

        ical.parse::<RRuleSet>()
            .map_err(|e| CalFoldError::pattern(&self.pattern, e.to_string()))
    }
}

fn is_rfc5545(pattern: &str) -> bool {
    let upper = pattern.to_ascii_uppercase();
    upper.contains("FREQ=") || upper.starts_with("RRULE") || upper.starts_with("DTSTART")
}

fn parse_rfc5545(pattern: &str, trimmed: &str) -> CalFoldResult<Rule> {
    let mut lines = Vec::new();
    let mut anchor = None;

    for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let upper = line.to_ascii_uppercase();

        if upper.starts_with("DTSTART") {
            anchor = Some(parse_dtstart(pattern, line)?);
        } else if upper.starts_with("RRULE") || upper.starts_with("RDATE") || upper.starts_with("EXDATE") {
            lines.push(line.to_string());
        } else if upper.starts_with("FREQ=") {
            lines.push(format!("RRULE:{}", line));
        } else {
            return Err(CalFoldError::pattern(pattern, format!("unsupported line '{}'", line)));
        }
    }

    let has_rule = lines.iter().any(|l| {
        let upper = l.to_ascii_uppercase();
        upper.starts_with("RRULE") || upper.starts_with("RDATE")
    });
    if !has_rule {
        return Err(CalFoldError::pattern(pattern, "no RRULE or RDATE line"));
    }

    Ok(Rule {
        pattern: pattern.to_string(),
        lines,
        anchor,
    })
}

fn parse_until(value: &str) -> Option<DateTime<Utc>> {
    if value.len() == 8 {
        return NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN).and_utc());
    }

    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y%m%dT%H%M%S")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Accepts UTC (`...Z`), floating (read as UTC) and `VALUE=DATE` starts.
fn parse_dtstart(pattern: &str, line: &str) -> CalFoldResult<DateTime<Utc>> {
    let (params, value) = line
        .rsplit_once(':')
        .ok_or_else(|| CalFoldError::pattern(pattern, format!("malformed '{}'", line)))?;

    if params.to_ascii_uppercase().contains("TZID") {
        return Err(CalFoldError::pattern(
            pattern,
            "timezone-aware DTSTART is not supported; use a UTC instant",
        ));
    }

    let value = value.trim();

    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|e| CalFoldError::pattern(pattern, format!("bad DTSTART '{}': {}", value, e)))?;
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y%m%dT%H%M%S")
        .map(|dt| dt.and_utc())
        .map_err(|e| CalFoldError::pattern(pattern, format!("bad DTSTART '{}': {}", value, e)))
}
