//! Calendar event types.
//!
//! A `CalendarEvent` is either a one-off event or, when `is_recurring` is set,
//! a template whose own start/end describe the reference occurrence and whose
//! `recurrence_pattern` describes the rest.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CalFoldError, CalFoldResult};

/// A calendar event as stored in the aggregate and returned by queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date_utc: DateTime<Utc>,
    pub end_date_utc: DateTime<Utc>,
    /// Length in minutes. Occurrences of a template always use this, never
    /// the template's own end.
    #[serde(deserialize_with = "minutes")]
    pub duration: i64,
    #[serde(default)]
    pub is_recurring: bool,
    /// Only meaningful when `is_recurring` is set.
    #[serde(default)]
    pub recurrence_pattern: String,
}

impl CalendarEvent {
    /// A one-off event ending `duration` minutes after `start`.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        duration: i64,
    ) -> CalFoldResult<Self> {
        let title = title.into();
        check_duration(&title, duration)?;
        let end = add_minutes(start, duration)?;

        Ok(CalendarEvent {
            id: id.into(),
            title,
            description: String::new(),
            start_date_utc: start,
            end_date_utc: end,
            duration,
            is_recurring: false,
            recurrence_pattern: String::new(),
        })
    }

    /// Turn this event into a recurring template.
    pub fn recurring(mut self, pattern: impl Into<String>) -> Self {
        self.is_recurring = true;
        self.recurrence_pattern = pattern.into();
        self
    }

    /// A concrete copy of this event starting at `start` and lasting `duration` minutes.
    pub fn occurrence_at(&self, start: DateTime<Utc>) -> CalFoldResult<CalendarEvent> {
        let end = add_minutes(start, self.duration)?;

        Ok(CalendarEvent {
            start_date_utc: start,
            end_date_utc: end,
            ..self.clone()
        })
    }
}

fn check_duration(title: &str, duration: i64) -> CalFoldResult<()> {
    if duration < 0 {
        return Err(CalFoldError::InvalidEvent(format!(
            "event '{}' has a negative duration of {} minutes",
            title, duration
        )));
    }
    Ok(())
}

fn add_minutes(start: DateTime<Utc>, minutes: i64) -> CalFoldResult<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes)
        .and_then(|delta| start.checked_add_signed(delta))
        .ok_or_else(|| {
            CalFoldError::InvalidEvent(format!(
                "duration of {} minutes from {} is out of range",
                minutes, start
            ))
        })
}

/// Parameters for creating or replacing an event.
///
/// Everything except `title` and `start_date_utc` may be omitted. At least one
/// of `end_date_utc` and `duration` is required; the other is derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEventParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_utc: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "optional_minutes",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<i64>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_pattern: String,
}

impl SetEventParams {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>) -> Self {
        SetEventParams {
            id: None,
            title: title.into(),
            description: String::new(),
            start_date_utc: start,
            end_date_utc: None,
            duration: None,
            is_recurring: false,
            recurrence_pattern: String::new(),
        }
    }

    /// Build the stored event under `id`.
    ///
    /// A supplied end is kept as-is even when it disagrees with a supplied
    /// duration.
    pub fn into_event(self, id: String) -> CalFoldResult<CalendarEvent> {
        let start = self.start_date_utc;

        let (end, duration) = match (self.end_date_utc, self.duration) {
            (Some(end), Some(duration)) => (end, duration),
            (None, Some(duration)) => (add_minutes(start, duration)?, duration),
            (Some(end), None) => (end, (end - start).num_minutes()),
            (None, None) => {
                return Err(CalFoldError::InvalidEvent(format!(
                    "event '{}' needs an end date or a duration",
                    self.title
                )));
            }
        };

        check_duration(&self.title, duration)?;

        if end < start {
            return Err(CalFoldError::InvalidEvent(format!(
                "event '{}' ends before it starts",
                self.title
            )));
        }

        let recurrence_pattern = if self.is_recurring {
            self.recurrence_pattern
        } else {
            String::new()
        };

        Ok(CalendarEvent {
            id,
            title: self.title,
            description: self.description,
            start_date_utc: start,
            end_date_utc: end,
            duration,
            is_recurring: self.is_recurring,
            recurrence_pattern,
        })
    }
}

/// Durations arrive either as a JSON number or as a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Minutes {
    Number(i64),
    Text(String),
}

impl Minutes {
    fn into_minutes<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            Minutes::Number(n) => Ok(n),
            Minutes::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid duration in minutes: '{}'", s))),
        }
    }
}

fn minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Minutes::deserialize(deserializer)?.into_minutes()
}

fn optional_minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Option::<Minutes>::deserialize(deserializer)?
        .map(Minutes::into_minutes)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let event = CalendarEvent::new("e1", "Standup", start(), 15).unwrap();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["startDateUtc"], "2024-03-04T09:00:00Z");
        assert_eq!(json["endDateUtc"], "2024-03-04T09:15:00Z");
        assert_eq!(json["isRecurring"], false);
        assert_eq!(json["recurrencePattern"], "");
    }

    #[test]
    fn test_duration_accepts_numeric_string() {
        let event: CalendarEvent = serde_json::from_str(
            r#"{"id":"e1","title":"Standup","startDateUtc":"2024-03-04T09:00:00Z",
                "endDateUtc":"2024-03-04T09:15:00Z","duration":"15"}"#,
        )
        .unwrap();

        assert_eq!(event.duration, 15);
        assert_eq!(event.description, "");
        assert!(!event.is_recurring);
    }

    #[test]
    fn test_duration_rejects_garbage() {
        let result: Result<CalendarEvent, _> = serde_json::from_str(
            r#"{"id":"e1","title":"x","startDateUtc":"2024-03-04T09:00:00Z",
                "endDateUtc":"2024-03-04T09:15:00Z","duration":"soon"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_occurrence_uses_duration_not_template_end() {
        let mut template = CalendarEvent::new("r1", "Gym", start(), 60)
            .unwrap()
            .recurring("every day");
        template.end_date_utc = start() + TimeDelta::hours(5);

        let next = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let occurrence = template.occurrence_at(next).unwrap();

        assert_eq!(occurrence.start_date_utc, next);
        assert_eq!(occurrence.end_date_utc, next + TimeDelta::minutes(60));
        assert_eq!(occurrence.recurrence_pattern, "every day");
    }

    #[test]
    fn test_params_derive_end_from_duration() {
        let mut params = SetEventParams::new("Standup", start());
        params.duration = Some(15);

        let event = params.into_event("e1".into()).unwrap();
        assert_eq!(event.end_date_utc, start() + TimeDelta::minutes(15));
    }

    #[test]
    fn test_params_derive_duration_from_end() {
        let mut params = SetEventParams::new("Standup", start());
        params.end_date_utc = Some(start() + TimeDelta::minutes(45));

        let event = params.into_event("e1".into()).unwrap();
        assert_eq!(event.duration, 45);
    }

    #[test]
    fn test_params_keep_supplied_end_and_duration() {
        let mut params = SetEventParams::new("Standup", start());
        params.end_date_utc = Some(start() + TimeDelta::minutes(90));
        params.duration = Some(30);

        let event = params.into_event("e1".into()).unwrap();
        assert_eq!(event.duration, 30);
        assert_eq!(event.end_date_utc, start() + TimeDelta::minutes(90));
    }

    #[test]
    fn test_params_require_end_or_duration() {
        let params = SetEventParams::new("Standup", start());
        assert!(matches!(
            params.into_event("e1".into()),
            Err(CalFoldError::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_params_reject_end_before_start() {
        let mut params = SetEventParams::new("Standup", start());
        params.end_date_utc = Some(start() - TimeDelta::minutes(1));
        assert!(params.into_event("e1".into()).is_err());
    }

    #[test]
    fn test_params_reject_negative_duration_with_end() {
        let mut params = SetEventParams::new("Standup", start());
        params.end_date_utc = Some(start() + TimeDelta::minutes(30));
        params.duration = Some(-30);

        assert!(matches!(
            params.into_event("e1".into()),
            Err(CalFoldError::InvalidEvent(_))
        ));
    }

    #[test]
    fn test_new_rejects_negative_duration() {
        assert!(matches!(
            CalendarEvent::new("e1", "Standup", start(), -15),
            Err(CalFoldError::InvalidEvent(_))
        ));
        assert!(CalendarEvent::new("e1", "Ping", start(), 0).is_ok());
    }

    #[test]
    fn test_params_drop_pattern_on_one_off_events() {
        let mut params = SetEventParams::new("Standup", start());
        params.duration = Some(15);
        params.recurrence_pattern = "every day".into();

        let event = params.into_event("e1".into()).unwrap();
        assert!(event.recurrence_pattern.is_empty());
    }
}
