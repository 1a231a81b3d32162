//! Recurring event expansion.
//!
//! Turns recurring templates into concrete occurrences within a window.
//! One-off events pass through untouched.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::CalFoldResult;
use crate::event::CalendarEvent;
use crate::rule::Rule;

/// Expand `events` over `[window_start, window_end)`.
///
/// Output order: one-off events first, in input order, followed by each
/// template's occurrences in rule order. A template with no occurrences in the
/// window contributes nothing. One unparsable pattern fails the whole call.
pub fn expand(
    events: &[CalendarEvent],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> CalFoldResult<Vec<CalendarEvent>> {
    let (templates, one_offs): (Vec<&CalendarEvent>, Vec<&CalendarEvent>) =
        events.iter().partition(|e| e.is_recurring);
    let mut expanded: Vec<CalendarEvent> = one_offs.into_iter().cloned().collect();

    for template in templates {
        let occurrences = expand_template(template, window_start, window_end)?;
        debug!(id = %template.id, count = occurrences.len(), "expanded recurring event");
        expanded.extend(occurrences);
    }

    Ok(expanded)
}

/// Occurrences of a single template within the window.
pub fn expand_template(
    template: &CalendarEvent,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> CalFoldResult<Vec<CalendarEvent>> {
    let rule = Rule::parse(&template.recurrence_pattern)?.anchored_at(template.start_date_utc);

    rule.occurrences_between(window_start, window_end)?
        .into_iter()
        .map(|start| template.occurrence_at(start))
        .collect()
}
