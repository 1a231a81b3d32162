//! Half-open interval overlap.

use chrono::{DateTime, Utc};

use crate::event::CalendarEvent;

/// True when the event's `[start, end)` intersects `[window_start, window_end)`.
///
/// Both bounds are exclusive: an event ending exactly at `window_start` or
/// starting exactly at `window_end` does not overlap. A zero-length event
/// therefore never overlaps anything.
pub fn overlaps(event: &CalendarEvent, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
    window_start < event.end_date_utc && window_end > event.start_date_utc
}
