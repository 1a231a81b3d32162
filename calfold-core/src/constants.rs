//! Shared constants.

/// Name of the aggregation the reducer is registered under.
pub const AGGREGATION_NAME: &str = "events";

/// Scheduler action fired ahead of an event.
pub const NOTIFY_ACTION: &str = "notify";

/// Prefix of the scheduler dedupe key for an event's reminder.
pub const REMINDER_KEY_PREFIX: &str = "reminder_";

/// How long before an event starts its reminder fires.
pub const DEFAULT_NOTIFICATION_OFFSET_MINUTES: i64 = 30;

/// Upper bound on occurrences materialized for one template in one window.
pub const MAX_OCCURRENCES: u16 = u16::MAX;

/// Dedupe key used when scheduling the reminder for `event_id`.
pub fn reminder_key(event_id: &str) -> String {
    format!("{}{}", REMINDER_KEY_PREFIX, event_id)
}
