//! Windowed event queries.
//!
//! A query takes the current aggregate, keeps the events overlapping the
//! window, and expands the surviving recurring templates over that window.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::constants::AGGREGATION_NAME;
use crate::error::CalFoldResult;
use crate::event::CalendarEvent;
use crate::host::EventLog;
use crate::recurrence;
use crate::store::EventStore;
use crate::window::{Granularity, QueryWindow};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Stable-sort the final list by start instant.
    pub sort_by_start: bool,
    /// Expand every recurring template, even those whose reference occurrence
    /// lies outside the window.
    pub expand_all_templates: bool,
}

/// Run a query against an already-fetched snapshot.
pub fn events_in_window(
    snapshot: &EventStore,
    window: &QueryWindow,
    options: &QueryOptions,
) -> CalFoldResult<Vec<CalendarEvent>> {
    let candidates: Vec<CalendarEvent> = snapshot
        .events()
        .filter(|e| window.overlaps(e) || (options.expand_all_templates && e.is_recurring))
        .cloned()
        .collect();

    let mut events = recurrence::expand(&candidates, window.start, window.end)?;

    if options.sort_by_start {
        events.sort_by_key(|e| e.start_date_utc);
    }

    debug!(%window, stored = snapshot.len(), returned = events.len(), "query");
    Ok(events)
}

/// Queries over the snapshot held by an `EventLog`.
pub struct QueryService<'a, L> {
    log: &'a L,
    options: QueryOptions,
}

impl<'a, L: EventLog> QueryService<'a, L> {
    pub fn new(log: &'a L) -> Self {
        QueryService {
            log,
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn events_for(&self, granularity: Granularity) -> CalFoldResult<Vec<CalendarEvent>> {
        let window = QueryWindow::for_granularity(granularity)?;
        self.events_in(window).await
    }

    pub async fn events_in(&self, window: QueryWindow) -> CalFoldResult<Vec<CalendarEvent>> {
        let snapshot = self.log.current_snapshot(AGGREGATION_NAME).await?;
        events_in_window(&snapshot, &window, &self.options)
    }

    pub async fn events_for_date(&self, year: i32, month: u32, day: u32) -> CalFoldResult<Vec<CalendarEvent>> {
        self.events_for(Granularity::Day { year, month, day }).await
    }

    pub async fn events_for_month(&self, year: i32, month: u32) -> CalFoldResult<Vec<CalendarEvent>> {
        self.events_for(Granularity::Month { year, month }).await
    }

    pub async fn events_for_year(&self, year: i32) -> CalFoldResult<Vec<CalendarEvent>> {
        self.events_for(Granularity::Year { year }).await
    }

    pub async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CalFoldResult<Vec<CalendarEvent>> {
        self.events_for(Granularity::Range { start, end }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalFoldError;
    use crate::host::EventLog;
    use crate::memory::MemoryLog;
    use crate::mutation::{MutationRecord, RecordMeta};
    use chrono::{TimeDelta, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    async fn append(log: &MemoryLog, record: MutationRecord) {
        log.append_record(&record, RecordMeta::default()).await.unwrap();
    }

    fn ids(events: &[CalendarEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_set_query_delete_query() {
        let log = MemoryLog::new();
        let standup = CalendarEvent::new("e1", "Standup", at(2024, 3, 4, 9, 0), 15).unwrap();
        append(&log, MutationRecord::set(standup)).await;

        let query = QueryService::new(&log);
        assert_eq!(ids(&query.events_for_date(2024, 3, 4).await.unwrap()), vec!["e1"]);

        append(&log, MutationRecord::delete("e1")).await;
        assert!(query.events_for_date(2024, 3, 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_month_and_year_queries() {
        let log = MemoryLog::new();
        append(&log, MutationRecord::set(CalendarEvent::new("mar", "A", at(2024, 3, 4, 9, 0), 15).unwrap())).await;
        append(&log, MutationRecord::set(CalendarEvent::new("apr", "B", at(2024, 4, 1, 9, 0), 15).unwrap())).await;
        append(&log, MutationRecord::set(CalendarEvent::new("old", "C", at(2023, 4, 1, 9, 0), 15).unwrap())).await;

        let query = QueryService::new(&log);
        assert_eq!(ids(&query.events_for_month(2024, 3).await.unwrap()), vec!["mar"]);
        assert_eq!(ids(&query.events_for_year(2024).await.unwrap()), vec!["apr", "mar"]);
    }

    #[tokio::test]
    async fn test_event_spanning_midnight_shows_on_both_days() {
        let log = MemoryLog::new();
        let party = CalendarEvent::new("p1", "Party", at(2024, 3, 4, 22, 0), 240).unwrap();
        append(&log, MutationRecord::set(party)).await;

        let query = QueryService::new(&log);
        assert_eq!(query.events_for_date(2024, 3, 4).await.unwrap().len(), 1);
        assert_eq!(query.events_for_date(2024, 3, 5).await.unwrap().len(), 1);
        assert!(query.events_for_date(2024, 3, 6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recurring_template_expands_in_range() {
        let log = MemoryLog::new();
        let weekly = CalendarEvent::new("r1", "Planning", at(2024, 1, 1, 10, 0), 60)
            .unwrap()
            .recurring("every week");
        append(&log, MutationRecord::set(weekly)).await;

        let events = QueryService::new(&log)
            .events_between(at(2024, 1, 1, 0, 0), at(2024, 1, 22, 0, 0))
            .await
            .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[2].start_date_utc, at(2024, 1, 15, 10, 0));
        assert_eq!(events[2].end_date_utc, at(2024, 1, 15, 10, 0) + TimeDelta::minutes(60));
    }

    #[tokio::test]
    async fn test_template_outside_window_needs_expand_all() {
        let log = MemoryLog::new();
        let weekly = CalendarEvent::new("r1", "Planning", at(2024, 1, 1, 10, 0), 60)
            .unwrap()
            .recurring("every week");
        append(&log, MutationRecord::set(weekly)).await;

        let default = QueryService::new(&log);
        assert!(default.events_for_month(2024, 2).await.unwrap().is_empty());

        let all = QueryService::new(&log).with_options(QueryOptions {
            expand_all_templates: true,
            ..QueryOptions::default()
        });
        assert_eq!(all.events_for_month(2024, 2).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_sort_by_start_interleaves_occurrences() {
        let log = MemoryLog::new();
        let daily = CalendarEvent::new("r1", "Walk", at(2024, 1, 1, 7, 0), 30)
            .unwrap()
            .recurring("every day");
        let lunch = CalendarEvent::new("e1", "Lunch", at(2024, 1, 2, 12, 0), 60).unwrap();
        append(&log, MutationRecord::set(daily)).await;
        append(&log, MutationRecord::set(lunch)).await;

        let window = (at(2024, 1, 1, 0, 0), at(2024, 1, 4, 0, 0));

        let grouped = QueryService::new(&log).events_between(window.0, window.1).await.unwrap();
        assert_eq!(ids(&grouped), vec!["e1", "r1", "r1", "r1"]);

        let sorted = QueryService::new(&log)
            .with_options(QueryOptions {
                sort_by_start: true,
                ..QueryOptions::default()
            })
            .events_between(window.0, window.1)
            .await
            .unwrap();
        assert_eq!(ids(&sorted), vec!["r1", "r1", "e1", "r1"]);
    }

    #[tokio::test]
    async fn test_bad_pattern_fails_query_but_not_store() {
        let log = MemoryLog::new();
        let broken = CalendarEvent::new("r1", "Broken", at(2024, 3, 4, 7, 0), 30)
            .unwrap()
            .recurring("every now and then");
        append(&log, MutationRecord::set(broken)).await;

        let result = QueryService::new(&log).events_for_date(2024, 3, 4).await;
        assert!(matches!(result, Err(CalFoldError::InvalidRecurrencePattern { .. })));

        let snapshot = log.current_snapshot(AGGREGATION_NAME).await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_date_is_rejected() {
        let log = MemoryLog::new();
        let result = QueryService::new(&log).events_for_date(2024, 2, 30).await;
        assert!(matches!(result, Err(CalFoldError::InvalidDate(_))));
    }
}
