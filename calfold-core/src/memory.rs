//! In-memory collaborators, for tests and embedding.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::constants::AGGREGATION_NAME;
use crate::error::{CalFoldError, CalFoldResult};
use crate::host::{EventLog, IdAllocator, JobScheduler, ScheduledJob};
use crate::mutation::{MutationRecord, RecordMeta};
use crate::store::EventStore;

fn lock<T>(mutex: &Mutex<T>) -> CalFoldResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| CalFoldError::Log("in-memory lock poisoned".into()))
}

/// Records kept in append order; every snapshot is a full replay.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<(Value, RecordMeta)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry as-is, bypassing record validation.
    pub fn push_raw(&self, raw: Value) -> CalFoldResult<()> {
        lock(&self.entries)?.push((raw, RecordMeta::default()));
        Ok(())
    }

    /// Appended entries and their metadata, oldest first.
    pub fn entries(&self) -> CalFoldResult<Vec<(Value, RecordMeta)>> {
        Ok(lock(&self.entries)?.clone())
    }
}

impl EventLog for MemoryLog {
    async fn current_snapshot(&self, aggregation: &str) -> CalFoldResult<EventStore> {
        if aggregation != AGGREGATION_NAME {
            return Err(CalFoldError::Log(format!("unknown aggregation '{}'", aggregation)));
        }

        let entries = lock(&self.entries)?;
        Ok(EventStore::default().replay_raw(entries.iter().map(|(raw, _)| raw)))
    }

    async fn append_record(&self, record: &MutationRecord, meta: RecordMeta) -> CalFoldResult<()> {
        let raw = record.to_value()?;
        lock(&self.entries)?.push((raw, meta));
        Ok(())
    }
}

/// Jobs keyed by dedupe key. Nothing fires on its own; call `take_due`.
#[derive(Debug, Default)]
pub struct MemoryScheduler {
    jobs: Mutex<BTreeMap<String, ScheduledJob>>,
}

impl MemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> CalFoldResult<Vec<ScheduledJob>> {
        Ok(lock(&self.jobs)?.values().cloned().collect())
    }

    pub fn job(&self, dedupe_key: &str) -> CalFoldResult<Option<ScheduledJob>> {
        Ok(lock(&self.jobs)?.get(dedupe_key).cloned())
    }

    /// Remove and return every job due at `now`, earliest first.
    pub fn take_due(&self, now: DateTime<Utc>) -> CalFoldResult<Vec<ScheduledJob>> {
        let mut jobs = lock(&self.jobs)?;
        let (mut due, pending): (Vec<ScheduledJob>, Vec<ScheduledJob>) =
            std::mem::take(&mut *jobs).into_values().partition(|j| j.is_due(now));

        jobs.extend(pending.into_iter().map(|j| (j.dedupe_key.clone(), j)));
        due.sort_by_key(|j| j.when);
        Ok(due)
    }
}

impl JobScheduler for MemoryScheduler {
    async fn schedule(&self, job: ScheduledJob) -> CalFoldResult<()> {
        lock(&self.jobs)?.insert(job.dedupe_key.clone(), job);
        Ok(())
    }

    async fn unschedule(&self, dedupe_key: &str) -> CalFoldResult<()> {
        lock(&self.jobs)?.remove(dedupe_key);
        Ok(())
    }
}

/// Hands out `evt-1`, `evt-2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl IdAllocator for SequentialIds {
    async fn allocate_id(&self) -> CalFoldResult<String> {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!("evt-{}", n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn job(key: &str, hour: u32) -> ScheduledJob {
        ScheduledJob {
            action: "notify".into(),
            payload: json!({}),
            when: Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap(),
            dedupe_key: key.into(),
        }
    }

    #[tokio::test]
    async fn test_log_replays_and_skips_foreign_records() {
        let log = MemoryLog::new();
        log.append_record(&MutationRecord::delete("nothing"), RecordMeta::default())
            .await
            .unwrap();
        log.push_raw(json!({"type": "SOMETHING_ELSE"})).unwrap();

        let snapshot = log.current_snapshot(AGGREGATION_NAME).await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(log.entries().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_log_stores_wire_form_of_record() {
        let log = MemoryLog::new();
        let record = MutationRecord::delete("e1");
        log.append_record(&record, RecordMeta::for_resource("e1")).await.unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries[0].0, json!({"type": "DELETE_EVENT", "eventId": "e1"}));
        assert_eq!(entries[0].0, record.to_value().unwrap());
    }

    #[tokio::test]
    async fn test_log_rejects_unknown_aggregation() {
        let log = MemoryLog::new();
        assert!(log.current_snapshot("tasks").await.is_err());
    }

    #[tokio::test]
    async fn test_scheduler_dedupes_and_takes_due() {
        let scheduler = MemoryScheduler::new();
        scheduler.schedule(job("a", 9)).await.unwrap();
        scheduler.schedule(job("a", 11)).await.unwrap();
        scheduler.schedule(job("b", 8)).await.unwrap();
        scheduler.schedule(job("c", 12)).await.unwrap();
        scheduler.unschedule("c").await.unwrap();
        scheduler.unschedule("never-there").await.unwrap();

        let due = scheduler
            .take_due(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap())
            .unwrap();
        assert_eq!(due, vec![job("b", 8)]);
        assert_eq!(scheduler.jobs().unwrap(), vec![job("a", 11)]);
    }

    #[tokio::test]
    async fn test_sequential_ids() {
        let ids = SequentialIds::default();
        assert_eq!(ids.allocate_id().await.unwrap(), "evt-1");
        assert_eq!(ids.allocate_id().await.unwrap(), "evt-2");
    }
}
