//! Collaborators the calendar core relies on but does not implement.
//!
//! The log substrate persists mutation records and rebuilds the aggregate by
//! running them through `EventStore::reduce`. The scheduler fires actions at a
//! future instant. The id allocator hands out ids for events created without one.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CalFoldResult;
use crate::mutation::{MutationRecord, RecordMeta};
use crate::store::EventStore;

pub trait EventLog {
    /// The aggregate as of the last appended record.
    fn current_snapshot(&self, aggregation: &str) -> impl Future<Output = CalFoldResult<EventStore>> + Send;

    /// Append one record. Records are applied in append order.
    fn append_record(
        &self,
        record: &MutationRecord,
        meta: RecordMeta,
    ) -> impl Future<Output = CalFoldResult<()>> + Send;
}

pub trait IdAllocator {
    fn allocate_id(&self) -> impl Future<Output = CalFoldResult<String>> + Send;
}

pub trait JobScheduler {
    /// Schedule `job`, replacing any job with the same dedupe key.
    fn schedule(&self, job: ScheduledJob) -> impl Future<Output = CalFoldResult<()>> + Send;

    /// Drop the job with `dedupe_key`. Unknown keys are not an error.
    fn unschedule(&self, dedupe_key: &str) -> impl Future<Output = CalFoldResult<()>> + Send;
}

/// An action to run at `when`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub action: String,
    pub payload: Value,
    pub when: DateTime<Utc>,
    pub dedupe_key: String,
}

impl ScheduledJob {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.when <= now
    }
}

/// Allocates random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidAllocator;

impl IdAllocator for UuidAllocator {
    async fn allocate_id(&self) -> CalFoldResult<String> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}
