//! The event aggregate: current calendar state folded from the mutation log.
//!
//! `EventStore` is an immutable value. `reduce` never touches the state it is
//! called on; it hands back a new state, sharing the map with the old one
//! until a change forces a copy.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::event::CalendarEvent;
use crate::mutation::{MutationRecord, RecordError};

/// Plain, persistable form of the aggregate.
pub type Snapshot = BTreeMap<String, CalendarEvent>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStore {
    events: Arc<Snapshot>,
}

/// What a single record did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    Applied(Change),
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Inserted,
    Replaced,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The record's `type` is not one this reducer knows.
    UnknownTag(String),
    /// The record could not be decoded.
    Malformed(String),
    /// A delete named an id that is not in the store.
    MissingEvent(String),
}

/// The result of `EventStore::reduce`.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub state: EventStore,
    pub outcome: ReduceOutcome,
}

impl Reduction {
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, ReduceOutcome::Applied(_))
    }
}

impl From<RecordError> for IgnoreReason {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::UnknownTag(tag) => IgnoreReason::UnknownTag(tag),
            RecordError::Malformed(reason) => IgnoreReason::Malformed(reason),
        }
    }
}

impl EventStore {
    /// Start from a prior snapshot, or from nothing.
    pub fn initialize(prior: Option<Snapshot>) -> Self {
        EventStore {
            events: Arc::new(prior.unwrap_or_default()),
        }
    }

    /// Apply exactly one record.
    pub fn reduce(&self, record: &MutationRecord) -> Reduction {
        match record {
            MutationRecord::SetEvent { event } => {
                let mut events = Arc::clone(&self.events);
                let change = match Arc::make_mut(&mut events).insert(event.id.clone(), event.clone()) {
                    Some(_) => Change::Replaced,
                    None => Change::Inserted,
                };
                debug!(id = %event.id, ?change, "set event");

                Reduction {
                    state: EventStore { events },
                    outcome: ReduceOutcome::Applied(change),
                }
            }
            MutationRecord::DeleteEvent { event_id } => {
                if !self.events.contains_key(event_id) {
                    debug!(id = %event_id, "delete of unknown event ignored");
                    return self.ignore(IgnoreReason::MissingEvent(event_id.clone()));
                }

                let mut events = Arc::clone(&self.events);
                Arc::make_mut(&mut events).remove(event_id);
                debug!(id = %event_id, "deleted event");

                Reduction {
                    state: EventStore { events },
                    outcome: ReduceOutcome::Applied(Change::Removed),
                }
            }
        }
    }

    /// Apply one undecoded log entry. Entries that fail to decode leave the
    /// state untouched.
    pub fn reduce_raw(&self, raw: &Value) -> Reduction {
        match MutationRecord::decode(raw) {
            Ok(record) => self.reduce(&record),
            Err(err) => {
                warn!("skipping log record: {}", err);
                self.ignore(err.into())
            }
        }
    }

    /// Apply a sequence of records in order.
    pub fn fold<'a>(self, records: impl IntoIterator<Item = &'a MutationRecord>) -> Self {
        records
            .into_iter()
            .fold(self, |state, record| state.reduce(record).state)
    }

    /// Apply a sequence of undecoded log entries in order.
    pub fn replay_raw<'a>(self, records: impl IntoIterator<Item = &'a Value>) -> Self {
        records
            .into_iter()
            .fold(self, |state, raw| state.reduce_raw(raw).state)
    }

    /// A plain copy of the current state, safe to persist.
    pub fn serialize(&self) -> Snapshot {
        self.events.as_ref().clone()
    }

    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.get(id)
    }

    /// Stored events in id order.
    pub fn events(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn ignore(&self, reason: IgnoreReason) -> Reduction {
        Reduction {
            state: self.clone(),
            outcome: ReduceOutcome::Ignored(reason),
        }
    }
}
