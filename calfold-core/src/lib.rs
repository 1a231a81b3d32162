//! Core of calfold: a calendar whose state is folded from an ordered log of
//! mutation records.
//!
//! - `store`: the aggregate and its reducer
//! - `rule` / `recurrence`: recurrence rules and template expansion
//! - `overlap` / `window` / `query`: windowed queries
//! - `agent`: the write side (set/delete events, reminders)
//! - `host`: the collaborator traits a host provides, with `memory` implementations

pub mod agent;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod host;
pub mod memory;
pub mod mutation;
pub mod overlap;
pub mod query;
pub mod recurrence;
pub mod rule;
pub mod store;
pub mod window;

pub use agent::CalendarAgent;
pub use error::{CalFoldError, CalFoldResult};
pub use event::{CalendarEvent, SetEventParams};
pub use mutation::{MutationRecord, RecordMeta};
pub use query::{QueryOptions, QueryService};
pub use store::{EventStore, ReduceOutcome, Snapshot};
pub use window::{Granularity, QueryWindow};
