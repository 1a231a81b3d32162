//! Mutation records: the entries of the event log.
//!
//! Wire shape:
//! `{"type":"SET_EVENT","event":{...}}` or `{"type":"DELETE_EVENT","eventId":"..."}`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::CalFoldResult;
use crate::event::CalendarEvent;

pub const SET_EVENT: &str = "SET_EVENT";
pub const DELETE_EVENT: &str = "DELETE_EVENT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationRecord {
    /// Insert or wholesale replace the event with `event.id`.
    SetEvent { event: CalendarEvent },
    /// Remove the event with `event_id`, if present.
    DeleteEvent {
        #[serde(rename = "eventId")]
        event_id: String,
    },
}

/// Why a raw log entry could not be turned into a `MutationRecord`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("unknown record type '{0}'")]
    UnknownTag(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

impl MutationRecord {
    pub fn set(event: CalendarEvent) -> Self {
        MutationRecord::SetEvent { event }
    }

    pub fn delete(event_id: impl Into<String>) -> Self {
        MutationRecord::DeleteEvent {
            event_id: event_id.into(),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            MutationRecord::SetEvent { .. } => SET_EVENT,
            MutationRecord::DeleteEvent { .. } => DELETE_EVENT,
        }
    }

    /// The id of the event this record touches.
    pub fn event_id(&self) -> &str {
        match self {
            MutationRecord::SetEvent { event } => &event.id,
            MutationRecord::DeleteEvent { event_id } => event_id,
        }
    }

    /// Validate a raw log entry at the boundary.
    pub fn decode(raw: &Value) -> Result<Self, RecordError> {
        let tag = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| RecordError::Malformed("missing 'type' field".into()))?;

        if tag != SET_EVENT && tag != DELETE_EVENT {
            return Err(RecordError::UnknownTag(tag.to_string()));
        }

        MutationRecord::deserialize(raw).map_err(|e| RecordError::Malformed(e.to_string()))
    }

    /// The wire form appended to the log.
    pub fn to_value(&self) -> CalFoldResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Metadata attached to a record when it is appended to the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl RecordMeta {
    pub fn for_resource(id: impl Into<String>) -> Self {
        RecordMeta {
            resource_id: Some(id.into()),
        }
    }
}
