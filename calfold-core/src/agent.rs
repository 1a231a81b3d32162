//! Calendar actions: the write side, plus reminder scheduling.
//!
//! `set_event` and `delete_event` append records to the log and keep the
//! event's reminder job in step with it. Reads go through `query()`.

use chrono::TimeDelta;
use tracing::{info, warn};

use crate::constants::{DEFAULT_NOTIFICATION_OFFSET_MINUTES, NOTIFY_ACTION, reminder_key};
use crate::error::{CalFoldError, CalFoldResult};
use crate::event::{CalendarEvent, SetEventParams};
use crate::host::{EventLog, IdAllocator, JobScheduler, ScheduledJob};
use crate::mutation::{MutationRecord, RecordMeta};
use crate::query::{QueryOptions, QueryService};
use crate::rule::Rule;

pub struct CalendarAgent<L, I, S> {
    log: L,
    ids: I,
    scheduler: S,
    notification_offset: TimeDelta,
    options: QueryOptions,
}

impl<L, I, S> CalendarAgent<L, I, S>
where
    L: EventLog,
    I: IdAllocator,
    S: JobScheduler,
{
    pub fn new(log: L, ids: I, scheduler: S) -> Self {
        CalendarAgent {
            log,
            ids,
            scheduler,
            notification_offset: TimeDelta::minutes(DEFAULT_NOTIFICATION_OFFSET_MINUTES),
            options: QueryOptions::default(),
        }
    }

    /// How long before an event starts its reminder fires.
    pub fn with_notification_offset(mut self, offset: TimeDelta) -> Self {
        self.notification_offset = offset;
        self
    }

    pub fn with_query_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn query(&self) -> QueryService<'_, L> {
        QueryService::new(&self.log).with_options(self.options)
    }

    /// Create or wholesale replace an event and (re)schedule its reminder.
    pub async fn set_event(&self, mut params: SetEventParams) -> CalFoldResult<CalendarEvent> {
        let id = match params.id.take().filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => self.ids.allocate_id().await?,
        };

        let event = params.into_event(id)?;

        if event.is_recurring {
            Rule::parse(&event.recurrence_pattern)?
                .anchored_at(event.start_date_utc)
                .validate()?;
        }

        self.log
            .append_record(&MutationRecord::set(event.clone()), RecordMeta::for_resource(&event.id))
            .await?;

        info!(id = %event.id, title = %event.title, "event saved");

        match self.reminder_for(&event) {
            Ok(job) => {
                if let Err(err) = self.scheduler.schedule(job).await {
                    warn!(id = %event.id, "could not schedule reminder: {}", err);
                }
            }
            Err(err) => warn!(id = %event.id, "no reminder: {}", err),
        }

        Ok(event)
    }

    /// Delete an event and drop its reminder. Returns the id.
    pub async fn delete_event(&self, event_id: &str) -> CalFoldResult<String> {
        self.log
            .append_record(&MutationRecord::delete(event_id), RecordMeta::default())
            .await?;

        info!(id = %event_id, "event deleted");

        if let Err(err) = self.scheduler.unschedule(&reminder_key(event_id)).await {
            warn!(id = %event_id, "could not unschedule reminder: {}", err);
        }

        Ok(event_id.to_string())
    }

    fn reminder_for(&self, event: &CalendarEvent) -> CalFoldResult<ScheduledJob> {
        let when = event
            .start_date_utc
            .checked_sub_signed(self.notification_offset)
            .ok_or_else(|| CalFoldError::InvalidEvent("reminder time out of range".into()))?;

        Ok(ScheduledJob {
            action: NOTIFY_ACTION.to_string(),
            payload: serde_json::to_value(event)?,
            when,
            dedupe_key: reminder_key(&event.id),
        })
    }
}

/// The reminder action.
pub fn notify(event: &CalendarEvent) -> &'static str {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| event.id.clone());
    info!("UPCOMING EVENT: {}", payload);
    "notified"
}

/// Run a job the scheduler has fired.
pub fn run_job(job: &ScheduledJob) -> CalFoldResult<&'static str> {
    match job.action.as_str() {
        NOTIFY_ACTION => {
            let event: CalendarEvent = serde_json::from_value(job.payload.clone())?;
            Ok(notify(&event))
        }
        other => Err(CalFoldError::Scheduler(format!("unknown action '{}'", other))),
    }
}
