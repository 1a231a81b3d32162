//! Reminder jobs persisted to `jobs.json`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use calfold_core::host::{JobScheduler, ScheduledJob};
use calfold_core::{CalFoldError, CalFoldResult};
use chrono::{DateTime, Utc};
use tracing::debug;

const JOBS_FILE: &str = "jobs.json";

/// Jobs are only stored here. Run `calfold notify` (e.g. from cron) to fire
/// the ones that are due.
pub struct FileScheduler {
    dir: PathBuf,
}

impl FileScheduler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileScheduler { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(JOBS_FILE)
    }

    async fn load(&self) -> CalFoldResult<BTreeMap<String, ScheduledJob>> {
        let path = self.path();

        if !tokio::fs::try_exists(&path).await? {
            return Ok(BTreeMap::new());
        }

        let content = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&content)
            .map_err(|e| CalFoldError::Scheduler(format!("Corrupt job file {}: {}", path.display(), e)))
    }

    async fn save(&self, jobs: &BTreeMap<String, ScheduledJob>) -> CalFoldResult<()> {
        let content = serde_json::to_vec_pretty(jobs)?;
        super::write_atomic(&self.path(), &content).await?;
        Ok(())
    }

    /// All pending jobs, earliest first.
    pub async fn jobs(&self) -> CalFoldResult<Vec<ScheduledJob>> {
        let mut jobs: Vec<ScheduledJob> = self.load().await?.into_values().collect();
        jobs.sort_by_key(|j| j.when);
        Ok(jobs)
    }

    /// Remove and return every job due at `now`, earliest first.
    pub async fn take_due(&self, now: DateTime<Utc>) -> CalFoldResult<Vec<ScheduledJob>> {
        let jobs = self.load().await?;
        let (mut due, pending): (BTreeMap<_, _>, BTreeMap<_, _>) =
            jobs.into_iter().partition(|(_, job)| job.is_due(now));

        if due.is_empty() {
            return Ok(Vec::new());
        }

        self.save(&pending).await?;

        let mut due: Vec<ScheduledJob> = std::mem::take(&mut due).into_values().collect();
        due.sort_by_key(|j| j.when);
        Ok(due)
    }
}

impl JobScheduler for FileScheduler {
    async fn schedule(&self, job: ScheduledJob) -> CalFoldResult<()> {
        let mut jobs = self.load().await?;
        debug!(key = %job.dedupe_key, when = %job.when, "scheduling job");
        jobs.insert(job.dedupe_key.clone(), job);
        self.save(&jobs).await
    }

    async fn unschedule(&self, dedupe_key: &str) -> CalFoldResult<()> {
        let mut jobs = self.load().await?;
        if jobs.remove(dedupe_key).is_some() {
            debug!(key = %dedupe_key, "unscheduled job");
            self.save(&jobs).await?;
        }
        Ok(())
    }
}
