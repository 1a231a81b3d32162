//! JSON-lines event log with optional checkpoint.

use std::path::PathBuf;

use calfold_core::constants::AGGREGATION_NAME;
use calfold_core::host::EventLog;
use calfold_core::{CalFoldError, CalFoldResult, EventStore, MutationRecord, RecordMeta, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const LOG_FILE: &str = "log.jsonl";
const CHECKPOINT_FILE: &str = "checkpoint.json";

/// One line of `log.jsonl`.
#[derive(Debug, Serialize, Deserialize)]
struct LogLine {
    seq: u64,
    at: DateTime<Utc>,
    record: Value,
    #[serde(default)]
    meta: RecordMeta,
}

/// The aggregate as of log position `seq`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Checkpoint {
    seq: u64,
    events: Snapshot,
}

pub struct FileLog {
    dir: PathBuf,
}

impl FileLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileLog { dir: dir.into() }
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE)
    }

    /// Parse every line of the log. Lines that are not valid JSON are skipped.
    async fn read_lines(&self) -> CalFoldResult<Vec<LogLine>> {
        let path = self.log_path();

        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&path).await?;

        let lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str::<LogLine>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("skipping unreadable line {} of {}: {}", n + 1, path.display(), e);
                    None
                }
            })
            .collect();

        Ok(lines)
    }

    async fn read_checkpoint(&self) -> CalFoldResult<Checkpoint> {
        let path = self.checkpoint_path();

        if !tokio::fs::try_exists(&path).await? {
            return Ok(Checkpoint::default());
        }

        let content = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&content)
            .map_err(|e| CalFoldError::Log(format!("Corrupt checkpoint {}: {}", path.display(), e)))
    }

    /// Snapshot and the log position it reflects.
    async fn replay(&self) -> CalFoldResult<(EventStore, u64)> {
        let checkpoint = self.read_checkpoint().await?;
        let lines = self.read_lines().await?;

        let newer: Vec<&LogLine> = lines.iter().filter(|l| l.seq > checkpoint.seq).collect();
        let seq = newer.iter().map(|l| l.seq).max().unwrap_or(checkpoint.seq);

        debug!(checkpoint = checkpoint.seq, replayed = newer.len(), "replaying event log");

        let state = EventStore::initialize(Some(checkpoint.events)).replay_raw(newer.iter().map(|l| &l.record));
        Ok((state, seq))
    }

    /// Persist the current aggregate so later snapshots replay only newer
    /// records. Returns the log position of the checkpoint.
    pub async fn checkpoint(&self) -> CalFoldResult<u64> {
        let (state, seq) = self.replay().await?;

        let checkpoint = Checkpoint {
            seq,
            events: state.serialize(),
        };
        let content = serde_json::to_vec_pretty(&checkpoint)?;
        super::write_atomic(&self.checkpoint_path(), &content).await?;

        Ok(seq)
    }

    async fn last_seq(&self) -> CalFoldResult<u64> {
        let checkpoint = self.read_checkpoint().await?;
        let last_line = self.read_lines().await?.iter().map(|l| l.seq).max().unwrap_or(0);

        Ok(last_line.max(checkpoint.seq))
    }
}

impl EventLog for FileLog {
    async fn current_snapshot(&self, aggregation: &str) -> CalFoldResult<EventStore> {
        if aggregation != AGGREGATION_NAME {
            return Err(CalFoldError::Log(format!("Unknown aggregation '{}'", aggregation)));
        }

        Ok(self.replay().await?.0)
    }

    async fn append_record(&self, record: &MutationRecord, meta: RecordMeta) -> CalFoldResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let line = LogLine {
            seq: self.last_seq().await? + 1,
            at: Utc::now(),
            record: record.to_value()?,
            meta,
        };

        let mut text = serde_json::to_string(&line)?;
        text.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.sync_data().await?;

        debug!(seq = line.seq, tag = record.tag(), "appended record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calfold_core::CalendarEvent;
    use chrono::TimeZone;

    fn event(id: &str, title: &str) -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        CalendarEvent::new(id, title, start, 15).unwrap()
    }

    async fn append(log: &FileLog, record: MutationRecord) {
        log.append_record(&record, RecordMeta::default()).await.unwrap();
    }

    async fn snapshot(log: &FileLog) -> EventStore {
        log.current_snapshot(AGGREGATION_NAME).await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_directory_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::new(dir.path().join("missing"));

        assert!(snapshot(&log).await.is_empty());
    }

    #[tokio::test]
    async fn test_append_and_replay() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::new(dir.path());

        append(&log, MutationRecord::set(event("e1", "Standup"))).await;
        append(&log, MutationRecord::set(event("e2", "Lunch"))).await;
        append(&log, MutationRecord::delete("e1")).await;

        let state = snapshot(&log).await;
        assert_eq!(state.len(), 1);
        assert!(state.get("e2").is_some());

        let content = std::fs::read_to_string(dir.path().join(LOG_FILE)).unwrap();
        let lines: Vec<LogLine> = content
            .lines()
            .map(|l| serde_json::from_str::<LogLine>(l).unwrap())
            .collect();
        let seqs: Vec<u64> = lines.iter().map(|l| l.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(lines[2].record, serde_json::json!({"type": "DELETE_EVENT", "eventId": "e1"}));
    }

    #[tokio::test]
    async fn test_checkpoint_then_more_records_matches_full_replay() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::new(dir.path());

        append(&log, MutationRecord::set(event("e1", "Standup"))).await;
        append(&log, MutationRecord::set(event("e2", "Lunch"))).await;
        assert_eq!(log.checkpoint().await.unwrap(), 2);

        append(&log, MutationRecord::set(event("e1", "Daily sync"))).await;
        append(&log, MutationRecord::delete("e2")).await;

        let resumed = snapshot(&log).await;

        std::fs::remove_file(dir.path().join(CHECKPOINT_FILE)).unwrap();
        let full = snapshot(&log).await;

        assert_eq!(resumed, full);
        assert_eq!(resumed.get("e1").unwrap().title, "Daily sync");
        assert!(resumed.get("e2").is_none());
    }

    #[tokio::test]
    async fn test_unreadable_and_foreign_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::new(dir.path());

        append(&log, MutationRecord::set(event("e1", "Standup"))).await;
        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(dir.path().join(LOG_FILE))
                .unwrap();
            writeln!(file, "{{not json").unwrap();
            writeln!(
                file,
                r#"{{"seq":3,"at":"2024-03-04T09:00:00Z","record":{{"type":"ARCHIVE","eventId":"e1"}}}}"#
            )
            .unwrap();
        }
        append(&log, MutationRecord::set(event("e2", "Lunch"))).await;

        let state = snapshot(&log).await;
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_aggregation() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileLog::new(dir.path());

        assert!(log.current_snapshot("tasks").await.is_err());
    }
}
