//! File-backed collaborators.
//!
//! Everything lives under the configured data directory:
//! - `log.jsonl`: the append-only mutation log, one record per line
//! - `checkpoint.json`: an optional snapshot of the aggregate at some log position
//! - `jobs.json`: scheduled reminder jobs keyed by dedupe key

mod log;
mod scheduler;

pub use log::FileLog;
pub use scheduler::FileScheduler;

use std::path::Path;

/// Write via a temp file and rename so readers never see a partial file.
async fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp = path.with_extension("tmp");
    tokio::fs::write(&temp, content).await?;
    tokio::fs::rename(&temp, path).await
}
