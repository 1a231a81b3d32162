use anyhow::Result;
use calfold_core::agent::run_job;
use chrono::Utc;
use owo_colors::OwoColorize;
use tracing::warn;

use super::Agent;

/// Fire every reminder that is due now.
pub async fn run(agent: &Agent) -> Result<()> {
    let due = agent.scheduler().take_due(Utc::now()).await?;

    if due.is_empty() {
        println!("{}", "No reminders due".dimmed());
        return Ok(());
    }

    for job in &due {
        match run_job(job) {
            Ok(_) => println!(
                "  {} {}",
                "Reminder:".yellow(),
                job.payload["title"].as_str().unwrap_or(&job.dedupe_key)
            ),
            Err(err) => warn!(key = %job.dedupe_key, "job failed: {}", err),
        }
    }

    Ok(())
}
