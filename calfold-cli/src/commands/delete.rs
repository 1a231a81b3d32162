use anyhow::Result;
use owo_colors::OwoColorize;

use super::Agent;

pub async fn run(agent: &Agent, id: &str) -> Result<()> {
    let id = agent.delete_event(id).await?;
    println!("{}", format!("  Deleted: {}", id).red());
    Ok(())
}
