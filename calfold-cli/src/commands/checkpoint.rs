use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use super::Agent;

pub async fn run(agent: &Agent) -> Result<()> {
    let seq = agent.log().checkpoint().await.context("Failed to write checkpoint")?;
    println!("{}", format!("  Checkpoint written at log position {}", seq).green());
    Ok(())
}
