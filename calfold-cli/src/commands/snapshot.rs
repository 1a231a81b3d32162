use anyhow::Result;
use calfold_core::constants::AGGREGATION_NAME;
use calfold_core::host::EventLog;

use super::Agent;

/// Print the current aggregate as JSON.
pub async fn run(agent: &Agent) -> Result<()> {
    let store = agent.log().current_snapshot(AGGREGATION_NAME).await?;
    println!("{}", serde_json::to_string_pretty(&store.serialize())?);
    Ok(())
}
