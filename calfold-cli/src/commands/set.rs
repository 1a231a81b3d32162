use anyhow::Result;
use calfold_core::SetEventParams;
use owo_colors::OwoColorize;

use super::Agent;
use crate::utils::time::{parse_minutes, parse_when};

pub struct SetArgs {
    pub id: Option<String>,
    pub title: String,
    pub start: String,
    pub end: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
    pub every: Option<String>,
}

pub async fn run(agent: &Agent, args: SetArgs) -> Result<()> {
    let params = build_params(args)?;
    let event = agent.set_event(params).await?;

    println!("{}", format!("  Saved: {} ({})", event.title, event.id).green());
    if event.is_recurring {
        println!("  {}", format!("repeats: {}", event.recurrence_pattern).dimmed());
    }

    Ok(())
}

fn build_params(args: SetArgs) -> Result<SetEventParams> {
    let mut params = SetEventParams::new(args.title, parse_when(&args.start)?);

    params.id = args.id;
    params.description = args.description.unwrap_or_default();
    params.end_date_utc = args.end.as_deref().map(parse_when).transpose()?;
    params.duration = args.duration.as_deref().map(parse_minutes).transpose()?;

    // One hour unless told otherwise
    if params.end_date_utc.is_none() && params.duration.is_none() {
        params.duration = Some(60);
    }

    if let Some(pattern) = args.every {
        params.is_recurring = true;
        params.recurrence_pattern = pattern;
    }

    Ok(params)
}
