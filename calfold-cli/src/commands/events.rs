use anyhow::Result;
use calfold_core::Granularity;
use chrono::{Datelike, NaiveDate, Utc};

use super::Agent;
use crate::render;
use crate::utils::time::parse_when;

pub struct EventsArgs {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub json: bool,
}

pub async fn run(agent: &Agent, args: EventsArgs) -> Result<()> {
    let json = args.json;
    let granularity = select(args, Utc::now().date_naive())?;
    let mut events = agent.query().events_for(granularity).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    events.sort_by_key(|e| e.start_date_utc);
    render::print_events(&events);

    Ok(())
}

/// Turn the selector flags into a granularity. No flags means today.
fn select(args: EventsArgs, today: NaiveDate) -> Result<Granularity> {
    match (args.from, args.to) {
        (Some(from), Some(to)) => {
            if args.year.is_some() || args.month.is_some() || args.day.is_some() {
                anyhow::bail!("--from/--to cannot be combined with --year, --month or --day");
            }
            return Ok(Granularity::Range {
                start: parse_when(&from)?,
                end: parse_when(&to)?,
            });
        }
        (None, None) => {}
        _ => anyhow::bail!("--from and --to must be given together"),
    }

    match (args.year, args.month, args.day) {
        (None, None, None) => Ok(Granularity::Day {
            year: today.year(),
            month: today.month(),
            day: today.day(),
        }),
        (Some(year), None, None) => Ok(Granularity::Year { year }),
        (Some(year), Some(month), None) => Ok(Granularity::Month { year, month }),
        (Some(year), Some(month), Some(day)) => Ok(Granularity::Day { year, month, day }),
        (None, _, _) => anyhow::bail!("--month and --day need --year"),
        (Some(_), None, Some(_)) => anyhow::bail!("--day needs --month"),
    }
}
