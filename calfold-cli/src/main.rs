mod commands;
mod local;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use calfold_core::CalendarAgent;
use calfold_core::config::CalfoldConfig;
use calfold_core::host::UuidAllocator;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::events::EventsArgs;
use crate::commands::set::SetArgs;
use crate::local::{FileLog, FileScheduler};

#[derive(Parser)]
#[command(name = "calfold")]
#[command(about = "A calendar kept as an append-only event log")]
struct Cli {
    /// Where the log and reminders live (overrides data_dir in config.toml)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an event, or replace one by id
    Set {
        /// Replace the event with this id instead of creating a new one
        #[arg(long)]
        id: Option<String>,

        #[arg(short, long)]
        title: String,

        /// Start date/time (e.g. "2025-03-20T15:00" or "friday 3pm"), UTC
        #[arg(short, long)]
        start: String,

        /// End date/time, UTC
        #[arg(short, long)]
        end: Option<String>,

        /// Length (e.g. "30m", "1h 30m" or minutes)
        #[arg(short, long)]
        duration: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Recurrence (e.g. "every week", "every weekday" or an RRULE)
        #[arg(short = 'r', long)]
        every: Option<String>,
    },
    /// Delete an event
    Delete { id: String },
    /// List events for today, a day, a month, a year or a range
    Events {
        #[arg(long)]
        year: Option<i32>,

        #[arg(long, requires = "year")]
        month: Option<u32>,

        #[arg(long, requires = "month")]
        day: Option<u32>,

        /// Range start (inclusive)
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Range end (exclusive)
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// Sort by start time (always the case for human output)
        #[arg(long)]
        sort: bool,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Print the current aggregate as JSON
    Snapshot,
    /// Compact the log into a checkpoint
    Checkpoint,
    /// Fire due reminders
    Notify,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = CalfoldConfig::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Commands::Events { sort: true, .. } = cli.command {
        config.sort_by_start = true;
    }

    let agent = build_agent(&config)?;

    match cli.command {
        Commands::Set {
            id,
            title,
            start,
            end,
            duration,
            description,
            every,
        } => {
            let args = SetArgs {
                id,
                title,
                start,
                end,
                duration,
                description,
                every,
            };
            commands::set::run(&agent, args).await
        }
        Commands::Delete { id } => commands::delete::run(&agent, &id).await,
        Commands::Events {
            year,
            month,
            day,
            from,
            to,
            json,
            ..
        } => {
            let args = EventsArgs {
                year,
                month,
                day,
                from,
                to,
                json,
            };
            commands::events::run(&agent, args).await
        }
        Commands::Snapshot => commands::snapshot::run(&agent).await,
        Commands::Checkpoint => commands::checkpoint::run(&agent).await,
        Commands::Notify => commands::notify::run(&agent).await,
    }
}

fn build_agent(config: &CalfoldConfig) -> Result<commands::Agent> {
    let dir = config.data_path();

    Ok(CalendarAgent::new(FileLog::new(&dir), UuidAllocator, FileScheduler::new(&dir))
        .with_notification_offset(config.notification_offset()?)
        .with_query_options(config.query_options()))
}
