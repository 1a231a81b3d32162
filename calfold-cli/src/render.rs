use calfold_core::CalendarEvent;
use chrono::{DateTime, NaiveDate, Utc};
use owo_colors::OwoColorize;

/// Print events grouped by UTC day.
pub fn print_events(events: &[CalendarEvent]) {
    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return;
    }

    let today = Utc::now().date_naive();
    let mut current_date: Option<String> = None;

    for event in events {
        let date_label = format_date_label(event.start_date_utc, today);

        if current_date.as_ref() != Some(&date_label) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date_label.bold());
            current_date = Some(date_label);
        }

        let time = format_time(event);
        let id_tag = format!("[{}]", event.id);

        if event.is_recurring {
            println!("  {} {} {} {}", time, event.title, id_tag.dimmed(), "[recurring]".cyan());
        } else {
            println!("  {} {} {}", time, event.title, id_tag.dimmed());
        }
    }
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
fn format_date_label(start: DateTime<Utc>, today: NaiveDate) -> String {
    let date = start.date_naive();

    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%a %b %-d %Y").to_string(),
    }
}

/// e.g. "  09:00-09:15"
fn format_time(event: &CalendarEvent) -> String {
    format!(
        "{:>7}-{}",
        event.start_date_utc.format("%H:%M"),
        event.end_date_utc.format("%H:%M")
    )
}
