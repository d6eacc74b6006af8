use chrono::{Local, NaiveDate, Timelike};
use clap::Args;
use timetable_core::time::to_minutes;
use timetable_core::{now_and_next, TimetableStore};

use super::{open_service, print_json};

#[derive(Args)]
pub struct NowArgs {
    #[arg(long)]
    kid: String,
    /// Date to look at, YYYY-MM-DD (defaults to today)
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Time of day as HH:mm (defaults to now)
    #[arg(long)]
    time: Option<String>,
}

pub fn run(args: NowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (_, service) = open_service()?;
    let now = Local::now();

    let date = args.date.unwrap_or_else(|| now.date_naive());
    let minute = match args.time {
        Some(time) => to_minutes(&time)?,
        None => (now.hour() * 60 + now.minute()) as i32,
    };

    let timetable = service.store().timetable(&args.kid)?;
    let matters = service.store().list_matters()?;
    print_json(&now_and_next(&timetable, &matters, date, minute))?;
    Ok(())
}
