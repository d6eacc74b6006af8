pub mod block;
pub mod config;
pub mod day;
pub mod kid;
pub mod matter;
pub mod now;

use timetable_core::{Config, Database, SchedulingEngine, TimetableService};

/// Open the database and bind it to an engine built from the saved config.
pub fn open_service() -> Result<(Config, TimetableService<Database>), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let engine = SchedulingEngine::new(config.scheduler.clone())?;
    let db = Database::open()?;
    Ok((config, TimetableService::new(engine, db)))
}

/// Print `value` as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
