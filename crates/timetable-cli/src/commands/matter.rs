//! Matter management commands for CLI.

use chrono::NaiveDate;
use clap::Subcommand;
use timetable_core::{Database, Matter};
use uuid::Uuid;

use super::print_json;

#[derive(Subcommand)]
pub enum MatterAction {
    /// Create a new matter
    Create {
        /// Matter name
        name: String,
        /// Display color (e.g. "#3b82f6")
        #[arg(long)]
        color: Option<String>,
        /// First active day, YYYY-MM-DD
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// Last active day, YYYY-MM-DD
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    /// List all matters
    List,
    /// Update a matter
    Update {
        /// Matter ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Remove both dates
        #[arg(long)]
        clear_dates: bool,
    },
    /// Delete a matter and every block that uses it
    Delete {
        /// Matter ID
        id: String,
    },
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), Box<dyn std::error::Error>> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(format!("start date {start} is after end date {end}").into());
        }
    }
    Ok(())
}

pub fn run(action: MatterAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        MatterAction::Create {
            name,
            color,
            start_date,
            end_date,
        } => {
            check_dates(start_date, end_date)?;
            let matter = Matter {
                id: Uuid::new_v4().to_string(),
                name: name.trim().to_string(),
                color,
                start_date,
                end_date,
            };
            db.create_matter(&matter)?;
            println!("Matter created: {}", matter.id);
            print_json(&matter)?;
        }
        MatterAction::List => {
            print_json(&db.list_matters()?)?;
        }
        MatterAction::Update {
            id,
            name,
            color,
            start_date,
            end_date,
            clear_dates,
        } => {
            let mut matter = db
                .get_matter(&id)?
                .ok_or_else(|| format!("matter not found: {id}"))?;
            if let Some(name) = name {
                matter.name = name.trim().to_string();
            }
            if color.is_some() {
                matter.color = color;
            }
            if clear_dates {
                matter.start_date = None;
                matter.end_date = None;
            }
            if start_date.is_some() {
                matter.start_date = start_date;
            }
            if end_date.is_some() {
                matter.end_date = end_date;
            }
            check_dates(matter.start_date, matter.end_date)?;
            db.update_matter(&matter)?;
            print_json(&matter)?;
        }
        MatterAction::Delete { id } => {
            let removed = db.delete_matter(&id)?;
            println!("Matter deleted: {id} ({removed} blocks removed)");
        }
    }
    Ok(())
}
