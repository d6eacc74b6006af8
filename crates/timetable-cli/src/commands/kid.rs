//! Kid management commands for CLI.

use clap::Subcommand;
use timetable_core::{Database, Kid};
use uuid::Uuid;

use super::print_json;

#[derive(Subcommand)]
pub enum KidAction {
    /// Add a kid (an empty timetable is created with it)
    Create {
        /// Display name
        name: String,
    },
    /// List all kids
    List,
    /// Rename a kid
    Rename {
        /// Kid ID
        id: String,
        /// New name
        name: String,
    },
    /// Delete a kid and its timetable
    Delete {
        /// Kid ID
        id: String,
    },
}

pub fn run(action: KidAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        KidAction::Create { name } => {
            let kid = Kid {
                id: Uuid::new_v4().to_string(),
                name: name.trim().to_string(),
            };
            db.create_kid(&kid)?;
            println!("Kid created: {}", kid.id);
            print_json(&kid)?;
        }
        KidAction::List => {
            print_json(&db.list_kids()?)?;
        }
        KidAction::Rename { id, name } => {
            let kid = db.rename_kid(&id, &name)?;
            print_json(&kid)?;
        }
        KidAction::Delete { id } => {
            if !db.delete_kid(&id)? {
                return Err(format!("kid not found: {id}").into());
            }
            println!("Kid deleted: {id}");
        }
    }
    Ok(())
}
