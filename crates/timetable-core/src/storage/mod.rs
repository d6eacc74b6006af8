mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, ViewConfig};
pub use database::{Database, ReconcileReport, RepairedBlock};

use std::path::PathBuf;

use crate::error::{ConfigError, CoreError, ValidationError};
use crate::scheduler::DayUpdate;
use crate::timetable::{validate_blocks, TimeBlock, Timetable, Weekday};

/// Returns the data directory, creating it if needed.
///
/// `TIMETABLE_DATA_DIR` wins when set; otherwise `~/.config/timetable/`,
/// or `~/.config/timetable-dev/` with `TIMETABLE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TIMETABLE_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("TIMETABLE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("timetable-dev")
            } else {
                base_dir.join("timetable")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Persistence boundary for timetables.
///
/// The store owns structural validation (ids, ordering, overlap of the list
/// it is handed); window and grid rules come from the engine's output.
pub trait TimetableStore {
    /// The kid's timetable, created empty on first request.
    fn timetable(&self, kid_id: &str) -> Result<Timetable, CoreError>;

    /// Blocks of one day, sorted by start.
    fn day_schedule(&self, kid_id: &str, day: Weekday) -> Result<Vec<TimeBlock>, CoreError> {
        Ok(self.timetable(kid_id)?.day(day).to_vec())
    }

    /// Replace one day's blocks. Returns the stored, sorted list.
    fn set_day_schedule(
        &self,
        kid_id: &str,
        day: Weekday,
        blocks: Vec<TimeBlock>,
    ) -> Result<Vec<TimeBlock>, CoreError>;

    /// Apply every update as one unit: either all days are replaced or none.
    fn commit(&self, kid_id: &str, updates: &[DayUpdate]) -> Result<(), CoreError>;

    /// Append `block` to a day, rejecting overlaps with what is stored.
    fn insert_block(
        &self,
        kid_id: &str,
        day: Weekday,
        block: TimeBlock,
    ) -> Result<Vec<TimeBlock>, CoreError> {
        let mut blocks = self.day_schedule(kid_id, day)?;
        blocks.push(block);
        let blocks = validate_blocks(blocks)?;
        self.set_day_schedule(kid_id, day, blocks)
    }
}

/// Validate every update before any of them is written.
pub(crate) fn validate_updates(updates: &[DayUpdate]) -> Result<Vec<DayUpdate>, ValidationError> {
    let mut seen_days = Vec::with_capacity(updates.len());
    updates
        .iter()
        .map(|update| {
            if seen_days.contains(&update.day) {
                return Err(ValidationError::InvalidValue {
                    field: "updates".to_string(),
                    message: format!("{} appears twice in one commit", update.day),
                });
            }
            seen_days.push(update.day);
            Ok(DayUpdate {
                day: update.day,
                blocks: validate_blocks(update.blocks.clone())?,
            })
        })
        .collect()
}
