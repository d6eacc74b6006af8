//! Time block commands for CLI.

use clap::{Subcommand, ValueEnum};
use timetable_core::time::to_minutes;
use timetable_core::{Anchor, DragController, DragKind, TimetableStore, Weekday};

use super::{open_service, print_json};

#[derive(Clone, Copy, ValueEnum)]
pub enum Edge {
    Start,
    End,
}

impl From<Edge> for Anchor {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::Start => Anchor::Start,
            Edge::End => Anchor::End,
        }
    }
}

#[derive(Subcommand)]
pub enum BlockAction {
    /// Create a block from an empty grid cell
    Create {
        #[arg(long)]
        kid: String,
        /// Weekday (mon..sun)
        #[arg(long)]
        day: Weekday,
        #[arg(long)]
        matter: String,
        /// Grid row counted from the day start
        #[arg(long, conflicts_with = "at", required_unless_present = "at")]
        row: Option<u32>,
        /// Start time as HH:mm, converted to its grid row
        #[arg(long)]
        at: Option<String>,
    },
    /// Drag one edge of a block by a number of rows
    Resize {
        /// Block ID
        id: String,
        #[arg(long)]
        kid: String,
        #[arg(long)]
        day: Weekday,
        #[arg(long, value_enum)]
        edge: Edge,
        #[arg(long, allow_hyphen_values = true)]
        rows: i32,
    },
    /// Move a block by a number of rows, optionally to another day
    Move {
        /// Block ID
        id: String,
        #[arg(long)]
        kid: String,
        #[arg(long)]
        day: Weekday,
        /// Target day (defaults to the current day)
        #[arg(long)]
        to: Option<Weekday>,
        #[arg(long, allow_hyphen_values = true, default_value = "0")]
        rows: i32,
    },
    /// Replay a pointer drag measured in pixels
    Drag {
        /// Block ID
        id: String,
        #[arg(long)]
        kid: String,
        #[arg(long)]
        day: Weekday,
        /// Vertical displacement in pixels
        #[arg(long, allow_hyphen_values = true)]
        dy: f64,
        /// Day the pointer was released over
        #[arg(long)]
        to: Option<Weekday>,
        /// Resize this edge instead of moving
        #[arg(long, value_enum)]
        edge: Option<Edge>,
    },
    /// Delete a block
    Delete {
        /// Block ID
        id: String,
        #[arg(long)]
        kid: String,
        #[arg(long)]
        day: Weekday,
        /// Fail if the block does not exist
        #[arg(long)]
        strict: bool,
    },
}

pub fn run(action: BlockAction) -> Result<(), Box<dyn std::error::Error>> {
    let (config, service) = open_service()?;

    match action {
        BlockAction::Create {
            kid,
            day,
            matter,
            row,
            at,
        } => {
            let row = match (row, at) {
                (Some(row), _) => row,
                (None, Some(at)) => {
                    let row = config.scheduler.row_from_minutes(to_minutes(&at)?);
                    u32::try_from(row).map_err(|_| format!("{at} is before the day start"))?
                }
                (None, None) => return Err("either --row or --at is required".into()),
            };
            let block = service.create_from_cell(&kid, day, row, &matter)?;
            println!("Block created: {}", block.id);
            print_json(&block)?;
        }
        BlockAction::Resize {
            id,
            kid,
            day,
            edge,
            rows,
        } => {
            let block = service.resize_block(&kid, day, &id, edge.into(), rows)?;
            print_json(&block)?;
        }
        BlockAction::Move {
            id,
            kid,
            day,
            to,
            rows,
        } => {
            let block = service.move_block(&kid, day, to.unwrap_or(day), &id, rows)?;
            print_json(&block)?;
        }
        BlockAction::Drag {
            id,
            kid,
            day,
            dy,
            to,
            edge,
        } => {
            let block = service
                .store()
                .day_schedule(&kid, day)?
                .into_iter()
                .find(|b| b.id == id)
                .ok_or_else(|| format!("block not found: {id}"))?;
            let kind = match edge {
                Some(edge) => DragKind::Resize(edge.into()),
                None => DragKind::Move,
            };

            let mut drag = DragController::new(service.engine().clone(), config.view.row_height_px)?;
            drag.drag_start(day, block, kind)?;
            if let Some(preview) = drag.drag_move(dy) {
                tracing::debug!(
                    rows = preview.by_rows,
                    start = %preview.start_label,
                    end = %preview.end_label,
                    "drag preview"
                );
            }
            let block = service.drop_gesture(&kid, &mut drag, dy, to.unwrap_or(day))?;
            print_json(&block)?;
        }
        BlockAction::Delete {
            id,
            kid,
            day,
            strict,
        } => {
            service.delete_block(&kid, day, &id, strict)?;
            println!("Block deleted: {id}");
        }
    }
    Ok(())
}
