//! # Timetable Core Library
//!
//! Core logic for a weekly timetable: kids get one timetable each, and every
//! weekday holds a list of non-overlapping time blocks that reference
//! matters. The CLI binary is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Time & intervals**: `HH:mm` parsing, grid snapping and half-open
//!   minute ranges
//! - **Scheduling engine**: stateless create, resize, move and delete that
//!   return complete replacement lists for the affected days
//! - **Drag controller**: gesture state machine turning pixel displacement
//!   into engine calls
//! - **Storage**: SQLite persistence with atomic multi-day commits and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SchedulingEngine`]: scheduling rules over a [`SchedulerConfig`]
//! - [`DragController`]: drag gesture state machine
//! - [`Database`]: kids, matters and timetables
//! - [`Config`]: application configuration management

pub mod drag;
pub mod error;
pub mod interval;
pub mod scheduler;
pub mod storage;
pub mod time;
pub mod timetable;

pub use drag::{DragController, DragKind, DragMessage, DragPreview, DragReply, DragState};
pub use error::{ConfigError, CoreError, DatabaseError, DragError, SchedulingError, ValidationError};
pub use interval::MinuteRange;
pub use scheduler::{
    find_slot, free_gaps, Anchor, DayUpdate, ScheduleChange, SchedulerConfig, SchedulingEngine,
    TimetableService,
};
pub use storage::{Config, Database, TimetableStore, ViewConfig};
pub use timetable::{now_and_next, Kid, Matter, NowAndNext, TimeBlock, Timetable, Weekday};
