//! Time-block scheduling.
//!
//! - [`SchedulerConfig`]: day window and grid
//! - [`find_slot`] / [`free_gaps`]: free-space search inside a day
//! - [`SchedulingEngine`]: create, resize, move and delete as pure functions
//!   returning replacement block lists
//! - [`TimetableService`]: runs engine operations against a store

mod config;
mod engine;
mod service;
mod slot;

pub use config::SchedulerConfig;
pub use engine::{Anchor, DayUpdate, ScheduleChange, SchedulingEngine};
pub use service::TimetableService;
pub use slot::{find_slot, free_gaps};
