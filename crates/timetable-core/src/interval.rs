//! Half-open minute ranges and collision checks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time;
use crate::timetable::TimeBlock;

/// A half-open range `[start_min, end_min)` of minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MinuteRange {
    pub start_min: i32,
    pub end_min: i32,
}

impl MinuteRange {
    pub fn new(start_min: i32, end_min: i32) -> Self {
        Self { start_min, end_min }
    }

    /// Range of `duration_min` starting at `start_min`.
    pub fn starting_at(start_min: i32, duration_min: i32) -> Self {
        Self::new(start_min, start_min + duration_min)
    }

    pub fn duration_min(&self) -> i32 {
        self.end_min - self.start_min
    }

    /// Touching ranges (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &MinuteRange) -> bool {
        overlaps(self, other)
    }

    pub fn contains_minute(&self, minute: i32) -> bool {
        self.start_min <= minute && minute < self.end_min
    }

    /// True when the range lies entirely inside `window`.
    pub fn within(&self, window: &MinuteRange) -> bool {
        window.start_min <= self.start_min && self.end_min <= window.end_min
    }
}

impl fmt::Display for MinuteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", time::label(self.start_min), time::label(self.end_min))
    }
}

pub fn overlaps(a: &MinuteRange, b: &MinuteRange) -> bool {
    a.start_min < b.end_min && b.start_min < a.end_min
}

/// True iff no block in `blocks`, other than `exclude_id`, overlaps `candidate`.
pub fn is_free(blocks: &[TimeBlock], candidate: &MinuteRange, exclude_id: Option<&str>) -> bool {
    blocks
        .iter()
        .filter(|b| exclude_id != Some(b.id.as_str()))
        .all(|b| !overlaps(&b.range(), candidate))
}
