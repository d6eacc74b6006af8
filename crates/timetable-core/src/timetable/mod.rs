//! Timetable domain types: weekdays, time blocks, kids and matters.
//!
//! A [`Timetable`] belongs to exactly one kid and holds one block list per
//! weekday. Block lists handed out by the store are always sorted by start
//! and free of overlaps; [`validate_blocks`] is the gate every write goes
//! through.

mod agenda;

pub use agenda::{now_and_next, NowAndNext};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::interval::MinuteRange;
use crate::time;

/// Day of the week, Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
            chrono::Weekday::Sun => Weekday::Sun,
        }
    }

    /// Index 0..6 with Monday at 0.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The seven days rotated so the week begins at `start`.
    pub fn week_from(start: Weekday) -> Vec<Weekday> {
        let offset = start.index();
        (0..7).map(|i| Weekday::ALL[(offset + i) % 7]).collect()
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weekday {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Weekday::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "weekday".to_string(),
                message: format!("expected one of mon..sun, got '{s}'"),
            })
    }
}

/// A single scheduled interval referencing one matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBlock {
    pub id: String,
    pub matter_id: String,
    #[serde(rename = "start", with = "crate::time::hhmm")]
    pub start_min: i32,
    #[serde(rename = "end", with = "crate::time::hhmm")]
    pub end_min: i32,
}

impl TimeBlock {
    pub fn new(
        id: impl Into<String>,
        matter_id: impl Into<String>,
        start_min: i32,
        end_min: i32,
    ) -> Self {
        Self {
            id: id.into(),
            matter_id: matter_id.into(),
            start_min,
            end_min,
        }
    }

    /// New block with a fresh v4 uuid.
    pub fn with_new_id(matter_id: impl Into<String>, range: MinuteRange) -> Self {
        Self::new(
            uuid::Uuid::new_v4().to_string(),
            matter_id,
            range.start_min,
            range.end_min,
        )
    }

    pub fn range(&self) -> MinuteRange {
        MinuteRange::new(self.start_min, self.end_min)
    }

    pub fn duration_min(&self) -> i32 {
        self.end_min - self.start_min
    }

    /// Same block placed at `range`.
    pub fn at(&self, range: MinuteRange) -> Self {
        Self {
            start_min: range.start_min,
            end_min: range.end_min,
            ..self.clone()
        }
    }
}

/// A kid's week: one block list per weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    pub kid_id: String,
    pub days: BTreeMap<Weekday, Vec<TimeBlock>>,
}

impl Timetable {
    /// Empty timetable with all seven days present.
    pub fn empty(kid_id: impl Into<String>) -> Self {
        Self {
            kid_id: kid_id.into(),
            days: empty_week(),
        }
    }

    pub fn day(&self, day: Weekday) -> &[TimeBlock] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Day holding the block with `id`, if any.
    pub fn find_block(&self, id: &str) -> Option<(Weekday, &TimeBlock)> {
        self.days
            .iter()
            .find_map(|(day, blocks)| blocks.iter().find(|b| b.id == id).map(|b| (*day, b)))
    }

    pub fn block_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }
}

pub fn empty_week() -> BTreeMap<Weekday, Vec<TimeBlock>> {
    Weekday::ALL.into_iter().map(|d| (d, Vec::new())).collect()
}

/// The owner of a timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kid {
    pub id: String,
    pub name: String,
}

/// A named, colored activity that blocks reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matter {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Matter {
    /// Whether `date` falls inside the matter's inclusive active range.
    /// Open ends are unbounded.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        if self.start_date.is_some_and(|start| date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| date > end) {
            return false;
        }
        true
    }
}

/// Sort `blocks` by start and check the day-level invariants.
///
/// # Errors
/// Fails on a block with `start >= end`, on duplicate ids, or on the first
/// overlapping pair.
pub fn validate_blocks(blocks: Vec<TimeBlock>) -> Result<Vec<TimeBlock>, ValidationError> {
    let sorted = sorted_by_start(blocks);

    let mut seen = HashSet::new();
    for block in &sorted {
        if block.start_min >= block.end_min {
            return Err(ValidationError::InvalidRange {
                id: block.id.clone(),
                start: time::label(block.start_min),
                end: time::label(block.end_min),
            });
        }
        if !seen.insert(block.id.as_str()) {
            return Err(ValidationError::DuplicateId(block.id.clone()));
        }
    }

    for pair in sorted.windows(2) {
        if pair[1].start_min < pair[0].end_min {
            return Err(ValidationError::Overlap {
                first: pair[0].id.clone(),
                second: pair[1].id.clone(),
            });
        }
    }
    Ok(sorted)
}

/// Stable sort by start minute.
pub fn sorted_by_start(mut blocks: Vec<TimeBlock>) -> Vec<TimeBlock> {
    blocks.sort_by_key(|b| b.start_min);
    blocks
}
