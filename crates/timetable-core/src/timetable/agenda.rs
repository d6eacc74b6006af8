//! "Now and next" lookup for a kid's day.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Matter, TimeBlock, Timetable, Weekday};

/// The block running at a given minute and the one after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowAndNext {
    pub day: Weekday,
    pub current: Option<TimeBlock>,
    pub next: Option<TimeBlock>,
    /// 0..100 progress through `current`.
    pub progress_pct: f64,
}

/// Find the current and next block on `date` at `now_min`.
///
/// Only blocks whose matter exists and is active on `date` are considered.
pub fn now_and_next(
    timetable: &Timetable,
    matters: &[Matter],
    date: NaiveDate,
    now_min: i32,
) -> NowAndNext {
    let day = Weekday::from_chrono(date.weekday());
    let by_id: HashMap<&str, &Matter> = matters.iter().map(|m| (m.id.as_str(), m)).collect();

    let mut todays: Vec<&TimeBlock> = timetable
        .day(day)
        .iter()
        .filter(|b| {
            by_id
                .get(b.matter_id.as_str())
                .is_some_and(|m| m.is_active_on(date))
        })
        .collect();
    todays.sort_by_key(|b| b.start_min);

    let current_idx = todays.iter().position(|b| b.range().contains_minute(now_min));
    let next = match current_idx {
        Some(idx) => todays.get(idx + 1),
        None => todays.iter().find(|b| b.start_min > now_min),
    };
    let current = current_idx.map(|idx| todays[idx]);

    let progress_pct = current
        .map(|b| {
            let elapsed = f64::from(now_min - b.start_min);
            let total = f64::from(b.duration_min().max(1));
            (elapsed / total * 100.0).clamp(0.0, 100.0)
        })
        .unwrap_or(0.0);

    NowAndNext {
        day,
        current: current.cloned(),
        next: next.map(|b| (*b).clone()),
        progress_pct,
    }
}
