//! Free-slot search within a day window.
//!
//! [`find_slot`] is a first-fit forward scan: starting from the requested
//! start it walks later in `step_minutes` increments and takes the first
//! placement that collides with nothing. It never looks earlier than the
//! requested start, so relocated blocks drift toward later in the day when
//! the requested spot is taken.

use crate::interval::{is_free, MinuteRange};
use crate::time::{clamp, snap};
use crate::timetable::TimeBlock;

use super::SchedulerConfig;

/// First free placement of `duration_min` at or after `desired_start_min`.
///
/// The desired start is snapped to the grid and clamped into
/// `[day_start, day_end - duration]` before scanning. Returns `None` when the
/// window is exhausted.
pub fn find_slot(
    blocks: &[TimeBlock],
    config: &SchedulerConfig,
    desired_start_min: i32,
    duration_min: i32,
    exclude_id: Option<&str>,
) -> Option<MinuteRange> {
    let step = config.step_minutes.max(1);
    let first = clamp(
        snap(desired_start_min, step),
        config.day_start,
        config.day_end - duration_min,
    );

    let mut start = first;
    while start + duration_min <= config.day_end {
        let candidate = MinuteRange::starting_at(start, duration_min);
        if is_free(blocks, &candidate, exclude_id) {
            return Some(candidate);
        }
        start += step;
    }
    None
}

/// Unoccupied stretches of the day window, sorted by start.
///
/// Gaps shorter than `min_gap_min` are dropped. Blocks reaching outside
/// the window are cut to it.
pub fn free_gaps(blocks: &[TimeBlock], config: &SchedulerConfig, min_gap_min: i32) -> Vec<MinuteRange> {
    let mut sorted: Vec<MinuteRange> = blocks.iter().map(TimeBlock::range).collect();
    sorted.sort_by_key(|r| r.start_min);

    let mut gaps = Vec::new();
    let mut last_end = config.day_start;

    for range in &sorted {
        if range.end_min <= last_end {
            continue;
        }
        if range.start_min >= config.day_end {
            break;
        }
        if range.start_min > last_end {
            let gap = MinuteRange::new(last_end, range.start_min.min(config.day_end));
            if gap.duration_min() >= min_gap_min {
                gaps.push(gap);
            }
        }
        last_end = range.end_min.min(config.day_end);
    }

    if last_end < config.day_end {
        let gap = MinuteRange::new(last_end, config.day_end);
        if gap.duration_min() >= min_gap_min {
            gaps.push(gap);
        }
    }
    gaps
}
