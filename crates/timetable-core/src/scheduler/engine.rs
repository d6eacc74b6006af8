//! Scheduling engine.
//!
//! The engine is stateless: every operation receives the current block
//! list(s) of the affected day(s) and returns a [`ScheduleChange`] holding the
//! complete replacement list(s). Nothing is written here; the caller commits
//! the change through a store, all updates of one change as a single unit.
//!
//! ## Clamp order
//!
//! ```text
//! resize start: start = clamp(snap(start + d), day_start, end - min_dur)
//! resize end:   end   = clamp(snap(end + d),   start + min_dur, day_end)
//! move:         start = clamp(snap(start + d), day_start, day_end - dur)
//! ```
//!
//! The window and minimum duration are therefore structural results of the
//! clamps for any block that already satisfied them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SchedulingError;
use crate::interval::{is_free, MinuteRange};
use crate::time::{self, clamp, snap};
use crate::timetable::{sorted_by_start, TimeBlock, Weekday};

use super::slot::find_slot;
use super::SchedulerConfig;

/// Which edge of a block a resize manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Start,
    End,
}

/// Replacement block list for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayUpdate {
    pub day: Weekday,
    pub blocks: Vec<TimeBlock>,
}

/// Proposed result of a create, resize or move.
///
/// `updates` holds one entry for same-day changes and two (source first,
/// then target) for cross-day moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleChange {
    /// The block as it looks after the change.
    pub block: TimeBlock,
    pub updates: Vec<DayUpdate>,
}

impl ScheduleChange {
    fn single(day: Weekday, block: TimeBlock, blocks: Vec<TimeBlock>) -> Self {
        Self {
            block,
            updates: vec![DayUpdate { day, blocks }],
        }
    }

    pub fn is_cross_day(&self) -> bool {
        self.updates.len() > 1
    }

    /// Replacement list for `day`, if this change touches it.
    pub fn blocks_for(&self, day: Weekday) -> Option<&[TimeBlock]> {
        self.updates
            .iter()
            .find(|u| u.day == day)
            .map(|u| u.blocks.as_slice())
    }
}

/// Stateless scheduling policy over a validated [`SchedulerConfig`].
#[derive(Debug, Clone)]
pub struct SchedulingEngine {
    config: SchedulerConfig,
}

impl SchedulingEngine {
    /// # Errors
    /// Returns [`SchedulingError::InvalidConfig`] if the config is invalid.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulingError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    // ── Range math (shared by previews and commits) ─────────────────

    fn delta(&self, by_rows: i32) -> i32 {
        by_rows.saturating_mul(self.config.step_minutes)
    }

    /// Range after dragging one edge of `base` by `by_rows`.
    pub fn resize_range(&self, base: MinuteRange, anchor: Anchor, by_rows: i32) -> MinuteRange {
        let step = self.config.step_minutes;
        let min_dur = self.config.min_duration();
        let delta = self.delta(by_rows);

        match anchor {
            Anchor::Start => MinuteRange::new(
                clamp(
                    snap(base.start_min.saturating_add(delta), step),
                    self.config.day_start,
                    base.end_min - min_dur,
                ),
                base.end_min,
            ),
            Anchor::End => MinuteRange::new(
                base.start_min,
                clamp(
                    snap(base.end_min.saturating_add(delta), step),
                    base.start_min + min_dur,
                    self.config.day_end,
                ),
            ),
        }
    }

    /// Range after moving `base` by `by_rows` within its own day.
    pub fn move_range(&self, base: MinuteRange, by_rows: i32) -> MinuteRange {
        let duration = base.duration_min();
        let start = clamp(
            snap(base.start_min.saturating_add(self.delta(by_rows)), self.config.step_minutes),
            self.config.day_start,
            self.config.day_end - duration,
        );
        MinuteRange::starting_at(start, duration)
    }

    fn ensure_in_window(&self, range: MinuteRange) -> Result<(), SchedulingError> {
        if range.within(&self.config.window()) {
            Ok(())
        } else {
            Err(out_of_range(range))
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Block for a click on an empty cell at grid `row`.
    ///
    /// Free space is not checked here; the store's insert rejects
    /// overlaps. Use [`create_in_free_cell`](Self::create_in_free_cell) to
    /// check against the day first.
    pub fn create_from_cell(
        &self,
        day: Weekday,
        row: u32,
        matter_id: &str,
    ) -> Result<TimeBlock, SchedulingError> {
        if matter_id.trim().is_empty() {
            return Err(SchedulingError::MissingMatter);
        }
        let row = i32::try_from(row).unwrap_or(i32::MAX);
        let start = self
            .config
            .day_start
            .saturating_add(row.saturating_mul(self.config.step_minutes));
        let range = MinuteRange::new(start, start.saturating_add(self.config.create_duration()));

        if range.end_min > self.config.day_end {
            debug!(%day, row, range = %range, "create rejected: out of day range");
            return Err(out_of_range(range));
        }
        Ok(TimeBlock::with_new_id(matter_id, range))
    }

    /// [`create_from_cell`](Self::create_from_cell) plus an overlap check
    /// against `day_blocks`.
    pub fn create_in_free_cell(
        &self,
        day: Weekday,
        row: u32,
        matter_id: &str,
        day_blocks: &[TimeBlock],
    ) -> Result<ScheduleChange, SchedulingError> {
        let block = self.create_from_cell(day, row, matter_id)?;
        if !is_free(day_blocks, &block.range(), None) {
            debug!(%day, range = %block.range(), "create rejected: overlap");
            return Err(overlap(block.range()));
        }
        let mut blocks = day_blocks.to_vec();
        blocks.push(block.clone());
        Ok(ScheduleChange::single(day, block, sorted_by_start(blocks)))
    }

    /// Drag the `anchor` edge of `block` by `by_rows`.
    pub fn resize_block(
        &self,
        day: Weekday,
        block: &TimeBlock,
        anchor: Anchor,
        by_rows: i32,
        day_blocks: &[TimeBlock],
    ) -> Result<ScheduleChange, SchedulingError> {
        ensure_present(block, day_blocks)?;

        let next = self.resize_range(block.range(), anchor, by_rows);
        self.ensure_in_window(next)?;
        if next.duration_min() < self.config.min_duration() {
            return Err(SchedulingError::TooShort {
                duration_min: next.duration_min(),
                min_duration_min: self.config.min_duration(),
            });
        }
        if !is_free(day_blocks, &next, Some(&block.id)) {
            debug!(%day, block = %block.id, range = %next, "resize rejected: overlap");
            return Err(overlap(next));
        }

        let resized = block.at(next);
        let blocks = replace(day_blocks, &resized);
        Ok(ScheduleChange::single(day, resized, blocks))
    }

    /// Move `block` by `by_rows`, possibly into another day.
    ///
    /// Within a day the block lands exactly where the clamped delta puts it
    /// or the move fails with `Overlap`. Across days the slot allocator picks
    /// the first free placement at or after the requested time.
    pub fn move_block(
        &self,
        from_day: Weekday,
        to_day: Weekday,
        block: &TimeBlock,
        by_rows: i32,
        day_blocks_from: &[TimeBlock],
        day_blocks_to: &[TimeBlock],
    ) -> Result<ScheduleChange, SchedulingError> {
        ensure_present(block, day_blocks_from)?;

        if from_day == to_day {
            let candidate = self.move_range(block.range(), by_rows);
            self.ensure_in_window(candidate)?;
            if !is_free(day_blocks_from, &candidate, Some(&block.id)) {
                debug!(day = %from_day, block = %block.id, range = %candidate, "move rejected: overlap");
                return Err(overlap(candidate));
            }
            let moved = block.at(candidate);
            let blocks = replace(day_blocks_from, &moved);
            return Ok(ScheduleChange::single(from_day, moved, blocks));
        }

        let duration = block.duration_min();
        let desired = block.start_min.saturating_add(self.delta(by_rows));
        // A stale copy of this id in the target day must not survive the move.
        let mut target: Vec<TimeBlock> = day_blocks_to
            .iter()
            .filter(|b| b.id != block.id)
            .cloned()
            .collect();

        let slot = find_slot(&target, &self.config, desired, duration, None).ok_or_else(|| {
            debug!(%from_day, %to_day, block = %block.id, "move rejected: no free slot");
            SchedulingError::NoFreeSlot {
                day: to_day,
                duration_min: duration,
            }
        })?;

        let moved = block.at(slot);
        let source: Vec<TimeBlock> = day_blocks_from
            .iter()
            .filter(|b| b.id != block.id)
            .cloned()
            .collect();
        target.push(moved.clone());

        Ok(ScheduleChange {
            block: moved,
            updates: vec![
                DayUpdate {
                    day: from_day,
                    blocks: sorted_by_start(source),
                },
                DayUpdate {
                    day: to_day,
                    blocks: sorted_by_start(target),
                },
            ],
        })
    }

    /// Remove block `id`; unknown ids leave the list unchanged.
    pub fn delete_block(&self, day: Weekday, id: &str, day_blocks: &[TimeBlock]) -> DayUpdate {
        let blocks = day_blocks.iter().filter(|b| b.id != id).cloned().collect();
        DayUpdate {
            day,
            blocks: sorted_by_start(blocks),
        }
    }

    /// Like [`delete_block`](Self::delete_block) but reports unknown ids.
    pub fn delete_block_strict(
        &self,
        day: Weekday,
        id: &str,
        day_blocks: &[TimeBlock],
    ) -> Result<DayUpdate, SchedulingError> {
        if !day_blocks.iter().any(|b| b.id == id) {
            return Err(SchedulingError::NotFound(id.to_string()));
        }
        Ok(self.delete_block(day, id, day_blocks))
    }
}

fn ensure_present(block: &TimeBlock, day_blocks: &[TimeBlock]) -> Result<(), SchedulingError> {
    if day_blocks.iter().any(|b| b.id == block.id) {
        Ok(())
    } else {
        Err(SchedulingError::NotFound(block.id.clone()))
    }
}

fn replace(day_blocks: &[TimeBlock], updated: &TimeBlock) -> Vec<TimeBlock> {
    let blocks = day_blocks
        .iter()
        .map(|b| if b.id == updated.id { updated.clone() } else { b.clone() })
        .collect();
    sorted_by_start(blocks)
}

fn out_of_range(range: MinuteRange) -> SchedulingError {
    SchedulingError::OutOfRange {
        start: time::label(range.start_min),
        end: time::label(range.end_min),
    }
}

fn overlap(range: MinuteRange) -> SchedulingError {
    SchedulingError::Overlap {
        start: time::label(range.start_min),
        end: time::label(range.end_min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SchedulingEngine {
        SchedulingEngine::new(SchedulerConfig::default()).unwrap()
    }

    fn block(id: &str, start: &str, end: &str) -> TimeBlock {
        TimeBlock::new(
            id,
            "math",
            time::to_minutes(start).unwrap(),
            time::to_minutes(end).unwrap(),
        )
    }

    fn labels(b: &TimeBlock) -> (String, String) {
        (time::to_time(b.start_min).unwrap(), time::to_time(b.end_min).unwrap())
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = SchedulerConfig { step_minutes: -5, ..SchedulerConfig::default() };
        assert!(matches!(
            SchedulingEngine::new(cfg),
            Err(SchedulingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn create_first_row_uses_default_duration() {
        let b = engine().create_from_cell(Weekday::Mon, 0, "math").unwrap();
        assert_eq!(labels(&b), ("08:00".into(), "09:00".into()));
        assert_eq!(b.matter_id, "math");
        assert!(!b.id.is_empty());
    }

    #[test]
    fn create_past_day_end_is_out_of_range() {
        let e = engine();
        // row 108 = 17:00 → 18:00 fits exactly
        assert!(e.create_from_cell(Weekday::Mon, 108, "math").is_ok());
        assert!(matches!(
            e.create_from_cell(Weekday::Mon, 109, "math"),
            Err(SchedulingError::OutOfRange { .. })
        ));
        assert!(matches!(
            e.create_from_cell(Weekday::Mon, u32::MAX, "math"),
            Err(SchedulingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn create_requires_matter() {
        assert_eq!(
            engine().create_from_cell(Weekday::Mon, 0, "  "),
            Err(SchedulingError::MissingMatter)
        );
    }

    #[test]
    fn create_in_free_cell_checks_overlap() {
        let e = engine();
        let day = vec![block("a", "08:30", "09:00")];
        assert!(matches!(
            e.create_in_free_cell(Weekday::Mon, 0, "art", &day),
            Err(SchedulingError::Overlap { .. })
        ));
        let change = e.create_in_free_cell(Weekday::Mon, 12, "art", &day).unwrap();
        let blocks = change.blocks_for(Weekday::Mon).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id, "a");
    }

    #[test]
    fn resize_end_grows_block() {
        let e = engine();
        let b = block("b", "09:00", "10:00");
        let change = e.resize_block(Weekday::Mon, &b, Anchor::End, 12, &[b.clone()]).unwrap();
        assert_eq!(labels(&change.block), ("09:00".into(), "11:00".into()));

        let change = e.resize_block(Weekday::Mon, &b, Anchor::End, 24, &[b.clone()]).unwrap();
        assert_eq!(labels(&change.block), ("09:00".into(), "12:00".into()));
    }

    #[test]
    fn resize_into_neighbour_is_rejected() {
        let e = engine();
        let b = block("b", "09:00", "10:00");
        let other = block("o", "10:30", "11:00");
        let day = vec![b.clone(), other];
        for rows in [12, 24] {
            assert!(matches!(
                e.resize_block(Weekday::Mon, &b, Anchor::End, rows, &day),
                Err(SchedulingError::Overlap { .. })
            ));
        }
        // stopping at 10:30 touches but does not overlap
        let change = e.resize_block(Weekday::Mon, &b, Anchor::End, 6, &day).unwrap();
        assert_eq!(labels(&change.block).1, "10:30");
    }

    #[test]
    fn resize_start_clamps_to_window_floor() {
        let cfg = SchedulerConfig::default().with_min_duration(15);
        let e = SchedulingEngine::new(cfg).unwrap();
        let b = block("b", "08:00", "08:30");
        let change = e.resize_block(Weekday::Mon, &b, Anchor::Start, -3, &[b.clone()]).unwrap();
        assert_eq!(labels(&change.block), ("08:00".into(), "08:30".into()));
    }

    #[test]
    fn resize_cannot_go_below_minimum() {
        let cfg = SchedulerConfig::default().with_min_duration(15);
        let e = SchedulingEngine::new(cfg).unwrap();
        let b = block("b", "09:00", "10:00");
        let change = e.resize_block(Weekday::Mon, &b, Anchor::End, -100, &[b.clone()]).unwrap();
        assert_eq!(labels(&change.block), ("09:00".into(), "09:15".into()));
        let change = e.resize_block(Weekday::Mon, &b, Anchor::Start, 100, &[b.clone()]).unwrap();
        assert_eq!(labels(&change.block), ("09:45".into(), "10:00".into()));
    }

    #[test]
    fn resize_of_block_outside_narrowed_window_is_out_of_range() {
        let e = engine();
        let legacy = block("old", "07:00", "08:30");
        assert!(matches!(
            e.resize_block(Weekday::Mon, &legacy, Anchor::End, 1, &[legacy.clone()]),
            Err(SchedulingError::OutOfRange { .. })
        ));
    }

    #[test]
    fn resize_unknown_block_is_not_found() {
        let b = block("ghost", "09:00", "10:00");
        assert_eq!(
            engine().resize_block(Weekday::Mon, &b, Anchor::End, 1, &[]),
            Err(SchedulingError::NotFound("ghost".into()))
        );
    }

    #[test]
    fn same_day_move_shifts_by_rows() {
        let e = engine();
        let b = block("b", "08:00", "09:00");
        let change = e
            .move_block(Weekday::Mon, Weekday::Mon, &b, 2, &[b.clone()], &[b.clone()])
            .unwrap();
        assert_eq!(labels(&change.block), ("08:10".into(), "09:10".into()));
        assert!(!change.is_cross_day());
    }

    #[test]
    fn same_day_move_into_neighbour_is_rejected() {
        let e = engine();
        let b = block("b", "08:00", "09:00");
        let day = vec![b.clone(), block("n", "08:30", "08:45")];
        assert!(matches!(
            e.move_block(Weekday::Mon, Weekday::Mon, &b, 2, &day, &day),
            Err(SchedulingError::Overlap { .. })
        ));
    }

    #[test]
    fn same_day_move_clamps_to_window() {
        let e = engine();
        let b = block("b", "17:00", "17:30");
        let change = e
            .move_block(Weekday::Mon, Weekday::Mon, &b, 50, &[b.clone()], &[])
            .unwrap();
        assert_eq!(labels(&change.block), ("17:30".into(), "18:00".into()));
    }

    #[test]
    fn huge_row_deltas_clamp_to_window() {
        let e = engine();
        let b = block("b", "08:00", "09:00");
        let day = [b.clone()];

        for rows in [300_000_000, i32::MAX] {
            let moved = e.move_block(Weekday::Mon, Weekday::Mon, &b, rows, &day, &day).unwrap();
            assert_eq!(labels(&moved.block), ("17:00".into(), "18:00".into()));
            let grown = e.resize_block(Weekday::Mon, &b, Anchor::End, rows, &day).unwrap();
            assert_eq!(labels(&grown.block), ("08:00".into(), "18:00".into()));
        }

        let late = block("l", "16:00", "17:00");
        let day = [late.clone()];
        let moved = e.move_block(Weekday::Mon, Weekday::Mon, &late, i32::MIN, &day, &day).unwrap();
        assert_eq!(labels(&moved.block), ("08:00".into(), "09:00".into()));
        let grown = e.resize_block(Weekday::Mon, &late, Anchor::Start, i32::MIN, &day).unwrap();
        assert_eq!(labels(&grown.block), ("08:00".into(), "17:00".into()));
        let shrunk = e.resize_block(Weekday::Mon, &late, Anchor::End, i32::MIN, &day).unwrap();
        assert_eq!(labels(&shrunk.block), ("16:00".into(), "16:05".into()));

        let across = e.move_block(Weekday::Mon, Weekday::Tue, &late, i32::MAX, &day, &[]).unwrap();
        assert_eq!(labels(&across.block), ("17:00".into(), "18:00".into()));
        let across = e.move_block(Weekday::Mon, Weekday::Tue, &late, i32::MIN, &day, &[]).unwrap();
        assert_eq!(labels(&across.block), ("08:00".into(), "09:00".into()));
    }

    #[test]
    fn cross_day_move_returns_both_lists() {
        let e = engine();
        let b = block("b", "14:00", "15:00");
        let keep = block("k", "09:00", "10:00");
        let from = vec![keep.clone(), b.clone()];
        let to = vec![block("t", "14:00", "14:30")];

        let change = e.move_block(Weekday::Mon, Weekday::Wed, &b, 0, &from, &to).unwrap();
        assert!(change.is_cross_day());
        assert_eq!(change.block.id, "b");
        assert_eq!(change.block.matter_id, "math");
        assert_eq!(labels(&change.block), ("14:30".into(), "15:30".into()));
        assert_eq!(change.blocks_for(Weekday::Mon).unwrap(), &[keep][..]);
        let wed = change.blocks_for(Weekday::Wed).unwrap();
        assert_eq!(wed.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), ["t", "b"]);
    }

    #[test]
    fn cross_day_move_into_full_day_has_no_slot() {
        let e = engine();
        let b = block("b", "14:00", "15:00");
        let full = vec![block("all", "08:00", "18:00")];
        assert_eq!(
            e.move_block(Weekday::Mon, Weekday::Tue, &b, 0, &[b.clone()], &full),
            Err(SchedulingError::NoFreeSlot {
                day: Weekday::Tue,
                duration_min: 60
            })
        );
    }

    #[test]
    fn delete_is_idempotent() {
        let e = engine();
        let day = vec![block("a", "08:00", "09:00"), block("b", "10:00", "11:00")];
        let once = e.delete_block(Weekday::Mon, "a", &day);
        let twice = e.delete_block(Weekday::Mon, "a", &once.blocks);
        assert_eq!(once, twice);
        assert_eq!(once.blocks.len(), 1);
        assert_eq!(e.delete_block(Weekday::Mon, "zzz", &day).blocks, day);
    }

    #[test]
    fn strict_delete_reports_unknown_id() {
        let e = engine();
        let day = vec![block("a", "08:00", "09:00")];
        assert!(e.delete_block_strict(Weekday::Mon, "a", &day).is_ok());
        assert_eq!(
            e.delete_block_strict(Weekday::Mon, "zzz", &day),
            Err(SchedulingError::NotFound("zzz".into()))
        );
    }
}
