//! Engine operations bound to a store.
//!
//! Each call reads the affected day lists, lets the engine compute the
//! change and commits every resulting [`DayUpdate`] in one store commit.

use tracing::info;

use super::{Anchor, DayUpdate, ScheduleChange, SchedulingEngine};
use crate::drag::DragController;
use crate::error::{CoreError, SchedulingError};
use crate::storage::TimetableStore;
use crate::timetable::{TimeBlock, Weekday};

pub struct TimetableService<S> {
    engine: SchedulingEngine,
    store: S,
}

impl<S: TimetableStore> TimetableService<S> {
    pub fn new(engine: SchedulingEngine, store: S) -> Self {
        Self { engine, store }
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn find(&self, kid_id: &str, day: Weekday, block_id: &str) -> Result<(TimeBlock, Vec<TimeBlock>), CoreError> {
        let blocks = self.store.day_schedule(kid_id, day)?;
        let block = blocks
            .iter()
            .find(|b| b.id == block_id)
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(block_id.to_string()))?;
        Ok((block, blocks))
    }

    /// Create a block at `row`. Overlaps are rejected by the store.
    pub fn create_from_cell(
        &self,
        kid_id: &str,
        day: Weekday,
        row: u32,
        matter_id: &str,
    ) -> Result<TimeBlock, CoreError> {
        let block = self.engine.create_from_cell(day, row, matter_id)?;
        self.store.insert_block(kid_id, day, block.clone())?;
        info!(kid = %kid_id, %day, block = %block.id, range = %block.range(), "block created");
        Ok(block)
    }

    pub fn resize_block(
        &self,
        kid_id: &str,
        day: Weekday,
        block_id: &str,
        anchor: Anchor,
        by_rows: i32,
    ) -> Result<TimeBlock, CoreError> {
        let (block, blocks) = self.find(kid_id, day, block_id)?;
        let change = self.engine.resize_block(day, &block, anchor, by_rows, &blocks)?;
        self.apply(kid_id, &change)?;
        Ok(change.block)
    }

    pub fn move_block(
        &self,
        kid_id: &str,
        from_day: Weekday,
        to_day: Weekday,
        block_id: &str,
        by_rows: i32,
    ) -> Result<TimeBlock, CoreError> {
        let (block, from_blocks) = self.find(kid_id, from_day, block_id)?;
        let to_blocks = if from_day == to_day {
            from_blocks.clone()
        } else {
            self.store.day_schedule(kid_id, to_day)?
        };
        let change = self
            .engine
            .move_block(from_day, to_day, &block, by_rows, &from_blocks, &to_blocks)?;
        self.apply(kid_id, &change)?;
        Ok(change.block)
    }

    /// Idempotent; with `strict` an unknown id is reported as not found.
    pub fn delete_block(&self, kid_id: &str, day: Weekday, block_id: &str, strict: bool) -> Result<(), CoreError> {
        let blocks = self.store.day_schedule(kid_id, day)?;
        let update: DayUpdate = if strict {
            self.engine.delete_block_strict(day, block_id, &blocks)?
        } else {
            self.engine.delete_block(day, block_id, &blocks)
        };
        self.store.commit(kid_id, &[update])
    }

    /// Commit every update of `change` as one unit.
    pub fn apply(&self, kid_id: &str, change: &ScheduleChange) -> Result<(), CoreError> {
        self.store.commit(kid_id, &change.updates)?;
        info!(
            kid = %kid_id,
            block = %change.block.id,
            range = %change.block.range(),
            cross_day = change.is_cross_day(),
            "schedule change applied"
        );
        Ok(())
    }

    /// Drop the controller's gesture and persist the result.
    ///
    /// The controller is released whether or not the commit succeeds.
    pub fn drop_gesture(
        &self,
        kid_id: &str,
        drag: &mut DragController,
        pixel_dy: f64,
        drop_day: Weekday,
    ) -> Result<TimeBlock, CoreError> {
        let timetable = match self.store.timetable(kid_id) {
            Ok(timetable) => timetable,
            Err(e) => {
                drag.cancel();
                return Err(e);
            }
        };
        let change = drag.drag_end(pixel_dy, drop_day, |day| timetable.day(day).to_vec())?;
        let committed = self.apply(kid_id, &change);
        drag.finish_commit();
        committed?;
        Ok(change.block)
    }
}
