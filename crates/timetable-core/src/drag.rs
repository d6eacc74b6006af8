//! Drag gesture controller.
//!
//! Turns pointer displacement into engine operations. The controller holds
//! no block lists of its own: the baseline block is frozen at
//! [`drag_start`](DragController::drag_start), previews are computed from it
//! with the engine's range math, and the final operation runs against the
//! day lists supplied at drop time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Dragging -> Committing -> Idle
//!           |
//!           +-> Idle   (cancel, or the engine rejects the drop)
//! ```
//!
//! While a change is committing every new gesture is rejected with
//! [`DragError::Busy`], so at most one change per controller is in flight.
//!
//! ## Usage
//!
//! ```ignore
//! let mut drag = DragController::new(engine, 9.0)?;
//! drag.drag_start(Weekday::Mon, block, DragKind::Move)?;
//! let preview = drag.drag_move(42.0);
//! let change = drag.drag_end(108.0, Weekday::Wed, |day| store_lists(day))?;
//! store.commit(kid, &change.updates)?;
//! drag.finish_commit();
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DragError, SchedulingError};
use crate::interval::MinuteRange;
use crate::scheduler::{Anchor, ScheduleChange, SchedulingEngine};
use crate::time;
use crate::timetable::{TimeBlock, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragKind {
    Move,
    Resize(Anchor),
}

/// An active gesture: the block as it was when the drag began.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gesture {
    pub day: Weekday,
    pub block: TimeBlock,
    pub kind: DragKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging(Gesture),
    /// The drop produced a change the caller is persisting.
    Committing(Gesture),
}

/// Presentation-only view of where the block would land.
///
/// Not checked for overlaps; the drop may still be rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragPreview {
    pub day: Weekday,
    pub range: MinuteRange,
    pub by_rows: i32,
    pub start_label: String,
    pub end_label: String,
}

/// Messages for drivers that feed pointer events through a single entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DragMessage {
    Start {
        day: Weekday,
        block: TimeBlock,
        kind: DragKind,
    },
    Move {
        pixel_dy: f64,
    },
    End {
        pixel_dy: f64,
        drop_day: Weekday,
    },
    FinishCommit,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragReply {
    Started,
    Preview(Option<DragPreview>),
    Change(ScheduleChange),
    /// `true` if a committing gesture was released.
    Finished(bool),
    /// `true` if an active gesture was discarded.
    Cancelled(bool),
}

/// Gesture state machine over a [`SchedulingEngine`].
#[derive(Debug, Clone)]
pub struct DragController {
    engine: SchedulingEngine,
    row_height_px: f64,
    state: DragState,
}

impl DragController {
    /// # Errors
    /// Returns [`SchedulingError::InvalidConfig`] unless `row_height_px` is a
    /// positive finite number.
    pub fn new(engine: SchedulingEngine, row_height_px: f64) -> Result<Self, SchedulingError> {
        if !(row_height_px.is_finite() && row_height_px > 0.0) {
            return Err(SchedulingError::InvalidConfig(format!(
                "row height must be a positive number of pixels, got {row_height_px}"
            )));
        }
        Ok(Self {
            engine,
            row_height_px,
            state: DragState::Idle,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.engine
    }

    /// Whole rows covered by a vertical displacement, halves rounding up.
    pub fn rows_for(&self, pixel_dy: f64) -> i32 {
        // `as` saturates at the i32 bounds and maps NaN to 0.
        (pixel_dy / self.row_height_px + 0.5).floor() as i32
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn drag_start(&mut self, day: Weekday, block: TimeBlock, kind: DragKind) -> Result<(), DragError> {
        if !self.is_idle() {
            return Err(DragError::Busy);
        }
        debug!(%day, block = %block.id, ?kind, "drag started");
        self.state = DragState::Dragging(Gesture { day, block, kind });
        Ok(())
    }

    /// Preview for the current displacement; `None` unless dragging.
    pub fn drag_move(&self, pixel_dy: f64) -> Option<DragPreview> {
        let DragState::Dragging(gesture) = &self.state else {
            return None;
        };
        let by_rows = self.rows_for(pixel_dy);
        let base = gesture.block.range();
        let range = match gesture.kind {
            DragKind::Move => self.engine.move_range(base, by_rows),
            DragKind::Resize(anchor) => self.engine.resize_range(base, anchor, by_rows),
        };
        Some(DragPreview {
            day: gesture.day,
            range,
            by_rows,
            start_label: time::label(range.start_min),
            end_label: time::label(range.end_min),
        })
    }

    /// Drop the gesture and ask the engine for the resulting change.
    ///
    /// `blocks_for` supplies the current list of a day. A resize ignores
    /// `drop_day`. On success the controller is `Committing` until
    /// [`finish_commit`](Self::finish_commit); on failure it is back to `Idle`.
    pub fn drag_end<F>(
        &mut self,
        pixel_dy: f64,
        drop_day: Weekday,
        blocks_for: F,
    ) -> Result<ScheduleChange, DragError>
    where
        F: Fn(Weekday) -> Vec<TimeBlock>,
    {
        let gesture = match std::mem::replace(&mut self.state, DragState::Idle) {
            DragState::Dragging(gesture) => gesture,
            other => {
                self.state = other;
                return Err(DragError::NotDragging);
            }
        };

        let by_rows = self.rows_for(pixel_dy);
        let from_blocks = blocks_for(gesture.day);
        let result = match gesture.kind {
            DragKind::Move => {
                let to_blocks = if drop_day == gesture.day {
                    from_blocks.clone()
                } else {
                    blocks_for(drop_day)
                };
                self.engine.move_block(
                    gesture.day,
                    drop_day,
                    &gesture.block,
                    by_rows,
                    &from_blocks,
                    &to_blocks,
                )
            }
            DragKind::Resize(anchor) => {
                self.engine
                    .resize_block(gesture.day, &gesture.block, anchor, by_rows, &from_blocks)
            }
        };

        match result {
            Ok(change) => {
                self.state = DragState::Committing(gesture);
                Ok(change)
            }
            Err(e) => {
                debug!(block = %gesture.block.id, error = %e, "drop rejected");
                Err(e.into())
            }
        }
    }

    /// Release a committing gesture. Returns false if nothing was committing.
    pub fn finish_commit(&mut self) -> bool {
        if matches!(self.state, DragState::Committing(_)) {
            self.state = DragState::Idle;
            true
        } else {
            false
        }
    }

    /// Discard an active gesture without calling the engine.
    ///
    /// A committing gesture is not affected.
    pub fn cancel(&mut self) -> bool {
        if matches!(self.state, DragState::Dragging(_)) {
            self.state = DragState::Idle;
            true
        } else {
            false
        }
    }

    /// Dispatch a [`DragMessage`].
    pub fn handle<F>(&mut self, message: DragMessage, blocks_for: F) -> Result<DragReply, DragError>
    where
        F: Fn(Weekday) -> Vec<TimeBlock>,
    {
        match message {
            DragMessage::Start { day, block, kind } => {
                self.drag_start(day, block, kind).map(|()| DragReply::Started)
            }
            DragMessage::Move { pixel_dy } => Ok(DragReply::Preview(self.drag_move(pixel_dy))),
            DragMessage::End { pixel_dy, drop_day } => self
                .drag_end(pixel_dy, drop_day, blocks_for)
                .map(DragReply::Change),
            DragMessage::FinishCommit => Ok(DragReply::Finished(self.finish_commit())),
            DragMessage::Cancel => Ok(DragReply::Cancelled(self.cancel())),
        }
    }
}
