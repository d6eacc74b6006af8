//! Day window and grid settings for the scheduling engine.

use serde::{Deserialize, Serialize};

use crate::error::SchedulingError;
use crate::interval::MinuteRange;
use crate::time;

/// Scheduler configuration.
///
/// Times are minutes since midnight and serialize as `HH:mm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(with = "crate::time::hhmm", default = "default_day_start")]
    pub day_start: i32,
    #[serde(with = "crate::time::hhmm", default = "default_day_end")]
    pub day_end: i32,
    /// Grid granularity; every block boundary is a multiple of it.
    #[serde(default = "default_step_minutes")]
    pub step_minutes: i32,
    /// Length of blocks created from an empty cell.
    #[serde(default = "default_duration_min")]
    pub default_duration_min: i32,
    /// Shortest block a resize may produce. Defaults to `step_minutes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration_min: Option<i32>,
}

fn default_day_start() -> i32 {
    8 * 60
}
fn default_day_end() -> i32 {
    18 * 60
}
fn default_step_minutes() -> i32 {
    5
}
fn default_duration_min() -> i32 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            day_end: default_day_end(),
            step_minutes: default_step_minutes(),
            default_duration_min: default_duration_min(),
            min_duration_min: None,
        }
    }
}

impl SchedulerConfig {
    /// Build a config from `HH:mm` window bounds.
    ///
    /// # Errors
    /// Returns [`SchedulingError::Format`] for malformed times or
    /// [`SchedulingError::InvalidConfig`] when the result fails [`validate`](Self::validate).
    pub fn new(
        day_start: &str,
        day_end: &str,
        step_minutes: i32,
        default_duration_min: i32,
    ) -> Result<Self, SchedulingError> {
        let config = Self {
            day_start: time::to_minutes(day_start)?,
            day_end: time::to_minutes(day_end)?,
            step_minutes,
            default_duration_min,
            min_duration_min: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_min_duration(mut self, minutes: i32) -> Self {
        self.min_duration_min = Some(minutes);
        self
    }

    /// Check the window and grid invariants.
    ///
    /// Window bounds must sit on the grid so that snapping to absolute
    /// multiples of the step and counting rows from `day_start` agree.
    pub fn validate(&self) -> Result<(), SchedulingError> {
        let invalid = |msg: String| -> Result<(), SchedulingError> {
            Err(SchedulingError::InvalidConfig(msg))
        };
        let step = self.step_minutes;

        if step <= 0 {
            return invalid(format!("step_minutes must be positive, got {step}"));
        }
        if self.day_start >= self.day_end {
            return invalid(format!(
                "day_start {} must be before day_end {}",
                time::label(self.day_start),
                time::label(self.day_end)
            ));
        }
        if self.day_start % step != 0 || self.day_end % step != 0 {
            return invalid(format!("day window must be aligned to the {step} min grid"));
        }
        if self.default_duration_min <= 0 || self.default_duration_min % step != 0 {
            return invalid(format!(
                "default_duration_min must be a positive multiple of {step}, got {}",
                self.default_duration_min
            ));
        }
        let min = self.min_duration();
        if min <= 0 || min % step != 0 {
            return invalid(format!(
                "min_duration_min must be a positive multiple of {step}, got {min}"
            ));
        }
        if min > self.window_len() {
            return invalid(format!(
                "min_duration_min {min} exceeds the {} min window",
                self.window_len()
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> MinuteRange {
        MinuteRange::new(self.day_start, self.day_end)
    }

    pub fn window_len(&self) -> i32 {
        self.day_end - self.day_start
    }

    pub fn min_duration(&self) -> i32 {
        self.min_duration_min.unwrap_or(self.step_minutes)
    }

    /// Duration of a block created from a cell.
    pub fn create_duration(&self) -> i32 {
        self.default_duration_min.max(self.min_duration())
    }

    /// Number of grid rows in the window.
    pub fn row_count(&self) -> i32 {
        self.window_len() / self.step_minutes
    }

    /// Row containing `minutes`; off-grid values round down.
    pub fn row_from_minutes(&self, minutes: i32) -> i32 {
        (minutes - self.day_start).div_euclid(self.step_minutes)
    }

    pub fn minutes_from_row(&self, row: i32) -> i32 {
        self.day_start + row * self.step_minutes
    }

    /// Gutter labels for rows `0..=row_count`, one every `every_rows` rows.
    pub fn row_labels(&self, every_rows: i32) -> Vec<String> {
        let every = every_rows.max(1);
        (0..=self.row_count())
            .map(|row| {
                if row % every == 0 {
                    time::label(self.minutes_from_row(row))
                } else {
                    String::new()
                }
            })
            .collect()
    }
}
