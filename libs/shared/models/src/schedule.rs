use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClinicError;
use crate::time::{SlotTime, TimeRange};

/// A doctor's daily working pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    pub doctor_id: Uuid,
    pub work_start: SlotTime,
    pub work_end: SlotTime,
    pub slot_duration_min: u32,
    pub break_duration_min: u32,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleConfig {
    pub fn new(
        doctor_id: Uuid,
        work_start: SlotTime,
        work_end: SlotTime,
        slot_duration_min: u32,
        break_duration_min: u32,
    ) -> Result<Self, ClinicError> {
        let config = Self {
            doctor_id,
            work_start,
            work_end,
            slot_duration_min,
            break_duration_min,
            updated_at: Utc::now(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClinicError> {
        if self.work_start >= self.work_end {
            return Err(ClinicError::Validation(format!(
                "work_start {} must be before work_end {}",
                self.work_start, self.work_end
            )));
        }
        if self.slot_duration_min == 0 {
            return Err(ClinicError::Validation(
                "slot_duration_min must be positive".to_string(),
            ));
        }
        if self.slot_duration_min > self.work_window().duration_minutes() {
            return Err(ClinicError::Validation(
                "slot_duration_min does not fit in the work window".to_string(),
            ));
        }
        Ok(())
    }

    pub fn work_window(&self) -> TimeRange {
        TimeRange {
            start: self.work_start,
            end: self.work_end,
        }
    }

    /// Distance between consecutive slot starts.
    pub fn step_minutes(&self) -> u32 {
        self.slot_duration_min + self.break_duration_min
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockSpan {
    WholeDay,
    Range { start: SlotTime, end: SlotTime },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockedInterval {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub span: BlockSpan,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl BlockedInterval {
    pub fn new(doctor_id: Uuid, date: NaiveDate, span: BlockSpan, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            date,
            span,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_whole_day(&self) -> bool {
        self.span == BlockSpan::WholeDay
    }

    pub fn covers(&self, range: &TimeRange) -> bool {
        match self.span {
            BlockSpan::WholeDay => true,
            BlockSpan::Range { start, end } => TimeRange { start, end }.overlaps(range),
        }
    }
}
