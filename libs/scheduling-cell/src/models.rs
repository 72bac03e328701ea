use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::time::SlotTime;

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
    /// Treatment name; its duration replaces the slot length when set.
    pub treatment: Option<String>,
}

/// Why a slot listing is empty for reasons other than "everything is taken".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnavailableReason {
    #[serde(rename = "date elapsed")]
    DateElapsed,
    #[serde(rename = "not configured")]
    NotConfigured,
    #[serde(rename = "fully blocked")]
    FullyBlocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableSlots {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<SlotTime>,
    pub slot_duration_min: Option<u32>,
    /// Candidates generated from the work window before exclusion.
    pub total_candidates: usize,
    pub reason: Option<UnavailableReason>,
}

impl AvailableSlots {
    pub fn unavailable(doctor_id: Uuid, date: NaiveDate, reason: UnavailableReason) -> Self {
        Self {
            doctor_id,
            date,
            slots: Vec::new(),
            slot_duration_min: None,
            total_candidates: 0,
            reason: Some(reason),
        }
    }
}

// ==============================================================================
// SCHEDULE CONFIGURATION
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertScheduleRequest {
    pub work_start: SlotTime,
    pub work_end: SlotTime,
    pub slot_duration_min: u32,
    #[serde(default)]
    pub break_duration_min: u32,
}

// ==============================================================================
// BLOCKS
// ==============================================================================

/// One of `whole_day`, `time` (one slot long) or `time` + `end_time`.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockRequest {
    pub date: NaiveDate,
    pub time: Option<SlotTime>,
    pub end_time: Option<SlotTime>,
    #[serde(default)]
    pub whole_day: bool,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}
