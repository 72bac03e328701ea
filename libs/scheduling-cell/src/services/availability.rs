use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::appointment::Appointment;
use shared_models::error::ClinicError;
use shared_models::inventory::Treatment;
use shared_models::schedule::{BlockedInterval, ScheduleConfig};
use shared_models::time::{SlotTime, TimeRange};
use shared_utils::AppState;

use crate::models::{AvailableSlots, UnavailableReason};

/// Length of one booking: the treatment's own duration when it has one,
/// otherwise the doctor's slot length.
pub fn effective_duration(config: &ScheduleConfig, treatment: Option<&Treatment>) -> u32 {
    treatment
        .and_then(|t| t.duration_minutes)
        .filter(|minutes| *minutes > 0)
        .unwrap_or(config.slot_duration_min)
}

/// Walks the work window in steps of slot + break. A candidate whose end
/// would pass `work_end` is dropped, and so is every later one.
pub fn candidate_slots(config: &ScheduleConfig, duration_min: u32) -> Vec<TimeRange> {
    let mut candidates = Vec::new();
    let step = config.step_minutes();
    let mut start = config.work_start;

    while start < config.work_end {
        let Some(end) = start.checked_add_minutes(duration_min) else {
            break;
        };
        if end > config.work_end {
            break;
        }
        candidates.push(TimeRange { start, end });

        match start.checked_add_minutes(step) {
            Some(next) => start = next,
            None => break,
        }
    }

    candidates
}

/// Starts of the candidates that touch no occupying appointment and no block.
pub fn free_slots(
    candidates: &[TimeRange],
    appointments: &[Appointment],
    blocks: &[BlockedInterval],
) -> Vec<SlotTime> {
    candidates
        .iter()
        .filter(|candidate| {
            !appointments
                .iter()
                .filter(|a| a.occupies_slot())
                .any(|a| a.time_range().overlaps(candidate))
        })
        .filter(|candidate| !blocks.iter().any(|b| b.covers(candidate)))
        .map(|candidate| candidate.start)
        .collect()
}

pub struct AvailabilityService {
    store: Arc<dyn ClinicStore>,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn get_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        treatment: Option<&str>,
    ) -> Result<AvailableSlots, ClinicError> {
        self.get_available_slots_on(doctor_id, date, treatment, Utc::now().date_naive())
            .await
    }

    /// Same as `get_available_slots` with an explicit "today". Only whole
    /// past days are refused; slots earlier today are still listed.
    pub async fn get_available_slots_on(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        treatment: Option<&str>,
        today: NaiveDate,
    ) -> Result<AvailableSlots, ClinicError> {
        debug!("Computing slots for doctor {} on {}", doctor_id, date);

        if date < today {
            return Ok(AvailableSlots::unavailable(doctor_id, date, UnavailableReason::DateElapsed));
        }

        let Some(config) = self.store.get_schedule_config(doctor_id).await? else {
            return Ok(AvailableSlots::unavailable(doctor_id, date, UnavailableReason::NotConfigured));
        };

        let treatment = match treatment {
            Some(name) => Some(
                self.store
                    .find_treatment_by_name(name)
                    .await?
                    .ok_or_else(|| ClinicError::not_found("Treatment", name))?,
            ),
            None => None,
        };

        let duration = effective_duration(&config, treatment.as_ref());
        let candidates = candidate_slots(&config, duration);

        let blocks = self.store.list_blocks(doctor_id, date).await?;
        if blocks.iter().any(BlockedInterval::is_whole_day) {
            debug!("Doctor {} is blocked for the whole of {}", doctor_id, date);
            return Ok(AvailableSlots {
                doctor_id,
                date,
                slots: Vec::new(),
                slot_duration_min: Some(duration),
                total_candidates: candidates.len(),
                reason: Some(UnavailableReason::FullyBlocked),
            });
        }

        let appointments = self.store.list_doctor_appointments(doctor_id, date).await?;
        let slots = free_slots(&candidates, &appointments, &blocks);

        debug!(
            "Doctor {} on {}: {} of {} slots free",
            doctor_id,
            date,
            slots.len(),
            candidates.len()
        );

        Ok(AvailableSlots {
            doctor_id,
            date,
            slots,
            slot_duration_min: Some(duration),
            total_candidates: candidates.len(),
            reason: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::schedule::BlockSpan;

    fn t(raw: &str) -> SlotTime {
        SlotTime::parse(raw).unwrap()
    }

    fn config(start: &str, end: &str, slot: u32, pause: u32) -> ScheduleConfig {
        ScheduleConfig::new(Uuid::new_v4(), t(start), t(end), slot, pause).unwrap()
    }

    fn labels(slots: &[SlotTime]) -> Vec<String> {
        slots.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn full_day_without_breaks_yields_sixteen_half_hours() {
        let candidates = candidate_slots(&config("09:00", "17:00", 30, 0), 30);
        assert_eq!(candidates.len(), 16);
        assert_eq!(candidates[0].start, t("09:00"));
        assert_eq!(candidates[15].end, t("17:00"));
    }

    #[test]
    fn breaks_widen_the_step_but_not_the_slot() {
        let candidates = candidate_slots(&config("09:00", "11:00", 30, 15), 30);
        let starts: Vec<_> = candidates.iter().map(|c| c.start.to_string()).collect();
        assert_eq!(starts, ["09:00", "09:45", "10:30"]);
        assert!(candidates.iter().all(|c| c.duration_minutes() == 30));
    }

    #[test]
    fn candidates_that_overrun_the_window_are_dropped() {
        let candidates = candidate_slots(&config("09:00", "10:00", 20, 0), 45);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].end, t("09:45"));
    }

    #[test]
    fn treatment_duration_overrides_slot_length() {
        let cfg = config("09:00", "17:00", 30, 0);
        let long = Treatment::new("Root canal", 300.0, Some(90));
        let plain = Treatment::new("Checkup", 40.0, None);

        assert_eq!(effective_duration(&cfg, Some(&long)), 90);
        assert_eq!(effective_duration(&cfg, Some(&plain)), 30);
        assert_eq!(effective_duration(&cfg, None), 30);
    }

    #[test]
    fn bookings_and_blocks_remove_overlapping_candidates() {
        let cfg = config("09:00", "11:00", 30, 0);
        let day = NaiveDate::from_ymd_opt(2030, 5, 6).unwrap();
        let candidates = candidate_slots(&cfg, 30);

        let booked = Appointment::new(
            cfg.doctor_id,
            Uuid::new_v4(),
            day,
            TimeRange::new(t("09:15"), t("09:45")).unwrap(),
            "Checkup",
        );
        let mut cancelled = Appointment::new(
            cfg.doctor_id,
            Uuid::new_v4(),
            day,
            TimeRange::new(t("10:30"), t("11:00")).unwrap(),
            "Checkup",
        );
        cancelled.status = shared_models::appointment::AppointmentStatus::Cancelled;
        let block = BlockedInterval::new(
            cfg.doctor_id,
            day,
            BlockSpan::Range { start: t("10:00"), end: t("10:30") },
            "Admin",
        );

        let free = free_slots(&candidates, &[booked, cancelled], &[block]);
        assert_eq!(labels(&free), ["10:30"]);
    }
}
