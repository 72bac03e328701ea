use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use scheduling_cell::models::{BlockRequest, UnavailableReason, UpsertScheduleRequest};
use scheduling_cell::services::{AvailabilityService, BlockRegistry, ScheduleService};
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::error::ClinicError;
use shared_models::inventory::Treatment;
use shared_models::time::{SlotTime, TimeRange};
use shared_utils::test_utils::TestConfig;
use shared_utils::AppState;

fn t(raw: &str) -> SlotTime {
    SlotTime::parse(raw).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 5, 1).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 5, 6).unwrap()
}

async fn configured_doctor(state: &AppState, slot: u32, pause: u32) -> Uuid {
    let doctor_id = Uuid::new_v4();
    ScheduleService::new(state)
        .upsert_config(
            doctor_id,
            UpsertScheduleRequest {
                work_start: t("09:00"),
                work_end: t("17:00"),
                slot_duration_min: slot,
                break_duration_min: pause,
            },
        )
        .await
        .unwrap();
    doctor_id
}

fn slot_block(date: NaiveDate, time: &str, reason: &str) -> BlockRequest {
    BlockRequest {
        date,
        time: Some(t(time)),
        end_time: None,
        whole_day: false,
        reason: reason.to_string(),
    }
}

async fn book(state: &AppState, doctor_id: Uuid, start: &str, minutes: u32) -> Appointment {
    let appointment = Appointment::new(
        doctor_id,
        Uuid::new_v4(),
        day(),
        TimeRange::starting_at(t(start), minutes).unwrap(),
        "Checkup",
    );
    state.store.insert_appointment_if_free(appointment).await.unwrap()
}

#[tokio::test]
async fn lunch_block_and_booking_shrink_the_day() {
    let state = TestConfig::default().to_state();
    let doctor_id = configured_doctor(&state, 30, 0).await;
    let availability = AvailabilityService::new(&state);

    let open = availability
        .get_available_slots_on(doctor_id, day(), None, today())
        .await
        .unwrap();
    assert_eq!(open.slots.len(), 16);
    assert_eq!(open.total_candidates, 16);
    assert_eq!(open.reason, None);

    BlockRegistry::new(&state)
        .block(doctor_id, slot_block(day(), "12:00", "Lunch"))
        .await
        .unwrap();
    let after_block = availability
        .get_available_slots_on(doctor_id, day(), None, today())
        .await
        .unwrap();
    assert_eq!(after_block.slots.len(), 15);
    assert!(!after_block.slots.contains(&t("12:00")));

    book(&state, doctor_id, "09:00", 30).await;
    let after_booking = availability
        .get_available_slots_on(doctor_id, day(), None, today())
        .await
        .unwrap();
    assert_eq!(after_booking.slots.len(), 14);
    assert!(!after_booking.slots.contains(&t("09:00")));
    assert_eq!(after_booking.total_candidates, 16);
}

#[tokio::test]
async fn returned_slots_never_touch_bookings_or_blocks() {
    let state = TestConfig::default().to_state();
    let doctor_id = configured_doctor(&state, 20, 10).await;
    let availability = AvailabilityService::new(&state);

    book(&state, doctor_id, "09:30", 20).await;
    book(&state, doctor_id, "13:00", 20).await;
    BlockRegistry::new(&state)
        .block(
            doctor_id,
            BlockRequest {
                date: day(),
                time: Some(t("10:45")),
                end_time: Some(t("12:10")),
                whole_day: false,
                reason: "Ward round".to_string(),
            },
        )
        .await
        .unwrap();

    let result = availability
        .get_available_slots_on(doctor_id, day(), None, today())
        .await
        .unwrap();
    let appointments = state.store.list_doctor_appointments(doctor_id, day()).await.unwrap();
    let blocks = state.store.list_blocks(doctor_id, day()).await.unwrap();

    assert!(!result.slots.is_empty());
    for start in &result.slots {
        let slot = TimeRange::starting_at(*start, 20).unwrap();
        assert!(appointments.iter().all(|a| !a.time_range().overlaps(&slot)), "{} overlaps a booking", start);
        assert!(blocks.iter().all(|b| !b.covers(&slot)), "{} overlaps a block", start);
    }
}

#[tokio::test]
async fn cancelled_bookings_free_their_slot() {
    let state = TestConfig::default().to_state();
    let doctor_id = configured_doctor(&state, 30, 0).await;
    let booked = book(&state, doctor_id, "10:00", 30).await;

    state
        .store
        .transition_appointment(booked.id, AppointmentStatus::Confirmed, AppointmentStatus::Cancelled)
        .await
        .unwrap();

    let result = AvailabilityService::new(&state)
        .get_available_slots_on(doctor_id, day(), None, today())
        .await
        .unwrap();
    assert!(result.slots.contains(&t("10:00")));
}

#[tokio::test]
async fn empty_results_carry_a_reason() {
    let state = TestConfig::default().to_state();
    let availability = AvailabilityService::new(&state);

    let unconfigured = availability
        .get_available_slots_on(Uuid::new_v4(), day(), None, today())
        .await
        .unwrap();
    assert_eq!(unconfigured.reason, Some(UnavailableReason::NotConfigured));
    assert!(unconfigured.slots.is_empty());

    let doctor_id = configured_doctor(&state, 30, 0).await;
    let yesterday = today().pred_opt().unwrap();
    let elapsed = availability
        .get_available_slots_on(doctor_id, yesterday, None, today())
        .await
        .unwrap();
    assert_eq!(elapsed.reason, Some(UnavailableReason::DateElapsed));

    BlockRegistry::new(&state)
        .block(
            doctor_id,
            BlockRequest {
                date: day(),
                time: None,
                end_time: None,
                whole_day: true,
                reason: "Conference".to_string(),
            },
        )
        .await
        .unwrap();
    let blocked = availability
        .get_available_slots_on(doctor_id, day(), None, today())
        .await
        .unwrap();
    assert_eq!(blocked.reason, Some(UnavailableReason::FullyBlocked));
    assert!(blocked.slots.is_empty());
    assert_eq!(blocked.total_candidates, 16);
}

#[tokio::test]
async fn today_is_still_bookable() {
    let state = TestConfig::default().to_state();
    let doctor_id = configured_doctor(&state, 60, 0).await;

    let result = AvailabilityService::new(&state)
        .get_available_slots_on(doctor_id, day(), None, day())
        .await
        .unwrap();
    assert_eq!(result.slots.len(), 8);
}

#[tokio::test]
async fn treatment_duration_drives_slot_length() {
    let state = TestConfig::default().to_state();
    let doctor_id = configured_doctor(&state, 30, 0).await;
    state
        .store
        .upsert_treatment(Treatment::new("Cleaning", 80.0, Some(60)))
        .await
        .unwrap();
    book(&state, doctor_id, "10:00", 30).await;

    let result = AvailabilityService::new(&state)
        .get_available_slots_on(doctor_id, day(), Some("cleaning"), today())
        .await
        .unwrap();

    assert_eq!(result.slot_duration_min, Some(60));
    // 16:30 would run past 17:00, 09:30 and 10:00 would hit the booking
    assert_eq!(result.total_candidates, 15);
    assert!(!result.slots.contains(&t("09:30")));
    assert!(!result.slots.contains(&t("10:00")));
    assert!(result.slots.contains(&t("10:30")));

    assert_matches!(
        AvailabilityService::new(&state)
            .get_available_slots_on(doctor_id, day(), Some("Laser"), today())
            .await,
        Err(ClinicError::NotFound(_))
    );
}

#[tokio::test]
async fn schedule_changes_do_not_move_existing_bookings() {
    let state: Arc<AppState> = TestConfig::default().to_state();
    let doctor_id = configured_doctor(&state, 30, 0).await;
    let booked = book(&state, doctor_id, "09:00", 30).await;

    ScheduleService::new(&state)
        .upsert_config(
            doctor_id,
            UpsertScheduleRequest {
                work_start: t("08:00"),
                work_end: t("12:00"),
                slot_duration_min: 45,
                break_duration_min: 0,
            },
        )
        .await
        .unwrap();

    let stored = state.store.get_appointment(booked.id).await.unwrap().unwrap();
    assert_eq!(stored.start_time, t("09:00"));
    assert_eq!(stored.end_time, t("09:30"));

    // 08:45-09:30 overlaps the kept booking
    let result = AvailabilityService::new(&state)
        .get_available_slots_on(doctor_id, day(), None, today())
        .await
        .unwrap();
    assert!(!result.slots.contains(&t("08:45")));
    assert!(result.slots.contains(&t("08:00")));
}
