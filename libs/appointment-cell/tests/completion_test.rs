use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use appointment_cell::models::NewBooking;
use appointment_cell::services::{AppointmentBookingService, AppointmentCompletionService};
use scheduling_cell::models::UpsertScheduleRequest;
use scheduling_cell::services::ScheduleService;
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::billing::InvoiceStatus;
use shared_models::error::ClinicError;
use shared_models::inventory::{InventoryItem, Treatment, TreatmentRecipe};
use shared_models::time::SlotTime;
use shared_utils::test_utils::TestConfig;
use shared_utils::AppState;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 5, 1).unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 5, 6).unwrap()
}

/// A started appointment for `treatment`, whose recipe uses `gloves` pairs.
async fn started_appointment(state: &AppState, treatment: &str, gloves: Option<(i32, i32)>) -> (Appointment, Option<Uuid>) {
    let doctor_id = Uuid::new_v4();
    ScheduleService::new(state)
        .upsert_config(
            doctor_id,
            UpsertScheduleRequest {
                work_start: SlotTime::parse("09:00").unwrap(),
                work_end: SlotTime::parse("17:00").unwrap(),
                slot_duration_min: 30,
                break_duration_min: 0,
            },
        )
        .await
        .unwrap();
    let treatment = state
        .store
        .upsert_treatment(Treatment::new(treatment, 120.0, None))
        .await
        .unwrap();

    let item_id = match gloves {
        Some((stock, required)) => {
            let item = state
                .store
                .insert_item(InventoryItem::new("Gloves", stock, "pair", 2))
                .await
                .unwrap();
            state
                .store
                .upsert_recipe_line(TreatmentRecipe {
                    treatment_id: treatment.id,
                    item_id: item.id,
                    qty_required: required,
                })
                .await
                .unwrap();
            Some(item.id)
        }
        None => None,
    };

    let booking = AppointmentBookingService::new(state);
    let appointment = booking
        .book_on(
            NewBooking {
                doctor_id,
                patient_id: Uuid::new_v4(),
                date: day(),
                time: SlotTime::parse("09:00").unwrap(),
                treatment: treatment.name.clone(),
            },
            today(),
        )
        .await
        .unwrap();
    let appointment = booking.start(appointment.id).await.unwrap();
    (appointment, item_id)
}

async fn quantity(state: &AppState, item_id: Uuid) -> i32 {
    state.store.get_item(item_id).await.unwrap().unwrap().quantity
}

#[tokio::test]
async fn completion_deducts_and_invoices_together() {
    let state = TestConfig::default().to_state();
    let (appointment, gloves) = started_appointment(&state, "Extraction", Some((10, 4))).await;
    let gloves = gloves.unwrap();

    let outcome = AppointmentCompletionService::new(&state)
        .complete_on(appointment.id, day())
        .await
        .unwrap();

    assert!(!outcome.already_completed);
    assert_eq!(outcome.appointment.status, AppointmentStatus::Completed);
    assert_eq!(outcome.invoice.amount, 120.0);
    assert_eq!(outcome.invoice.status, InvoiceStatus::Pending);
    assert_eq!(outcome.invoice.date, day());
    assert_eq!(outcome.deducted.len(), 1);
    assert_eq!(outcome.deducted[0].quantity, 4);
    assert_eq!(quantity(&state, gloves).await, 6);
}

#[tokio::test]
async fn retrying_completion_does_not_deduct_twice() {
    let state = TestConfig::default().to_state();
    let (appointment, gloves) = started_appointment(&state, "Extraction", Some((10, 4))).await;
    let service = AppointmentCompletionService::new(&state);

    let first = service.complete_on(appointment.id, day()).await.unwrap();
    let second = service.complete_on(appointment.id, day()).await.unwrap();

    assert!(second.already_completed);
    assert!(second.deducted.is_empty());
    assert_eq!(second.invoice.id, first.invoice.id);
    assert_eq!(quantity(&state, gloves.unwrap()).await, 6);
}

#[tokio::test]
async fn short_stock_leaves_everything_as_it_was() {
    let state = TestConfig::default().to_state();
    let (appointment, gloves) = started_appointment(&state, "Extraction", Some((5, 6))).await;

    let result = AppointmentCompletionService::new(&state)
        .complete_on(appointment.id, day())
        .await;
    assert_matches!(
        result,
        Err(ClinicError::InsufficientStock { item, required: 6, available: 5 }) if item == "Gloves"
    );

    assert_eq!(quantity(&state, gloves.unwrap()).await, 5);
    let current = state.store.get_appointment(appointment.id).await.unwrap().unwrap();
    assert_eq!(current.status, AppointmentStatus::InProgress);
    assert!(state
        .store
        .find_invoice_for_appointment(appointment.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn treatments_without_a_recipe_are_still_invoiced() {
    let state = TestConfig::default().to_state();
    let (appointment, _) = started_appointment(&state, "Consultation", None).await;

    let outcome = AppointmentCompletionService::new(&state)
        .complete_on(appointment.id, day())
        .await
        .unwrap();
    assert!(outcome.deducted.is_empty());
    assert_eq!(outcome.invoice.amount, 120.0);
    assert_eq!(outcome.invoice.treatment_name, "Consultation");
}

#[tokio::test]
async fn only_started_appointments_complete() {
    let state = TestConfig::default().to_state();
    let (appointment, _) = started_appointment(&state, "Consultation", None).await;
    let booking = AppointmentBookingService::new(&state);
    booking.cancel(appointment.id).await.unwrap();

    assert_matches!(
        AppointmentCompletionService::new(&state).complete_on(appointment.id, day()).await,
        Err(ClinicError::StateTransition {
            from: AppointmentStatus::Cancelled,
            to: AppointmentStatus::Completed
        })
    );
    assert_matches!(
        AppointmentCompletionService::new(&state).complete(Uuid::new_v4()).await,
        Err(ClinicError::NotFound(_))
    );
}
