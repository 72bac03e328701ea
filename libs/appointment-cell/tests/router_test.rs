use std::sync::Arc;

use axum::body::{to_bytes, Body};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::router::appointment_routes;
use scheduling_cell::models::UpsertScheduleRequest;
use scheduling_cell::services::ScheduleService;
use shared_models::inventory::{InventoryItem, Treatment, TreatmentRecipe};
use shared_models::time::SlotTime;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use shared_utils::AppState;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, bearer: String, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Authorization", bearer)
        .header("content-type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn configure(state: &Arc<AppState>, doctor: &TestUser, gloves: i32) {
    ScheduleService::new(state)
        .upsert_config(
            doctor.uuid(),
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
        .upsert_treatment(Treatment::new("Filling", 75.0, None))
        .await
        .unwrap();
    let item = state
        .store
        .insert_item(InventoryItem::new("Gloves", gloves, "pair", 0))
        .await
        .unwrap();
    state
        .store
        .upsert_recipe_line(TreatmentRecipe {
            treatment_id: treatment.id,
            item_id: item.id,
            qty_required: 6,
        })
        .await
        .unwrap();
}

fn booking_body(doctor: &TestUser) -> Value {
    json!({
        "doctor_id": doctor.id,
        "date": "2099-03-02",
        "time": "9:30",
        "treatment": "Filling"
    })
}

#[tokio::test]
async fn patient_books_and_doctor_completes() {
    let config = TestConfig::default();
    let state = config.to_state();
    let doctor = TestUser::doctor("doc@clinic.test");
    let patient = TestUser::patient("pat@clinic.test");
    configure(&state, &doctor, 10).await;

    let response = appointment_routes(state.clone())
        .oneshot(post("/", JwtTestUtils::bearer(&patient, &config), Some(booking_body(&doctor))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["appointment"]["start_time"], "09:30");
    assert_eq!(body["appointment"]["patient_id"], patient.id.as_str());
    assert_eq!(body["appointment"]["status"], "confirmed");
    let id = body["appointment"]["id"].as_str().unwrap().to_string();

    let doctor_bearer = JwtTestUtils::bearer(&doctor, &config);
    let response = appointment_routes(state.clone())
        .oneshot(post(&format!("/{}/start", id), doctor_bearer.clone(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = appointment_routes(state.clone())
        .oneshot(post(&format!("/{}/complete", id), doctor_bearer.clone(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["appointment"]["status"], "completed");
    assert_eq!(body["invoice"]["amount"], 75.0);
    assert_eq!(body["deducted"][0]["quantity"], 6);

    let response = appointment_routes(state)
        .oneshot(
            Request::builder()
                .uri(format!("/doctors/{}?date=2099-03-02", doctor.id))
                .header("Authorization", doctor_bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["total"], 1);
}

#[tokio::test]
async fn short_stock_is_a_conflict_naming_the_item() {
    let config = TestConfig::default();
    let state = config.to_state();
    let doctor = TestUser::doctor("doc@clinic.test");
    let patient = TestUser::patient("pat@clinic.test");
    configure(&state, &doctor, 5).await;

    let response = appointment_routes(state.clone())
        .oneshot(post("/", JwtTestUtils::bearer(&patient, &config), Some(booking_body(&doctor))))
        .await
        .unwrap();
    let id = body_json(response).await["appointment"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let doctor_bearer = JwtTestUtils::bearer(&doctor, &config);
    appointment_routes(state.clone())
        .oneshot(post(&format!("/{}/start", id), doctor_bearer.clone(), None))
        .await
        .unwrap();

    let response = appointment_routes(state)
        .oneshot(post(&format!("/{}/complete", id), doctor_bearer, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["details"]["kind"], "insufficient_stock");
    assert_eq!(body["details"]["detail"]["item"], "Gloves");
    assert_eq!(body["details"]["detail"]["available"], 5);
}

#[tokio::test]
async fn patients_book_only_for_themselves() {
    let config = TestConfig::default();
    let state = config.to_state();
    let doctor = TestUser::doctor("doc@clinic.test");
    let patient = TestUser::patient("pat@clinic.test");
    configure(&state, &doctor, 10).await;

    let mut body = booking_body(&doctor);
    body["patient_id"] = json!(Uuid::new_v4());
    let response = appointment_routes(state.clone())
        .oneshot(post("/", JwtTestUtils::bearer(&patient, &config), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = appointment_routes(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(booking_body(&doctor).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_the_treating_doctor_starts() {
    let config = TestConfig::default();
    let state = config.to_state();
    let doctor = TestUser::doctor("doc@clinic.test");
    let patient = TestUser::patient("pat@clinic.test");
    configure(&state, &doctor, 10).await;

    let response = appointment_routes(state.clone())
        .oneshot(post("/", JwtTestUtils::bearer(&patient, &config), Some(booking_body(&doctor))))
        .await
        .unwrap();
    let id = body_json(response).await["appointment"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let other = TestUser::doctor("other@clinic.test");
    let response = appointment_routes(state.clone())
        .oneshot(post(&format!("/{}/start", id), JwtTestUtils::bearer(&other, &config), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A second booking of the same slot loses.
    let response = appointment_routes(state)
        .oneshot(post("/", JwtTestUtils::bearer(&doctor, &config), Some({
            let mut body = booking_body(&doctor);
            body["patient_id"] = json!(Uuid::new_v4());
            body
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["details"]["kind"], "conflict");
}
