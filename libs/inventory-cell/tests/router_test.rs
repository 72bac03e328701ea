use axum::body::{to_bytes, Body};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use inventory_cell::router::inventory_routes;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, bearer: &str, body: Body, content_type: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", bearer)
        .header("content-type", content_type)
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn staff_import_then_link_recipe_over_http() {
    let config = TestConfig::default();
    let state = config.to_state();
    let staff = JwtTestUtils::bearer(&TestUser::staff("stock@clinic.test"), &config);

    let response = inventory_routes(state.clone())
        .oneshot(request(
            "POST",
            "/import",
            &staff,
            Body::from("Gloves,10,pair,2\nSwabs,5\n"),
            "text/csv",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["created"], 2);
    assert_eq!(summary["rejected"], json!([]));

    let items = body_json(
        inventory_routes(state.clone())
            .oneshot(request("GET", "/items", &staff, Body::empty(), "application/json"))
            .await
            .unwrap(),
    )
    .await;
    let gloves_id = items["items"][0]["id"].as_str().unwrap().to_string();

    let treatment = body_json(
        inventory_routes(state.clone())
            .oneshot(request(
                "POST",
                "/treatments",
                &staff,
                Body::from(json!({ "name": "Suture", "cost": 75.0 }).to_string()),
                "application/json",
            ))
            .await
            .unwrap(),
    )
    .await;
    let treatment_id = treatment["treatment"]["id"].as_str().unwrap().to_string();

    let link = inventory_routes(state.clone())
        .oneshot(request(
            "PUT",
            &format!("/treatments/{}/recipe/{}", treatment_id, gloves_id),
            &staff,
            Body::from(json!({ "qty_required": 2 }).to_string()),
            "application/json",
        ))
        .await
        .unwrap();
    assert_eq!(link.status(), StatusCode::OK);

    let recipe = body_json(
        inventory_routes(state)
            .oneshot(request(
                "GET",
                &format!("/treatments/{}/recipe", treatment_id),
                &staff,
                Body::empty(),
                "application/json",
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(recipe["recipe"][0]["item_name"], "Gloves");
    assert_eq!(recipe["recipe"][0]["qty_required"], 2);
}

#[tokio::test]
async fn patients_cannot_touch_stock() {
    let config = TestConfig::default();
    let patient = JwtTestUtils::bearer(&TestUser::patient("p@clinic.test"), &config);

    let response = inventory_routes(config.to_state())
        .oneshot(request("POST", "/import", &patient, Body::from("Gloves,10\n"), "text/csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn over_deduction_reports_the_item() {
    let config = TestConfig::default();
    let state = config.to_state();
    let staff = JwtTestUtils::bearer(&TestUser::admin("admin@clinic.test"), &config);

    let created = body_json(
        inventory_routes(state.clone())
            .oneshot(request(
                "POST",
                "/items",
                &staff,
                Body::from(json!({ "name": "Gloves", "quantity": 5 }).to_string()),
                "application/json",
            ))
            .await
            .unwrap(),
    )
    .await;
    let id = created["item"]["id"].as_str().unwrap().to_string();

    let response = inventory_routes(state)
        .oneshot(request(
            "POST",
            &format!("/items/{}/adjust", id),
            &staff,
            Body::from(json!({ "delta": -6 }).to_string()),
            "application/json",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["details"]["kind"], "insufficient_stock");
    assert_eq!(body["details"]["detail"]["item"], "Gloves");
    assert_eq!(body["details"]["detail"]["available"], 5);
}
