use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use billing_cell::router::billing_routes;
use inventory_cell::router::inventory_routes;
use scheduling_cell::router::scheduling_routes;
use shared_utils::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic engine API is running!" }))
        .nest("/scheduling", scheduling_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/inventory", inventory_routes(state.clone()))
        .nest("/billing", billing_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use http::{Request, StatusCode};
    use serde_json::Value;
    use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_reports_liveness() {
        let response = create_router(TestConfig::default().to_state())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cells_are_mounted_under_their_prefixes() {
        let config = TestConfig::default();
        let app = create_router(config.to_state());
        let doctor = TestUser::doctor("doc@clinic.test");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/scheduling/doctors/{}/slots?date=2099-01-05", doctor.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["reason"], "not configured");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/inventory/items")
                    .header("Authorization", JwtTestUtils::bearer(&doctor, &config))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/billing/invoices/{}", doctor.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
