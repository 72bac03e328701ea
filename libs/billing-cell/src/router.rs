use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn billing_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/invoices/{invoice_id}", get(handlers::get_invoice))
        .route("/invoices/{invoice_id}/detail", get(handlers::get_invoice_detail))
        .route("/invoices/{invoice_id}/pay", post(handlers::mark_invoice_paid))
        .route("/appointments/{appointment_id}/invoice", get(handlers::get_appointment_invoice))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
