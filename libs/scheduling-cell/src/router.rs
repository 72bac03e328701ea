use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppState>) -> Router {
    // Slot listings are read by the booking UI before sign-in
    let public_routes = Router::new()
        .route("/doctors/{doctor_id}/slots", get(handlers::get_available_slots));

    let protected_routes = Router::new()
        .route("/doctors/{doctor_id}/schedule", get(handlers::get_schedule))
        .route("/doctors/{doctor_id}/schedule", put(handlers::upsert_schedule))
        .route("/doctors/{doctor_id}/blocks", post(handlers::create_block))
        .route("/doctors/{doctor_id}/blocks", get(handlers::list_blocks))
        .route("/doctors/{doctor_id}/blocks/{block_id}", delete(handlers::delete_block))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
