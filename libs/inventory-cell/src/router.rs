use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn inventory_routes(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        // Stock
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route("/items/{item_id}", get(handlers::get_item))
        .route("/items/{item_id}/adjust", post(handlers::adjust_item))
        .route("/low-stock", get(handlers::low_stock_items))
        .route("/import", post(handlers::import_inventory))

        // Treatment catalogue and recipes
        .route("/treatments", get(handlers::list_treatments).post(handlers::upsert_treatment))
        .route("/treatments/{treatment_id}", get(handlers::get_treatment))
        .route("/treatments/{treatment_id}/cost", put(handlers::update_treatment_cost))
        .route("/treatments/{treatment_id}/recipe", get(handlers::get_recipe))
        .route(
            "/treatments/{treatment_id}/recipe/{item_id}",
            put(handlers::link_recipe_item).delete(handlers::unlink_recipe_item),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
