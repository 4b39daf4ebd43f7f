//! API route configuration.

use std::sync::Arc;

use axum::{middleware, routing::get, routing::post, Router};

use crate::handlers;
use crate::rate_limit::rate_limit;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Collection
        .route("/:table/count", get(handlers::count_records))
        .route("/:table/batch", post(handlers::create_records))
        .route(
            "/:table",
            get(handlers::list_records).post(handlers::create_record),
        )

        // Single record
        .route(
            "/:table/:id",
            get(handlers::get_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )

        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .with_state(state)
}
