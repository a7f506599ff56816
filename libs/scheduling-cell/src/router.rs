// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use shared_config::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Appointment scheduling routes. Everything requires a valid token.
pub fn scheduling_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            post(handlers::create_appointment).get(handlers::search_appointments),
        )
        .route(
            "/{appointment_id}",
            get(handlers::get_appointment).put(handlers::update_appointment),
        )
        .route(
            "/{appointment_id}/cancel",
            post(handlers::cancel_appointment),
        )
        .route(
            "/{appointment_id}/check-in",
            post(handlers::check_in_appointment),
        )
        .route(
            "/providers/{provider_id}/availability",
            get(handlers::get_provider_availability),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
