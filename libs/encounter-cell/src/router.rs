// libs/encounter-cell/src/router.rs
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;

use shared_config::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Encounter and clinical documentation routes. Everything requires a
/// valid token.
pub fn encounter_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            post(handlers::create_encounter).get(handlers::list_encounters),
        )
        .route("/{encounter_id}", get(handlers::get_encounter))
        .route(
            "/{encounter_id}/status",
            patch(handlers::update_encounter_status),
        )
        .route("/{encounter_id}/notes", post(handlers::add_clinical_note))
        .route("/{encounter_id}/diagnoses", post(handlers::add_diagnosis))
        .route("/{encounter_id}/vitals", post(handlers::record_vital_signs))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
}
