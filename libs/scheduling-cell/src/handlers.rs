// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared_config::AppState;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AppointmentSearchQuery, CancelAppointmentRequest, CreateAppointmentRequest,
    TimeSlot, UpdateAppointmentRequest,
};
use crate::services::{AppointmentBookingService, AvailabilityService};

fn actor_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid user ID in token".to_string()))
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let created_by = actor_id(&user)?;
    let service = AppointmentBookingService::new(state);

    let appointment = service
        .create_appointment(request, created_by, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let service = AppointmentBookingService::new(state);
    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await?;
    Ok(Json(appointment))
}

pub async fn search_appointments(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let service = AppointmentBookingService::new(state);
    let appointments = service.search_appointments(&query, auth.token()).await?;
    Ok(Json(appointments))
}

pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let updated_by = actor_id(&user)?;
    let service = AppointmentBookingService::new(state);

    let appointment = service
        .update_appointment(appointment_id, request, updated_by, auth.token())
        .await?;

    Ok(Json(appointment))
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let cancelled_by = actor_id(&user)?;
    let service = AppointmentBookingService::new(state);

    let appointment = service
        .cancel_appointment(appointment_id, request.reason, cancelled_by, auth.token())
        .await?;

    Ok(Json(appointment))
}

pub async fn check_in_appointment(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let checked_in_by = actor_id(&user)?;
    let service = AppointmentBookingService::new(state);

    let appointment = service
        .check_in_appointment(appointment_id, checked_in_by, auth.token())
        .await?;

    Ok(Json(appointment))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

pub async fn get_provider_availability(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let supabase = Arc::new(SupabaseClient::new(&state.config));
    let service = AvailabilityService::new(supabase, state.config.scheduling.clone());

    let slots = service
        .get_provider_availability(provider_id, query.date, auth.token())
        .await?;

    Ok(Json(slots))
}
