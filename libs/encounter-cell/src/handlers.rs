// libs/encounter-cell/src/handlers.rs
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use uuid::Uuid;

use shared_config::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AddClinicalNoteRequest, AddDiagnosisRequest, ClinicalNote, CreateEncounterRequest, Diagnosis,
    Encounter, EncounterSearchQuery, RecordVitalSignsRequest, UpdateEncounterStatusRequest,
    VitalSign,
};
use crate::services::EncounterService;

fn actor_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid user ID in token".to_string()))
}

pub async fn create_encounter(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateEncounterRequest>,
) -> Result<(StatusCode, Json<Encounter>), AppError> {
    let created_by = actor_id(&user)?;
    let service = EncounterService::new(state);

    let encounter = service
        .create_encounter(request, created_by, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(encounter)))
}

pub async fn get_encounter(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(encounter_id): Path<Uuid>,
) -> Result<Json<Encounter>, AppError> {
    let service = EncounterService::new(state);
    let encounter = service.get_encounter(encounter_id, auth.token()).await?;
    Ok(Json(encounter))
}

pub async fn list_encounters(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<EncounterSearchQuery>,
) -> Result<Json<Vec<Encounter>>, AppError> {
    let service = EncounterService::new(state);
    let encounters = service.list_encounters(&query, auth.token()).await?;
    Ok(Json(encounters))
}

pub async fn update_encounter_status(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(encounter_id): Path<Uuid>,
    Json(request): Json<UpdateEncounterStatusRequest>,
) -> Result<Json<Encounter>, AppError> {
    let updated_by = actor_id(&user)?;
    let service = EncounterService::new(state);

    let encounter = service
        .update_status(encounter_id, request, updated_by, auth.token())
        .await?;

    Ok(Json(encounter))
}

pub async fn add_clinical_note(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(encounter_id): Path<Uuid>,
    Json(request): Json<AddClinicalNoteRequest>,
) -> Result<(StatusCode, Json<ClinicalNote>), AppError> {
    let author_id = actor_id(&user)?;
    let service = EncounterService::new(state);

    let note = service
        .add_clinical_note(encounter_id, request, author_id, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn add_diagnosis(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(encounter_id): Path<Uuid>,
    Json(request): Json<AddDiagnosisRequest>,
) -> Result<(StatusCode, Json<Diagnosis>), AppError> {
    let diagnosed_by = actor_id(&user)?;
    let service = EncounterService::new(state);

    let diagnosis = service
        .add_diagnosis(encounter_id, request, diagnosed_by, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(diagnosis)))
}

pub async fn record_vital_signs(
    State(state): State<Arc<AppState>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(encounter_id): Path<Uuid>,
    Json(request): Json<RecordVitalSignsRequest>,
) -> Result<(StatusCode, Json<VitalSign>), AppError> {
    let recorded_by = actor_id(&user)?;
    let service = EncounterService::new(state);

    let vitals = service
        .record_vital_signs(encounter_id, request, recorded_by, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(vitals)))
}
