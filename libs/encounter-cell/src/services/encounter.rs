// libs/encounter-cell/src/services/encounter.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use directory_cell::services::DirectoryService;
use shared_config::AppState;
use shared_database::supabase::SupabaseClient;
use shared_events::DomainEvent;
use shared_models::base::AuditFields;

use crate::models::{
    AddClinicalNoteRequest, AddDiagnosisRequest, ClinicalNote, CreateEncounterRequest, Diagnosis,
    Encounter, EncounterError, EncounterSearchQuery, EncounterStatus, RecordVitalSignsRequest,
    UpdateEncounterStatusRequest, VitalSign,
};
use crate::services::lifecycle::EncounterLifecycleService;

fn generate_encounter_number() -> String {
    format!("ENC{:09}", Utc::now().timestamp_micros() % 1_000_000_000)
}

/// Body mass index from height in centimeters and weight in kilograms,
/// rounded to one decimal. Absent or non-positive height yields no BMI.
pub fn compute_bmi(height_cm: Option<f64>, weight_kg: Option<f64>) -> Option<f64> {
    match (height_cm, weight_kg) {
        (Some(height), Some(weight)) if height > 0.0 => {
            let meters = height / 100.0;
            let bmi = weight / (meters * meters);
            Some((bmi * 10.0).round() / 10.0)
        }
        _ => None,
    }
}

/// Encounter lifecycle and clinical documentation. Child records are
/// append-only; corrections land as new records.
pub struct EncounterService {
    supabase: Arc<SupabaseClient>,
    directory: DirectoryService,
    lifecycle: EncounterLifecycleService,
    state: Arc<AppState>,
}

impl EncounterService {
    pub fn new(state: Arc<AppState>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&state.config));
        Self {
            directory: DirectoryService::new(supabase.clone()),
            lifecycle: EncounterLifecycleService::new(),
            supabase,
            state,
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn create_encounter(
        &self,
        request: CreateEncounterRequest,
        created_by: Uuid,
        auth_token: &str,
    ) -> Result<Encounter, EncounterError> {
        let status = request.status.unwrap_or(EncounterStatus::Scheduled);
        if !matches!(
            status,
            EncounterStatus::Scheduled | EncounterStatus::InProgress
        ) {
            return Err(EncounterError::ValidationError(format!(
                "Encounters cannot be created in status {}",
                status
            )));
        }

        self.directory
            .lookup_patient(request.patient_id, auth_token)
            .await?;
        self.directory
            .lookup_provider(request.provider_id, auth_token)
            .await?;

        let audit = AuditFields::on_create(created_by);
        let body = json!({
            "encounter_number": generate_encounter_number(),
            "patient_id": request.patient_id,
            "provider_id": request.provider_id,
            "encounter_type": request.encounter_type,
            "status": status,
            "priority": request.priority,
            "department": request.department,
            "location": request.location,
            "admission_date": request.admission_date.unwrap_or_else(Utc::now),
            "chief_complaint": request.chief_complaint,
            "reason_for_visit": request.reason_for_visit,
            "created_at": audit.created_at,
            "updated_at": audit.updated_at,
            "created_by": audit.created_by,
            "updated_by": audit.updated_by,
        });

        let rows: Vec<Encounter> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/encounters",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let encounter = rows.into_iter().next().ok_or_else(|| {
            EncounterError::DatabaseError("Insert returned no encounter row".to_string())
        })?;

        info!(
            "Created encounter {} for patient {}",
            encounter.encounter_number, encounter.patient_id
        );

        self.state
            .events
            .publish(DomainEvent::EncounterCreated {
                encounter_id: encounter.id,
                encounter_number: encounter.encounter_number.clone(),
                patient_id: encounter.patient_id,
                provider_id: encounter.provider_id,
                created_by,
            })
            .await;

        Ok(encounter)
    }

    pub async fn get_encounter(
        &self,
        encounter_id: Uuid,
        auth_token: &str,
    ) -> Result<Encounter, EncounterError> {
        let path = format!("/rest/v1/encounters?id=eq.{}", encounter_id);
        let rows: Vec<Encounter> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(EncounterError::EncounterNotFound(encounter_id))
    }

    pub async fn list_encounters(
        &self,
        query: &EncounterSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Encounter>, EncounterError> {
        let mut path = String::from("/rest/v1/encounters?order=admission_date.desc");

        if let Some(patient_id) = query.patient_id {
            path.push_str(&format!("&patient_id=eq.{}", patient_id));
        }
        if let Some(provider_id) = query.provider_id {
            path.push_str(&format!("&provider_id=eq.{}", provider_id));
        }
        if let Some(status) = query.status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        path.push_str(&format!("&limit={}", query.limit.unwrap_or(50)));
        path.push_str(&format!("&offset={}", query.offset.unwrap_or(0)));

        debug!("Listing encounters: {}", path);

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))
    }

    /// Move an encounter through its state machine. Completion stamps
    /// the discharge date in the same write.
    pub async fn update_status(
        &self,
        encounter_id: Uuid,
        request: UpdateEncounterStatusRequest,
        updated_by: Uuid,
        auth_token: &str,
    ) -> Result<Encounter, EncounterError> {
        let current = self.get_encounter(encounter_id, auth_token).await?;
        self.lifecycle
            .validate_transition(current.status, request.status)?;

        let mut body = json!({
            "status": request.status,
            "updated_at": Utc::now(),
            "updated_by": updated_by,
        });
        if request.status == EncounterStatus::Completed {
            body["discharge_date"] = json!(Utc::now());
        }

        let path = format!("/rest/v1/encounters?id=eq.{}", encounter_id);
        let rows: Vec<Encounter> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let encounter = rows
            .into_iter()
            .next()
            .ok_or(EncounterError::EncounterNotFound(encounter_id))?;

        info!(
            "Encounter {} moved from {} to {}",
            encounter.encounter_number, current.status, encounter.status
        );

        self.state
            .events
            .publish(DomainEvent::EncounterStatusChanged {
                encounter_id: encounter.id,
                status: encounter.status.to_string(),
                updated_by,
            })
            .await;

        Ok(encounter)
    }

    pub async fn add_clinical_note(
        &self,
        encounter_id: Uuid,
        request: AddClinicalNoteRequest,
        author_id: Uuid,
        auth_token: &str,
    ) -> Result<ClinicalNote, EncounterError> {
        self.get_encounter(encounter_id, auth_token).await?;
        self.directory.lookup_provider(author_id, auth_token).await?;

        let audit = AuditFields::on_create(author_id);
        let body = json!({
            "encounter_id": encounter_id,
            "author_id": author_id,
            "note_type": request.note_type,
            "subjective": request.subjective,
            "objective": request.objective,
            "assessment": request.assessment,
            "plan": request.plan,
            "created_at": audit.created_at,
            "updated_at": audit.updated_at,
            "created_by": audit.created_by,
            "updated_by": audit.updated_by,
        });

        let rows: Vec<ClinicalNote> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/clinical_notes",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or_else(|| {
            EncounterError::DatabaseError("Insert returned no note row".to_string())
        })
    }

    pub async fn add_diagnosis(
        &self,
        encounter_id: Uuid,
        request: AddDiagnosisRequest,
        diagnosed_by: Uuid,
        auth_token: &str,
    ) -> Result<Diagnosis, EncounterError> {
        if request.diagnosis_code.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Diagnosis code is required".to_string(),
            ));
        }

        let encounter = self.get_encounter(encounter_id, auth_token).await?;

        let audit = AuditFields::on_create(diagnosed_by);
        let body = json!({
            "encounter_id": encounter_id,
            "patient_id": encounter.patient_id,
            "diagnosis_code": request.diagnosis_code,
            "description": request.description,
            "diagnosis_type": request.diagnosis_type,
            "diagnosed_by": diagnosed_by,
            "diagnosed_at": Utc::now(),
            "created_at": audit.created_at,
            "updated_at": audit.updated_at,
            "created_by": audit.created_by,
            "updated_by": audit.updated_by,
        });

        let rows: Vec<Diagnosis> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/diagnoses",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or_else(|| {
            EncounterError::DatabaseError("Insert returned no diagnosis row".to_string())
        })
    }

    pub async fn record_vital_signs(
        &self,
        encounter_id: Uuid,
        request: RecordVitalSignsRequest,
        recorded_by: Uuid,
        auth_token: &str,
    ) -> Result<VitalSign, EncounterError> {
        let encounter = self.get_encounter(encounter_id, auth_token).await?;

        let audit = AuditFields::on_create(recorded_by);
        let body = json!({
            "encounter_id": encounter_id,
            "patient_id": encounter.patient_id,
            "recorded_by": recorded_by,
            "measured_at": Utc::now(),
            "temperature": request.temperature,
            "heart_rate": request.heart_rate,
            "respiratory_rate": request.respiratory_rate,
            "systolic_bp": request.systolic_bp,
            "diastolic_bp": request.diastolic_bp,
            "oxygen_saturation": request.oxygen_saturation,
            "height": request.height,
            "weight": request.weight,
            "bmi": compute_bmi(request.height, request.weight),
            "created_at": audit.created_at,
            "updated_at": audit.updated_at,
            "created_by": audit.created_by,
            "updated_by": audit.updated_by,
        });

        let rows: Vec<VitalSign> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/vital_signs",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or_else(|| {
            EncounterError::DatabaseError("Insert returned no vitals row".to_string())
        })
    }
}
