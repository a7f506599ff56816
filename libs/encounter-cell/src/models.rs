// libs/encounter-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use directory_cell::models::DirectoryError;
use shared_models::base::AuditFields;
use shared_models::error::AppError;

// ==============================================================================
// CORE ENCOUNTER MODELS
// ==============================================================================

/// A clinical visit. Child records (notes, diagnoses, vitals) hang off
/// the encounter and are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub id: Uuid,
    pub encounter_number: String,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub encounter_type: EncounterType,
    pub status: EncounterStatus,
    pub priority: EncounterPriority,
    pub department: Option<String>,
    pub location: Option<String>,
    pub admission_date: DateTime<Utc>,
    /// Set exactly once, when the encounter completes.
    pub discharge_date: Option<DateTime<Utc>>,
    pub chief_complaint: Option<String>,
    pub reason_for_visit: Option<String>,
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl EncounterStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EncounterStatus::Completed | EncounterStatus::Cancelled)
    }
}

impl fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncounterStatus::Scheduled => write!(f, "scheduled"),
            EncounterStatus::InProgress => write!(f, "in_progress"),
            EncounterStatus::Completed => write!(f, "completed"),
            EncounterStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EncounterType {
    Outpatient,
    Inpatient,
    Emergency,
    Wellness,
    Telehealth,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EncounterPriority {
    Routine,
    Urgent,
    Emergent,
}

impl Default for EncounterPriority {
    fn default() -> Self {
        EncounterPriority::Routine
    }
}

// ==============================================================================
// CHILD RECORDS
// ==============================================================================

/// SOAP-structured documentation attached to an encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub author_id: Uuid,
    pub note_type: NoteType,
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Progress,
    Admission,
    Discharge,
    Consultation,
    Procedure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub patient_id: Uuid,
    /// ICD-10 code as entered; no code-system validation here.
    pub diagnosis_code: String,
    pub description: String,
    pub diagnosis_type: DiagnosisType,
    pub diagnosed_by: Uuid,
    pub diagnosed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisType {
    Primary,
    Secondary,
    Differential,
    RuleOut,
}

/// A point-in-time vitals panel. Every measurement is optional; BMI is
/// derived server-side and never accepted from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSign {
    pub id: Uuid,
    pub encounter_id: Uuid,
    pub patient_id: Uuid,
    pub recorded_by: Uuid,
    pub measured_at: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub heart_rate: Option<i32>,
    pub respiratory_rate: Option<i32>,
    pub systolic_bp: Option<i32>,
    pub diastolic_bp: Option<i32>,
    pub oxygen_saturation: Option<f64>,
    /// Centimeters.
    pub height: Option<f64>,
    /// Kilograms.
    pub weight: Option<f64>,
    pub bmi: Option<f64>,
    #[serde(flatten)]
    pub audit: AuditFields,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEncounterRequest {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub encounter_type: EncounterType,
    #[serde(default)]
    pub priority: EncounterPriority,
    pub department: Option<String>,
    pub location: Option<String>,
    /// Defaults to now when omitted.
    pub admission_date: Option<DateTime<Utc>>,
    pub chief_complaint: Option<String>,
    pub reason_for_visit: Option<String>,
    /// Only scheduled or in_progress are accepted as starting points.
    pub status: Option<EncounterStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEncounterStatusRequest {
    pub status: EncounterStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddClinicalNoteRequest {
    pub note_type: NoteType,
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddDiagnosisRequest {
    pub diagnosis_code: String,
    pub description: String,
    pub diagnosis_type: DiagnosisType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordVitalSignsRequest {
    pub temperature: Option<f64>,
    pub heart_rate: Option<i32>,
    pub respiratory_rate: Option<i32>,
    pub systolic_bp: Option<i32>,
    pub diastolic_bp: Option<i32>,
    pub oxygen_saturation: Option<f64>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncounterSearchQuery {
    pub patient_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<EncounterStatus>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum EncounterError {
    #[error("Encounter with ID {0} not found")]
    EncounterNotFound(Uuid),

    #[error("Patient with ID {0} not found")]
    PatientNotFound(Uuid),

    #[error("Provider with ID {0} not found")]
    ProviderNotFound(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: EncounterStatus,
        to: EncounterStatus,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DirectoryError> for EncounterError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::PatientNotFound(id) => EncounterError::PatientNotFound(id),
            DirectoryError::ProviderNotFound(id) => EncounterError::ProviderNotFound(id),
            DirectoryError::DatabaseError(msg) => EncounterError::DatabaseError(msg),
        }
    }
}

impl From<EncounterError> for AppError {
    fn from(err: EncounterError) -> Self {
        match &err {
            EncounterError::EncounterNotFound(_)
            | EncounterError::PatientNotFound(_)
            | EncounterError::ProviderNotFound(_) => AppError::NotFound(err.to_string()),
            EncounterError::ValidationError(_) => AppError::Validation(err.to_string()),
            EncounterError::InvalidStatusTransition { .. } => {
                AppError::StateConflict(err.to_string())
            }
            EncounterError::DatabaseError(_) => AppError::Database(err.to_string()),
        }
    }
}
