// libs/scheduling-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use directory_cell::models::DirectoryError;
use shared_models::base::AuditFields;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A scheduled appointment. Never hard-deleted: cancellation is the
/// terminal non-completion state and cancelled rows stay in the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub appointment_number: String,
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Minutes; always equal to end_time - start_time.
    pub duration: i64,
    pub department: Option<String>,
    pub location: Option<String>,
    pub room: Option<String>,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub reminder_sent: bool,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::CheckedIn => write!(f, "checked_in"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Wellness,
    Procedure,
    Emergency,
    Telehealth,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::FollowUp => write!(f, "follow_up"),
            AppointmentType::Wellness => write!(f, "wellness"),
            AppointmentType::Procedure => write!(f, "procedure"),
            AppointmentType::Emergency => write!(f, "emergency"),
            AppointmentType::Telehealth => write!(f, "telehealth"),
        }
    }
}

/// A candidate booking interval produced by the availability calculator.
/// Derived, never persisted; valid only for the instant it was computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub available: bool,
}

/// Row-level lock over a provider's booking set, held for the duration
/// of a conflict-check-then-write sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingLock {
    pub lock_key: String,
    pub provider_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub holder: String,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub appointment_type: AppointmentType,
    pub start_time: DateTime<Utc>,
    /// Minutes.
    pub duration: i64,
    pub department: Option<String>,
    pub location: Option<String>,
    pub room: Option<String>,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub patient_id: Uuid,
    pub provider_id: Uuid,
    pub appointment_type: AppointmentType,
    pub start_time: DateTime<Utc>,
    pub duration: i64,
    pub department: Option<String>,
    pub location: Option<String>,
    pub room: Option<String>,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
    /// Status stays unchanged unless explicitly requested; a requested
    /// change must be legal per the transition table.
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    /// May be empty.
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Matches appointments whose start falls on this calendar day.
    pub date: Option<NaiveDate>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Appointment with ID {0} not found")]
    AppointmentNotFound(Uuid),

    #[error("Patient with ID {0} not found")]
    PatientNotFound(Uuid),

    #[error("Provider with ID {0} not found")]
    ProviderNotFound(Uuid),

    #[error("Provider {provider_id} already booked between {start_time} and {end_time}")]
    Conflict {
        provider_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DirectoryError> for SchedulingError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::PatientNotFound(id) => SchedulingError::PatientNotFound(id),
            DirectoryError::ProviderNotFound(id) => SchedulingError::ProviderNotFound(id),
            DirectoryError::DatabaseError(msg) => SchedulingError::DatabaseError(msg),
        }
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match &err {
            SchedulingError::AppointmentNotFound(_)
            | SchedulingError::PatientNotFound(_)
            | SchedulingError::ProviderNotFound(_) => AppError::NotFound(err.to_string()),
            SchedulingError::Conflict { .. } => AppError::Conflict(err.to_string()),
            SchedulingError::ValidationError(_) => AppError::Validation(err.to_string()),
            SchedulingError::InvalidStatusTransition { .. } => {
                AppError::StateConflict(err.to_string())
            }
            SchedulingError::DatabaseError(_) => AppError::Database(err.to_string()),
        }
    }
}
