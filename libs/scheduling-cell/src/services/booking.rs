// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
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
    Appointment, AppointmentSearchQuery, AppointmentStatus, CreateAppointmentRequest,
    SchedulingError, UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictGuard;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::locking::SchedulingLockService;

/// Human-facing appointment number. Uniqueness rests on the sub-second
/// clock; the row id stays the canonical identity.
fn generate_appointment_number() -> String {
    format!("APT{:09}", Utc::now().timestamp_micros() % 1_000_000_000)
}

/// Validate and derive the booking interval. `end_time` is always
/// recomputed from start and duration, never taken from the caller.
fn booking_window(
    start_time: DateTime<Utc>,
    duration: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>), SchedulingError> {
    if duration <= 0 {
        return Err(SchedulingError::ValidationError(
            "Appointment duration must be positive".to_string(),
        ));
    }
    Ok((start_time, start_time + Duration::minutes(duration)))
}

/// Orchestrates appointment writes: identity checks, provider locking,
/// conflict detection, persistence, then best-effort event emission.
pub struct AppointmentBookingService {
    supabase: Arc<SupabaseClient>,
    directory: DirectoryService,
    conflict_guard: ConflictGuard,
    lifecycle: AppointmentLifecycleService,
    locks: SchedulingLockService,
    state: Arc<AppState>,
}

impl AppointmentBookingService {
    pub fn new(state: Arc<AppState>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&state.config));
        Self {
            directory: DirectoryService::new(supabase.clone()),
            conflict_guard: ConflictGuard::new(supabase.clone()),
            lifecycle: AppointmentLifecycleService::new(),
            locks: SchedulingLockService::new(supabase.clone()),
            supabase,
            state,
        }
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        created_by: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let (start_time, end_time) = booking_window(request.start_time, request.duration)?;

        self.directory
            .lookup_patient(request.patient_id, auth_token)
            .await?;
        self.directory
            .lookup_provider(request.provider_id, auth_token)
            .await?;

        let lock_key = self
            .locks
            .acquire_provider_lock(request.provider_id, start_time, end_time, auth_token)
            .await?;
        let result = self
            .insert_appointment(&request, start_time, end_time, created_by, auth_token)
            .await;
        self.locks.release_lock(&lock_key, auth_token).await;

        let appointment = result?;
        info!(
            "Booked appointment {} for patient {} with provider {}",
            appointment.appointment_number, appointment.patient_id, appointment.provider_id
        );

        self.state
            .events
            .publish(DomainEvent::AppointmentBooked {
                appointment_id: appointment.id,
                appointment_number: appointment.appointment_number.clone(),
                patient_id: appointment.patient_id,
                provider_id: appointment.provider_id,
                start_time: appointment.start_time,
                created_by,
            })
            .await;

        Ok(appointment)
    }

    async fn insert_appointment(
        &self,
        request: &CreateAppointmentRequest,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        created_by: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        self.conflict_guard
            .check_conflict(request.provider_id, start_time, end_time, None, auth_token)
            .await?;

        let audit = AuditFields::on_create(created_by);
        let body = json!({
            "appointment_number": generate_appointment_number(),
            "patient_id": request.patient_id,
            "provider_id": request.provider_id,
            "appointment_type": request.appointment_type,
            "status": AppointmentStatus::Scheduled,
            "start_time": start_time,
            "end_time": end_time,
            "duration": request.duration,
            "department": request.department,
            "location": request.location,
            "room": request.room,
            "reason_for_visit": request.reason_for_visit,
            "notes": request.notes,
            "reminder_sent": false,
            "created_at": audit.created_at,
            "updated_at": audit.updated_at,
            "created_by": audit.created_by,
            "updated_by": audit.updated_by,
        });

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().ok_or_else(|| {
            SchedulingError::DatabaseError("Insert returned no appointment row".to_string())
        })
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::AppointmentNotFound(appointment_id))
    }

    pub async fn search_appointments(
        &self,
        query: &AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut path = String::from("/rest/v1/appointments?order=start_time.asc");

        if let Some(patient_id) = query.patient_id {
            path.push_str(&format!("&patient_id=eq.{}", patient_id));
        }
        if let Some(provider_id) = query.provider_id {
            path.push_str(&format!("&provider_id=eq.{}", provider_id));
        }
        if let Some(status) = query.status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        if let Some(date) = query.date {
            if let Some(day_start) = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()) {
                let day_end = day_start + Duration::days(1);
                path.push_str(&format!(
                    "&start_time=gte.{}&start_time=lt.{}",
                    urlencoding::encode(&day_start.to_rfc3339()),
                    urlencoding::encode(&day_end.to_rfc3339()),
                ));
            }
        }
        path.push_str(&format!("&limit={}", query.limit.unwrap_or(50)));
        path.push_str(&format!("&offset={}", query.offset.unwrap_or(0)));

        debug!("Searching appointments: {}", path);

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))
    }

    /// Reschedule or amend an appointment. The conflict check excludes
    /// the appointment itself so an unchanged or shifted interval never
    /// collides with its own row.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
        updated_by: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        let status = match request.status {
            Some(requested) if requested != current.status => {
                self.lifecycle
                    .validate_transition(current.status, requested)?;
                requested
            }
            Some(unchanged) => unchanged,
            None => current.status,
        };

        let (start_time, end_time) = booking_window(request.start_time, request.duration)?;

        self.directory
            .lookup_patient(request.patient_id, auth_token)
            .await?;
        self.directory
            .lookup_provider(request.provider_id, auth_token)
            .await?;

        let lock_key = self
            .locks
            .acquire_provider_lock(request.provider_id, start_time, end_time, auth_token)
            .await?;
        let result = self
            .patch_appointment_locked(
                appointment_id,
                &request,
                status,
                start_time,
                end_time,
                updated_by,
                auth_token,
            )
            .await;
        self.locks.release_lock(&lock_key, auth_token).await;

        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn patch_appointment_locked(
        &self,
        appointment_id: Uuid,
        request: &UpdateAppointmentRequest,
        status: AppointmentStatus,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        updated_by: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        self.conflict_guard
            .check_conflict(
                request.provider_id,
                start_time,
                end_time,
                Some(appointment_id),
                auth_token,
            )
            .await?;

        let body = json!({
            "patient_id": request.patient_id,
            "provider_id": request.provider_id,
            "appointment_type": request.appointment_type,
            "status": status,
            "start_time": start_time,
            "end_time": end_time,
            "duration": request.duration,
            "department": request.department,
            "location": request.location,
            "room": request.room,
            "reason_for_visit": request.reason_for_visit,
            "notes": request.notes,
            "updated_at": Utc::now(),
            "updated_by": updated_by,
        });

        self.patch_by_id(appointment_id, body, auth_token).await
    }

    /// Cancellation is terminal and idempotence is rejected: cancelling
    /// an already-cancelled or completed appointment is a state conflict.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        reason: String,
        cancelled_by: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        if !self.lifecycle.can_cancel(current.status) {
            return Err(SchedulingError::InvalidStatusTransition {
                from: current.status,
                to: AppointmentStatus::Cancelled,
            });
        }

        let body = json!({
            "status": AppointmentStatus::Cancelled,
            "cancelled_at": Utc::now(),
            "cancellation_reason": reason,
            "updated_at": Utc::now(),
            "updated_by": cancelled_by,
        });

        let appointment = self.patch_by_id(appointment_id, body, auth_token).await?;
        info!(
            "Cancelled appointment {} ({})",
            appointment.appointment_number, appointment.id
        );

        self.state
            .events
            .publish(DomainEvent::AppointmentCancelled {
                appointment_id: appointment.id,
                patient_id: appointment.patient_id,
                provider_id: appointment.provider_id,
                reason,
                cancelled_by,
            })
            .await;

        Ok(appointment)
    }

    pub async fn check_in_appointment(
        &self,
        appointment_id: Uuid,
        checked_in_by: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;

        if !self.lifecycle.can_check_in(current.status) {
            return Err(SchedulingError::InvalidStatusTransition {
                from: current.status,
                to: AppointmentStatus::CheckedIn,
            });
        }

        let body = json!({
            "status": AppointmentStatus::CheckedIn,
            "checked_in_at": Utc::now(),
            "updated_at": Utc::now(),
            "updated_by": checked_in_by,
        });

        self.patch_by_id(appointment_id, body, auth_token).await
    }

    async fn patch_by_id(
        &self,
        appointment_id: Uuid,
        body: serde_json::Value,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(SchedulingError::AppointmentNotFound(appointment_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appointment_numbers_have_fixed_shape() {
        let number = generate_appointment_number();
        assert!(number.starts_with("APT"));
        assert_eq!(number.len(), 12);
        assert!(number[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn booking_window_recomputes_end_from_duration() {
        let start = Utc::now();
        let (s, e) = booking_window(start, 45).unwrap();
        assert_eq!(s, start);
        assert_eq!(e - s, Duration::minutes(45));
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        assert!(booking_window(Utc::now(), 0).is_err());
        assert!(booking_window(Utc::now(), -30).is_err());
    }
}
