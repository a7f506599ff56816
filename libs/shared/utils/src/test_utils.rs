use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, AppState, SchedulingConfig};
use shared_events::EventPublisher;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            nats_url: String::new(),
            scheduling: SchedulingConfig::default(),
        }
    }

    /// Router state with a disconnected event publisher; events become
    /// logged no-ops under test.
    pub fn to_app_state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(
            self.to_app_config(),
            EventPublisher::disconnected(),
        ))
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "staff".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn provider(email: &str) -> Self {
        Self::new(email, "provider")
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "staff")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned PostgREST rows matching the persisted record shapes.
pub struct MockPostgrestResponses;

impl MockPostgrestResponses {
    pub fn patient_row(patient_id: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "medical_record_number": "MRN000001",
            "first_name": "Test",
            "last_name": "Patient",
            "date_of_birth": "1990-01-01",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn provider_row(provider_id: &str) -> serde_json::Value {
        json!({
            "id": provider_id,
            "email": "provider@example.com",
            "first_name": "Test",
            "last_name": "Provider",
            "role": "provider",
            "specialty": "General Medicine",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(
        patient_id: &str,
        provider_id: &str,
        start_time: DateTime<Utc>,
        duration: i64,
        status: &str,
    ) -> serde_json::Value {
        let end_time = start_time + Duration::minutes(duration);
        let actor = Uuid::new_v4();
        json!({
            "id": Uuid::new_v4(),
            "appointment_number": "APT000000001",
            "patient_id": patient_id,
            "provider_id": provider_id,
            "appointment_type": "consultation",
            "status": status,
            "start_time": start_time.to_rfc3339(),
            "end_time": end_time.to_rfc3339(),
            "duration": duration,
            "department": "General Medicine",
            "location": "Main Building",
            "room": "101",
            "reason_for_visit": "Checkup",
            "notes": null,
            "reminder_sent": false,
            "reminder_sent_at": null,
            "checked_in_at": null,
            "cancelled_at": null,
            "cancellation_reason": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "created_by": actor,
            "updated_by": actor
        })
    }

    pub fn encounter_row(patient_id: &str, provider_id: &str, status: &str) -> serde_json::Value {
        let actor = Uuid::new_v4();
        json!({
            "id": Uuid::new_v4(),
            "encounter_number": "ENC000000001",
            "patient_id": patient_id,
            "provider_id": provider_id,
            "encounter_type": "outpatient",
            "status": status,
            "priority": "routine",
            "department": "General Medicine",
            "location": "Main Building",
            "admission_date": "2024-01-01T09:00:00Z",
            "discharge_date": null,
            "chief_complaint": "Headache",
            "reason_for_visit": "Persistent headache",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "created_by": actor,
            "updated_by": actor
        })
    }
}
