// libs/shared/events/src/lib.rs
//
// Best-effort domain event publication over NATS. A failed publish is
// logged and swallowed: a committed state change must be reported to the
// caller as success even when the event bus is down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

// Event subjects
pub const SUBJECT_APPOINTMENT_BOOKED: &str = "appointment.booked";
pub const SUBJECT_APPOINTMENT_CANCELLED: &str = "appointment.cancelled";
pub const SUBJECT_ENCOUNTER_CREATED: &str = "encounter.created";
pub const SUBJECT_ENCOUNTER_STATUS_CHANGED: &str = "encounter.status_changed";

/// One tagged variant per event kind; serialized at the publish boundary
/// so no untyped maps cross into the message bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    AppointmentBooked {
        appointment_id: Uuid,
        appointment_number: String,
        patient_id: Uuid,
        provider_id: Uuid,
        start_time: DateTime<Utc>,
        created_by: Uuid,
    },
    AppointmentCancelled {
        appointment_id: Uuid,
        patient_id: Uuid,
        provider_id: Uuid,
        reason: String,
        cancelled_by: Uuid,
    },
    EncounterCreated {
        encounter_id: Uuid,
        encounter_number: String,
        patient_id: Uuid,
        provider_id: Uuid,
        created_by: Uuid,
    },
    EncounterStatusChanged {
        encounter_id: Uuid,
        status: String,
        updated_by: Uuid,
    },
}

impl DomainEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::AppointmentBooked { .. } => SUBJECT_APPOINTMENT_BOOKED,
            DomainEvent::AppointmentCancelled { .. } => SUBJECT_APPOINTMENT_CANCELLED,
            DomainEvent::EncounterCreated { .. } => SUBJECT_ENCOUNTER_CREATED,
            DomainEvent::EncounterStatusChanged { .. } => SUBJECT_ENCOUNTER_STATUS_CHANGED,
        }
    }
}

pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    /// Connect to the event bus. A connection failure degrades to a
    /// disconnected publisher rather than aborting startup.
    pub async fn connect(url: &str) -> Self {
        match async_nats::connect(url).await {
            Ok(client) => {
                debug!("Connected to NATS at {}", url);
                Self {
                    client: Some(client),
                }
            }
            Err(e) => {
                warn!("NATS unavailable ({}), events will be dropped: {}", url, e);
                Self { client: None }
            }
        }
    }

    /// Publisher with no transport. Used in tests and when no bus is
    /// configured; publishes become logged no-ops.
    pub fn disconnected() -> Self {
        Self { client: None }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Publish a domain event. Never fails from the caller's perspective.
    pub async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();

        let payload = match serde_json::to_vec(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize event for {}: {}", subject, e);
                return;
            }
        };

        match &self.client {
            Some(client) => {
                if let Err(e) = client.publish(subject.to_string(), payload.into()).await {
                    warn!("Failed to publish event to {}: {}", subject, e);
                } else {
                    debug!("Published event to {}", subject);
                }
            }
            None => {
                debug!("Event bus not connected, dropping event for {}", subject);
            }
        }
    }
}
