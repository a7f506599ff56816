// libs/scheduling-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::SchedulingError;

/// Two intervals overlap when each starts before the other ends.
/// Half-open semantics: a booking ending at 10:00 does not collide
/// with one starting at 10:00.
pub fn intervals_overlap(
    start_a: DateTime<Utc>,
    end_a: DateTime<Utc>,
    start_b: DateTime<Utc>,
    end_b: DateTime<Utc>,
) -> bool {
    start_a < end_b && start_b < end_a
}

/// Rejects any write that would give a provider two overlapping
/// non-cancelled appointments. Callers hold the provider's scheduling
/// lock across check-then-write so the verdict cannot go stale.
pub struct ConflictGuard {
    supabase: Arc<SupabaseClient>,
}

impl ConflictGuard {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Returns Ok(()) when the interval is free for the provider.
    /// `exclude_appointment_id` removes the appointment being
    /// rescheduled from consideration so it cannot conflict with itself.
    pub async fn check_conflict(
        &self,
        provider_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        debug!(
            "Checking conflicts for provider {} between {} and {}",
            provider_id, start_time, end_time
        );

        let mut path = format!(
            "/rest/v1/appointments?provider_id=eq.{}&status=neq.cancelled&start_time=lt.{}&end_time=gt.{}",
            provider_id,
            urlencoding::encode(&end_time.to_rfc3339()),
            urlencoding::encode(&start_time.to_rfc3339()),
        );
        if let Some(exclude_id) = exclude_appointment_id {
            path.push_str(&format!("&id=neq.{}", exclude_id));
        }

        let overlapping: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        if overlapping.is_empty() {
            Ok(())
        } else {
            Err(SchedulingError::Conflict {
                provider_id,
                start_time,
                end_time,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, hour, min, 0).unwrap()
    }

    #[test]
    fn overlapping_intervals_collide() {
        assert!(intervals_overlap(at(10, 0), at(10, 30), at(10, 15), at(10, 45)));
        assert!(intervals_overlap(at(10, 15), at(10, 45), at(10, 0), at(10, 30)));
    }

    #[test]
    fn containment_collides() {
        assert!(intervals_overlap(at(9, 0), at(12, 0), at(10, 0), at(10, 30)));
        assert!(intervals_overlap(at(10, 0), at(10, 30), at(9, 0), at(12, 0)));
    }

    #[test]
    fn back_to_back_intervals_do_not_collide() {
        assert!(!intervals_overlap(at(10, 0), at(10, 30), at(10, 30), at(11, 0)));
        assert!(!intervals_overlap(at(10, 30), at(11, 0), at(10, 0), at(10, 30)));
    }

    #[test]
    fn disjoint_intervals_do_not_collide() {
        assert!(!intervals_overlap(at(9, 0), at(9, 30), at(14, 0), at(14, 30)));
    }
}
