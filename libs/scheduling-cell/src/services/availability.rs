// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use directory_cell::services::DirectoryService;
use shared_config::SchedulingConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, SchedulingError, TimeSlot};
use crate::services::conflict::intervals_overlap;

/// Walk a working window in fixed steps and mark each slot unavailable
/// when any booked interval overlaps it. A slot that would extend past
/// the end of the window is never emitted.
pub fn build_slots(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    slot_minutes: i64,
    booked: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<TimeSlot> {
    let step = Duration::minutes(slot_minutes);
    let mut slots = Vec::new();
    let mut cursor = window_start;

    while cursor + step <= window_end {
        let slot_end = cursor + step;
        let taken = booked
            .iter()
            .any(|(start, end)| intervals_overlap(cursor, slot_end, *start, *end));

        slots.push(TimeSlot {
            start_time: cursor,
            end_time: slot_end,
            available: !taken,
        });
        cursor = slot_end;
    }

    slots
}

/// Computes a provider's bookable slots for one calendar day.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    directory: DirectoryService,
    config: SchedulingConfig,
}

impl AvailabilityService {
    pub fn new(supabase: Arc<SupabaseClient>, config: SchedulingConfig) -> Self {
        Self {
            directory: DirectoryService::new(supabase.clone()),
            supabase,
            config,
        }
    }

    /// Returns every slot in the provider's working window for `date`,
    /// flagged available or not. Cancelled appointments never block.
    pub async fn get_provider_availability(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        if !self.config.is_valid() {
            return Err(SchedulingError::ValidationError(
                "Scheduling window is misconfigured".to_string(),
            ));
        }

        self.directory.lookup_provider(provider_id, auth_token).await?;

        let day_start = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()).ok_or_else(|| {
            SchedulingError::ValidationError(format!("Invalid date: {}", date))
        })?;
        let day_end = day_start + Duration::days(1);

        let path = format!(
            "/rest/v1/appointments?provider_id=eq.{}&status=neq.cancelled&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            provider_id,
            urlencoding::encode(&day_start.to_rfc3339()),
            urlencoding::encode(&day_end.to_rfc3339()),
        );

        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::DatabaseError(e.to_string()))?;

        debug!(
            "Provider {} has {} booked appointments on {}",
            provider_id,
            appointments.len(),
            date
        );

        let booked: Vec<(DateTime<Utc>, DateTime<Utc>)> = appointments
            .iter()
            .map(|a| (a.start_time, a.end_time))
            .collect();

        let window_start = date.and_time(self.config.work_day_start).and_utc();
        let window_end = date.and_time(self.config.work_day_end).and_utc();

        Ok(build_slots(
            window_start,
            window_end,
            self.config.slot_minutes,
            &booked,
        ))
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
    fn empty_day_yields_all_available_slots() {
        let slots = build_slots(at(8, 0), at(17, 0), 30, &[]);
        assert_eq!(slots.len(), 18);
        assert!(slots.iter().all(|s| s.available));
        assert_eq!(slots[0].start_time, at(8, 0));
        assert_eq!(slots[17].end_time, at(17, 0));
    }

    #[test]
    fn booked_interval_blocks_only_its_slot() {
        let slots = build_slots(at(8, 0), at(17, 0), 30, &[(at(10, 0), at(10, 30))]);
        assert_eq!(slots.len(), 18);
        let blocked: Vec<_> = slots.iter().filter(|s| !s.available).collect();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].start_time, at(10, 0));
        // Adjacent slots stay open.
        assert!(slots.iter().find(|s| s.start_time == at(9, 30)).unwrap().available);
        assert!(slots.iter().find(|s| s.start_time == at(10, 30)).unwrap().available);
    }

    #[test]
    fn long_booking_blocks_every_slot_it_touches() {
        // 09:15 to 10:45 straddles four 30-minute slots.
        let slots = build_slots(at(8, 0), at(17, 0), 30, &[(at(9, 15), at(10, 45))]);
        let blocked: Vec<_> = slots.iter().filter(|s| !s.available).map(|s| s.start_time).collect();
        assert_eq!(blocked, vec![at(9, 0), at(9, 30), at(10, 0), at(10, 30)]);
    }

    #[test]
    fn partial_trailing_slot_is_dropped() {
        // 08:00 to 08:50 with 30-minute slots fits exactly one slot.
        let slots = build_slots(at(8, 0), at(8, 50), 30, &[]);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].end_time, at(8, 30));
    }

    #[test]
    fn booking_ending_at_slot_start_does_not_block_it() {
        let slots = build_slots(at(8, 0), at(17, 0), 30, &[(at(9, 30), at(10, 0))]);
        assert!(slots.iter().find(|s| s.start_time == at(10, 0)).unwrap().available);
        assert!(!slots.iter().find(|s| s.start_time == at(9, 30)).unwrap().available);
    }
}
