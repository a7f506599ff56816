// libs/scheduling-cell/src/services/locking.rs
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{SchedulingError, SchedulingLock};

const LOCK_TTL_SECONDS: i64 = 10;
const MAX_ACQUIRE_ATTEMPTS: u32 = 5;
const RETRY_DELAY_MS: u64 = 100;

/// Provider-scoped mutual exclusion backed by a unique-keyed lock table.
/// Holding the lock serializes conflict-check-then-write sequences for
/// one provider; bookings for other providers proceed in parallel.
///
/// Locks carry a short expiry so a crashed holder cannot wedge a
/// provider's calendar. Stale rows are reaped by the next acquirer.
pub struct SchedulingLockService {
    supabase: Arc<SupabaseClient>,
    holder: String,
}

impl SchedulingLockService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            holder: Uuid::new_v4().to_string(),
        }
    }

    fn lock_key(provider_id: Uuid) -> String {
        format!("provider:{}", provider_id)
    }

    fn representation_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        headers
    }

    /// Acquire the lock for a provider, retrying with a short delay while
    /// another writer holds it. Exhausting the retries reports the booking
    /// interval as conflicted so the caller can surface a retryable 409.
    pub async fn acquire_provider_lock(
        &self,
        provider_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<String, SchedulingError> {
        let lock_key = Self::lock_key(provider_id);

        for attempt in 1..=MAX_ACQUIRE_ATTEMPTS {
            match self.try_insert_lock(&lock_key, provider_id, auth_token).await {
                Ok(()) => {
                    debug!("Acquired scheduling lock {} (attempt {})", lock_key, attempt);
                    return Ok(lock_key);
                }
                Err(SchedulingError::Conflict { .. }) => {
                    self.reap_if_expired(&lock_key, auth_token).await;
                    tokio::time::sleep(StdDuration::from_millis(RETRY_DELAY_MS * attempt as u64))
                        .await;
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            "Could not acquire scheduling lock {} after {} attempts",
            lock_key, MAX_ACQUIRE_ATTEMPTS
        );
        Err(SchedulingError::Conflict {
            provider_id,
            start_time,
            end_time,
        })
    }

    async fn try_insert_lock(
        &self,
        lock_key: &str,
        provider_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let now = Utc::now();
        let body = json!({
            "lock_key": lock_key,
            "provider_id": provider_id,
            "acquired_at": now,
            "expires_at": now + Duration::seconds(LOCK_TTL_SECONDS),
            "holder": self.holder,
        });

        let result: Result<Vec<SchedulingLock>, _> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/scheduling_locks",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            // Unique violation on lock_key means another holder is active.
            Err(e) if e.to_string().contains("conflict") => Err(SchedulingError::Conflict {
                provider_id,
                start_time: now,
                end_time: now,
            }),
            Err(e) => Err(SchedulingError::DatabaseError(e.to_string())),
        }
    }

    /// Delete the current row for `lock_key` when its expiry has passed.
    /// Failure here only delays acquisition by one retry round.
    async fn reap_if_expired(&self, lock_key: &str, auth_token: &str) {
        let path = format!(
            "/rest/v1/scheduling_locks?lock_key=eq.{}&expires_at=lt.{}",
            urlencoding::encode(lock_key),
            urlencoding::encode(&Utc::now().to_rfc3339()),
        );

        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(Self::representation_headers()),
            )
            .await;

        match result {
            Ok(reaped) if !reaped.is_empty() => {
                debug!("Reaped {} expired lock row(s) for {}", reaped.len(), lock_key);
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to reap expired lock {}: {}", lock_key, e),
        }
    }

    /// Release a held lock. Only rows owned by this holder are deleted,
    /// so an expired-and-reacquired lock is never released by the old
    /// holder. Release failures are logged and left to the expiry reaper.
    pub async fn release_lock(&self, lock_key: &str, auth_token: &str) {
        let path = format!(
            "/rest/v1/scheduling_locks?lock_key=eq.{}&holder=eq.{}",
            urlencoding::encode(lock_key),
            urlencoding::encode(&self.holder),
        );

        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(Self::representation_headers()),
            )
            .await;

        match result {
            Ok(_) => debug!("Released scheduling lock {}", lock_key),
            Err(e) => warn!("Failed to release scheduling lock {}: {}", lock_key, e),
        }
    }
}
