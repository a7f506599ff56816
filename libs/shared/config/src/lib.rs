use std::env;

use chrono::NaiveTime;
use tracing::warn;

use shared_events::EventPublisher;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub nats_url: String,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL").unwrap_or_else(|_| {
                warn!("SUPABASE_URL not set, using empty value");
                String::new()
            }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY").unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                String::new()
            }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET").unwrap_or_else(|_| {
                warn!("SUPABASE_JWT_SECRET not set, using empty value");
                String::new()
            }),
            nats_url: env::var("NATS_URL").unwrap_or_else(|_| {
                warn!("NATS_URL not set, using default");
                "nats://localhost:4222".to_string()
            }),
            scheduling: SchedulingConfig::default(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

/// Fixed scheduling policy: the provider working window and the slot
/// width used by the availability calculator. These are configuration
/// constants, not values derived from bookings.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    pub work_day_start: NaiveTime,
    pub work_day_end: NaiveTime,
    pub slot_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            work_day_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            work_day_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            slot_minutes: 30,
        }
    }
}

impl SchedulingConfig {
    /// Window parameters must describe a non-empty forward window.
    pub fn is_valid(&self) -> bool {
        self.work_day_start < self.work_day_end && self.slot_minutes > 0
    }
}

/// Shared router state: configuration plus the best-effort event
/// publisher, built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(config: AppConfig, events: EventPublisher) -> Self {
        Self { config, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scheduling_window_is_valid() {
        let config = SchedulingConfig::default();
        assert!(config.is_valid());
        assert_eq!(config.slot_minutes, 30);
    }

    #[test]
    fn inverted_window_is_invalid() {
        let config = SchedulingConfig {
            work_day_start: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            work_day_end: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            slot_minutes: 30,
        };
        assert!(!config.is_valid());
    }

    #[test]
    fn zero_slot_width_is_invalid() {
        let config = SchedulingConfig {
            slot_minutes: 0,
            ..SchedulingConfig::default()
        };
        assert!(!config.is_valid());
    }
}
