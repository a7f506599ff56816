// libs/scheduling-cell/src/services/lifecycle.rs
use crate::models::{AppointmentStatus, SchedulingError};

/// The appointment state machine. Every status write goes through
/// `validate_transition`; there is no bypass path.
///
/// scheduled -> confirmed -> checked_in -> in_progress -> completed
/// Any non-terminal status may also move to cancelled. no_show is set
/// by policy sweeps, never by a direct user transition out of it.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, from: AppointmentStatus) -> &'static [AppointmentStatus] {
        match from {
            AppointmentStatus::Scheduled => &[
                AppointmentStatus::Confirmed,
                AppointmentStatus::CheckedIn,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Confirmed => &[
                AppointmentStatus::CheckedIn,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::CheckedIn => &[
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::InProgress => &[
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => &[],
        }
    }

    pub fn validate_transition(
        &self,
        from: AppointmentStatus,
        to: AppointmentStatus,
    ) -> Result<(), SchedulingError> {
        if self.valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            Err(SchedulingError::InvalidStatusTransition { from, to })
        }
    }

    /// Check-in is only offered from the pre-arrival statuses.
    pub fn can_check_in(&self, status: AppointmentStatus) -> bool {
        matches!(
            status,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }

    pub fn can_cancel(&self, status: AppointmentStatus) -> bool {
        !status.is_terminal()
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn happy_path_transitions_are_valid() {
        let lifecycle = AppointmentLifecycleService::new();
        let path = [
            (AppointmentStatus::Scheduled, AppointmentStatus::Confirmed),
            (AppointmentStatus::Confirmed, AppointmentStatus::CheckedIn),
            (AppointmentStatus::CheckedIn, AppointmentStatus::InProgress),
            (AppointmentStatus::InProgress, AppointmentStatus::Completed),
        ];
        for (from, to) in path {
            assert!(lifecycle.validate_transition(from, to).is_ok());
        }
    }

    #[test]
    fn scheduled_can_skip_confirmation() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle
            .validate_transition(AppointmentStatus::Scheduled, AppointmentStatus::CheckedIn)
            .is_ok());
    }

    #[test]
    fn every_non_terminal_status_can_cancel() {
        let lifecycle = AppointmentLifecycleService::new();
        for from in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Confirmed,
            AppointmentStatus::CheckedIn,
            AppointmentStatus::InProgress,
        ] {
            assert!(lifecycle
                .validate_transition(from, AppointmentStatus::Cancelled)
                .is_ok());
            assert!(lifecycle.can_cancel(from));
        }
    }

    #[test]
    fn terminal_statuses_reject_all_transitions() {
        let lifecycle = AppointmentLifecycleService::new();
        for from in [
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
        ] {
            assert!(lifecycle.valid_transitions(from).is_empty());
            assert_matches!(
                lifecycle.validate_transition(from, AppointmentStatus::Scheduled),
                Err(SchedulingError::InvalidStatusTransition { .. })
            );
            assert!(!lifecycle.can_cancel(from));
        }
    }

    #[test]
    fn cancelled_cannot_be_cancelled_again() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_transition(
                AppointmentStatus::Cancelled,
                AppointmentStatus::Cancelled
            ),
            Err(SchedulingError::InvalidStatusTransition { .. })
        );
    }

    #[test]
    fn skipping_forward_states_is_rejected() {
        let lifecycle = AppointmentLifecycleService::new();
        assert_matches!(
            lifecycle.validate_transition(
                AppointmentStatus::Scheduled,
                AppointmentStatus::Completed
            ),
            Err(SchedulingError::InvalidStatusTransition { .. })
        );
        assert_matches!(
            lifecycle.validate_transition(
                AppointmentStatus::Confirmed,
                AppointmentStatus::InProgress
            ),
            Err(SchedulingError::InvalidStatusTransition { .. })
        );
    }

    #[test]
    fn check_in_only_from_pre_arrival_statuses() {
        let lifecycle = AppointmentLifecycleService::new();
        assert!(lifecycle.can_check_in(AppointmentStatus::Scheduled));
        assert!(lifecycle.can_check_in(AppointmentStatus::Confirmed));
        assert!(!lifecycle.can_check_in(AppointmentStatus::CheckedIn));
        assert!(!lifecycle.can_check_in(AppointmentStatus::Completed));
        assert!(!lifecycle.can_check_in(AppointmentStatus::Cancelled));
    }
}
