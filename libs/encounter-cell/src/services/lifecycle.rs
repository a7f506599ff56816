// libs/encounter-cell/src/services/lifecycle.rs
use crate::models::{EncounterError, EncounterStatus};

/// The encounter state machine. Simpler than the appointment one:
///
/// scheduled -> in_progress -> completed
/// scheduled | in_progress -> cancelled
///
/// Terminal statuses accept nothing, including a repeated write of the
/// same terminal status.
pub struct EncounterLifecycleService;

impl EncounterLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, from: EncounterStatus) -> &'static [EncounterStatus] {
        match from {
            EncounterStatus::Scheduled => {
                &[EncounterStatus::InProgress, EncounterStatus::Cancelled]
            }
            EncounterStatus::InProgress => {
                &[EncounterStatus::Completed, EncounterStatus::Cancelled]
            }
            EncounterStatus::Completed | EncounterStatus::Cancelled => &[],
        }
    }

    pub fn validate_transition(
        &self,
        from: EncounterStatus,
        to: EncounterStatus,
    ) -> Result<(), EncounterError> {
        if self.valid_transitions(from).contains(&to) {
            Ok(())
        } else {
            Err(EncounterError::InvalidStatusTransition { from, to })
        }
    }
}

impl Default for EncounterLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn forward_path_is_valid() {
        let lifecycle = EncounterLifecycleService::new();
        assert!(lifecycle
            .validate_transition(EncounterStatus::Scheduled, EncounterStatus::InProgress)
            .is_ok());
        assert!(lifecycle
            .validate_transition(EncounterStatus::InProgress, EncounterStatus::Completed)
            .is_ok());
    }

    #[test]
    fn scheduled_cannot_jump_to_completed() {
        let lifecycle = EncounterLifecycleService::new();
        assert_matches!(
            lifecycle.validate_transition(EncounterStatus::Scheduled, EncounterStatus::Completed),
            Err(EncounterError::InvalidStatusTransition { .. })
        );
    }

    #[test]
    fn non_terminal_statuses_can_cancel() {
        let lifecycle = EncounterLifecycleService::new();
        assert!(lifecycle
            .validate_transition(EncounterStatus::Scheduled, EncounterStatus::Cancelled)
            .is_ok());
        assert!(lifecycle
            .validate_transition(EncounterStatus::InProgress, EncounterStatus::Cancelled)
            .is_ok());
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        let lifecycle = EncounterLifecycleService::new();
        for from in [EncounterStatus::Completed, EncounterStatus::Cancelled] {
            assert!(lifecycle.valid_transitions(from).is_empty());
            // A repeated terminal write is also rejected.
            assert_matches!(
                lifecycle.validate_transition(from, from),
                Err(EncounterError::InvalidStatusTransition { .. })
            );
        }
    }

    #[test]
    fn completed_cannot_reopen() {
        let lifecycle = EncounterLifecycleService::new();
        assert_matches!(
            lifecycle.validate_transition(EncounterStatus::Completed, EncounterStatus::InProgress),
            Err(EncounterError::InvalidStatusTransition { .. })
        );
    }
}
