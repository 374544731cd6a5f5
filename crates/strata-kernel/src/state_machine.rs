//! Job lifecycle transitions
//!
//! `SUBMITTED -> RUNNING -> COMPLETED | FAILED`. Both outcomes are terminal.

use crate::error::StateMachineError;
use crate::types::JobStatus;

/// Validates a job status transition.
///
/// Returns an error for illegal transitions; with the `strict-debug` feature
/// enabled it panics instead so misuse surfaces immediately in tests.
///
/// # Errors
/// [`StateMachineError::IllegalTransition`] when `to` is not reachable from `from`
pub fn validate_transition(from: JobStatus, to: JobStatus) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("illegal job transition attempted: {from} -> {to}");

        #[cfg(not(feature = "strict-debug"))]
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// Statuses reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: JobStatus) -> &'static [JobStatus] {
    match from {
        JobStatus::Submitted => &[JobStatus::Running],
        JobStatus::Running => &[JobStatus::Completed, JobStatus::Failed],
        JobStatus::Completed | JobStatus::Failed => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_have_no_exit() {
        for status in JobStatus::ALL {
            assert_eq!(status.is_terminal(), allowed_transitions(status).is_empty());
        }
    }

    #[cfg(not(feature = "strict-debug"))]
    #[test]
    fn skipping_running_is_rejected() {
        let err = validate_transition(JobStatus::Submitted, JobStatus::Completed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "illegal job transition SUBMITTED -> COMPLETED"
        );
    }
}
