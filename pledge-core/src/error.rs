//! Error types for the Pledge state machine.
//!
//! Settlement, registration, pause and resume never fail loudly: they report
//! `false` or `None` and leave the machine untouched. The only checked
//! precondition is assigning the deferred start closure.

use thiserror::Error;

/// Errors from [`StateMachine::set_init_resume`](crate::StateMachine::set_init_resume).
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitResumeError {
    /// A closure is already waiting for the first resume.
    #[error("an init-resume closure is already assigned")]
    AlreadyAssigned,
    /// The first resume already happened, or the machine already finished.
    #[error("the init-resume slot was already consumed")]
    AlreadyConsumed,
}

impl InitResumeError {
    /// Returns a short stable label (snake_case) for use in logs.
    #[must_use]
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::AlreadyAssigned => "init_resume_already_assigned",
            Self::AlreadyConsumed => "init_resume_already_consumed",
        }
    }
}
