//! Lifecycle states and terminal result types.

use core::fmt;

/// The lifecycle state of a task.
///
/// `Running` and `Paused` are active; the other three are terminal and
/// mutually exclusive. A machine never leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Producing; progress is delivered.
    Running,
    /// Suspended by the consumer; progress is dropped.
    Paused,
    /// Settled with a value.
    Fulfilled,
    /// Settled with an application error.
    Rejected,
    /// Settled by cancellation.
    Cancelled,
}

impl State {
    /// Whether the machine has settled.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected | Self::Cancelled)
    }

    /// Whether the machine is still running or paused.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Paused => write!(f, "Paused"),
            Self::Fulfilled => write!(f, "Fulfilled"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Description of a non-success outcome.
///
/// The error is opaque to the machine; it is stored as given and only tagged
/// with whether the outcome counts as a cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo<E> {
    /// The producer's error, if any.
    pub error: Option<E>,
    /// Whether this outcome is a cancellation rather than a rejection.
    pub is_cancelled: bool,
}

impl<E> ErrorInfo<E> {
    /// A plain rejection carrying `error`.
    #[must_use]
    pub const fn rejected(error: E) -> Self {
        Self {
            error: Some(error),
            is_cancelled: false,
        }
    }

    /// A cancellation, optionally carrying an error.
    #[must_use]
    pub const fn cancelled(error: Option<E>) -> Self {
        Self {
            error,
            is_cancelled: true,
        }
    }

    /// The terminal state this info settles a machine into.
    #[must_use]
    pub const fn target_state(&self) -> State {
        if self.is_cancelled {
            State::Cancelled
        } else {
            State::Rejected
        }
    }
}

/// The settled result of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// Fulfilled with a value.
    Fulfilled(T),
    /// Rejected, with the error if one was supplied.
    Rejected(Option<E>),
    /// Cancelled, with the error if one was supplied.
    Cancelled(Option<E>),
}

impl<T, E> Outcome<T, E> {
    /// The terminal state matching this outcome.
    #[must_use]
    pub const fn state(&self) -> State {
        match self {
            Self::Fulfilled(_) => State::Fulfilled,
            Self::Rejected(_) => State::Rejected,
            Self::Cancelled(_) => State::Cancelled,
        }
    }
}

/// Everything the machine stores, captured under a single lock hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T, E, P> {
    /// Current lifecycle state.
    pub state: State,
    /// Latest progress; always empty once settled or when weakified.
    pub progress: Option<P>,
    /// Success value, set only when fulfilled.
    pub value: Option<T>,
    /// Failure info, set only when rejected or cancelled.
    pub error_info: Option<ErrorInfo<E>>,
}
