//! # Pledge Core
//!
//! The lifecycle state machine underneath a Pledge task.
//!
//! A task is a deferred computation that eventually settles exactly once:
//! it is fulfilled with a value, rejected with an opaque error, or cancelled.
//! Until then it is either running or paused, and it may report progress.
//! [`StateMachine`] owns that lifecycle for a single computation:
//!
//! - it stores the current [`State`] and the terminal result,
//! - it fans progress and completion notifications out to registered observers,
//! - it coordinates pause/resume with the producer's [`Hooks`],
//! - it runs a one-shot "start producing" closure on the first resume.
//!
//! ## Concurrency
//!
//! Every public operation runs under a single reentrant lock, observers and
//! hooks included. Operations are therefore linearizable per instance, and a
//! callback may call back into the machine that invoked it on the same thread
//! without deadlocking. The core never decides where callbacks run; it calls
//! them synchronously on the caller's thread.
//!
//! ## Example
//!
//! ```rust
//! use pledge_core::{State, StateMachine};
//! use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
//!
//! let machine: StateMachine<u32, String> = StateMachine::builder().build(|| {});
//!
//! let done = Arc::new(AtomicBool::new(false));
//! let flag = done.clone();
//! machine
//!     .add_completion_handler(move || flag.store(true, Ordering::SeqCst))
//!     .expect("machine is still running");
//!
//! assert!(machine.handle_progress(0.5));
//! assert!(machine.handle_fulfill(42));
//!
//! assert_eq!(machine.state(), State::Fulfilled);
//! assert_eq!(machine.value(), Some(42));
//! assert!(done.load(Ordering::SeqCst));
//!
//! // Settlement is idempotent-once.
//! assert!(!machine.handle_fulfill(7));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use core::fmt;

pub mod config;
pub mod error;
pub mod machine;
mod registry;
pub mod state;

pub use config::{Hooks, MachineOptions, StateMachineBuilder};
pub use error::InitResumeError;
pub use machine::StateMachine;
pub use state::{ErrorInfo, Outcome, Snapshot, State};

/// Observer called with the previously stored progress (if any) and the new one.
pub type ProgressHandler<P> = std::sync::Arc<dyn Fn(Option<&P>, &P) + Send + Sync>;

/// Observer called once, with no arguments, when the machine settles.
pub type CompletionHandler = Box<dyn FnOnce() + Send>;

/// Producer pause or resume hook.
pub type HookFn = std::sync::Arc<dyn Fn() + Send + Sync>;

/// Producer hook invoked once by the finish routine.
pub type FinishFn = Box<dyn FnOnce() + Send>;

/// Deferred "start producing" closure, consumed on the first resume.
pub type InitResumeFn = Box<dyn FnOnce() + Send>;

/// Handle returned when registering an observer, used to remove it again.
///
/// Tokens increase monotonically and are never reused by the registry that
/// issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(u64);

impl Token {
    /// Create a token from a raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw token value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}
