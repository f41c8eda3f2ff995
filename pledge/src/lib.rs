//! # Pledge
//!
//! Pledge is the lifecycle core of a deferred-computation ("task" or
//! "promise") abstraction. A [`StateMachine`] tracks one computation from
//! running (or paused) to exactly one terminal outcome, fans progress and
//! completion out to observers, and drives the producer's pause/resume hooks.
//!
//! Chaining combinators, task handles and executor policy live above this
//! crate; they talk to the machine through the operations re-exported here.
//!
//! ## Features
//!
//! - **Exactly-once settlement**: fulfill, reject and cancel race safely; the
//!   first one wins and the rest report `false`
//! - **Ordered observers**: progress and completion handlers run in
//!   registration order and can be removed by [`Token`]
//! - **Lazy start**: an init-resume closure runs on the first resume, before
//!   the producer's resume hook
//! - **Reentrant**: handlers and hooks may call back into the machine that is
//!   invoking them
//!
//! ## Example
//!
//! ```rust
//! use pledge::prelude::*;
//! use std::sync::Arc;
//!
//! let machine: Arc<StateMachine<&'static str, String>> =
//!     Arc::new(StateMachine::builder().paused().build(|| {}));
//!
//! // The producer starts working on the first resume.
//! let producer = Arc::downgrade(&machine);
//! machine
//!     .set_init_resume(move || {
//!         if let Some(machine) = producer.upgrade() {
//!             machine.handle_progress(1.0);
//!             machine.handle_fulfill("done");
//!         }
//!     })
//!     .unwrap();
//!
//! // The init closure settled the task, so there was nothing left to resume.
//! assert!(!machine.handle_resume());
//! assert_eq!(machine.outcome(), Some(Outcome::Fulfilled("done")));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

// Re-export core functionality
pub use pledge_core::{
    config, error, machine, state, CompletionHandler, ErrorInfo, FinishFn, HookFn, Hooks,
    InitResumeError, InitResumeFn, MachineOptions, Outcome, ProgressHandler, Snapshot, State,
    StateMachine, StateMachineBuilder, Token,
};

// Re-export synchronization primitives
pub use pledge_sync::{ReentrantCell, ReentrantCellGuard};

/// The types most code needs, for glob import.
pub mod prelude {
    pub use crate::{ErrorInfo, Hooks, MachineOptions, Outcome, State, StateMachine, Token};
}
