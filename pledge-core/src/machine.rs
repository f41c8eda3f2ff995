//! The task lifecycle state machine.
//!
//! ## Transitions
//!
//! ```text
//!            pause                    fulfill
//!   Running -------> Paused   Running --------> Fulfilled
//!   Running <------- Paused   Running | Paused --reject--> Rejected
//!            resume           Running | Paused --cancel--> Cancelled
//! ```
//!
//! Anything else is a no-op that reports `false`. Once settled, every
//! operation reports failure and the registries stay empty.
//!
//! ## Locking
//!
//! Each public operation holds the machine's reentrant lock from start to
//! finish. The `RefCell` borrow of the inner data is only held while reading
//! or mutating it, never while an observer, hook or closure runs, so those
//! callbacks are free to call back into the machine.

use crate::{
    config::{Hooks, MachineOptions, StateMachineBuilder},
    error::InitResumeError,
    registry::HandlerRegistry,
    state::{ErrorInfo, Outcome, Snapshot, State},
    CompletionHandler, HookFn, InitResumeFn, ProgressHandler, Token,
};
use core::{fmt, mem};
use pledge_sync::{ReentrantCell, ReentrantCellGuard};
use std::sync::Arc;
use tracing::{debug, trace};

/// Slot for the deferred start closure.
///
/// The first resume moves it to `Consumed` whether or not a closure was set,
/// so a closure runs at most once and cannot be assigned late.
enum InitResume {
    Unset,
    Pending(InitResumeFn),
    Consumed,
}

impl InitResume {
    fn take(&mut self) -> Option<InitResumeFn> {
        match mem::replace(self, Self::Consumed) {
            Self::Pending(init) => Some(init),
            Self::Unset | Self::Consumed => None,
        }
    }
}

struct Inner<T, E, P> {
    state: State,
    progress: Option<P>,
    value: Option<T>,
    error_info: Option<ErrorInfo<E>>,
    progress_handlers: HandlerRegistry<ProgressHandler<P>>,
    completion_handlers: HandlerRegistry<CompletionHandler>,
    init_resume: InitResume,
    hooks: Hooks,
}

impl<T, E, P> Inner<T, E, P> {
    fn transition(&mut self, to: State, from: &[State]) -> bool {
        if from.contains(&self.state) {
            trace!(from = %self.state, to = %to, "state transition");
            self.state = to;
            true
        } else {
            trace!(state = %self.state, attempted = %to, "transition rejected");
            false
        }
    }
}

type Guard<'a, T, E, P> = ReentrantCellGuard<'a, Inner<T, E, P>>;

/// Lifecycle state machine for a single deferred computation.
///
/// `T` is the success value, `E` the opaque error and `P` the progress type.
/// The machine is `Send + Sync` when all three are `Send`, and is usually
/// shared behind an [`Arc`] between the producer and its observers.
pub struct StateMachine<T, E, P = f64> {
    inner: ReentrantCell<Inner<T, E, P>>,
    weakified: bool,
}

impl<T, E, P> StateMachine<T, E, P> {
    /// Create a machine from options and producer hooks.
    pub fn new(options: MachineOptions, hooks: Hooks) -> Self {
        Self::with_init_resume(options, hooks, None)
    }

    /// Start building a machine.
    pub fn builder() -> StateMachineBuilder<T, E, P> {
        StateMachineBuilder::new()
    }

    pub(crate) fn with_init_resume(
        options: MachineOptions,
        hooks: Hooks,
        init_resume: Option<InitResumeFn>,
    ) -> Self {
        let state = if options.paused {
            State::Paused
        } else {
            State::Running
        };
        let init_resume = init_resume.map_or(InitResume::Unset, InitResume::Pending);

        Self {
            inner: ReentrantCell::new(Inner {
                state,
                progress: None,
                value: None,
                error_info: None,
                progress_handlers: HandlerRegistry::new(),
                completion_handlers: HandlerRegistry::new(),
                init_resume,
                hooks,
            }),
            weakified: options.weakified,
        }
    }

    /// Assign the closure run by the first [`handle_resume`](Self::handle_resume).
    ///
    /// # Errors
    ///
    /// Fails if a closure is already assigned, or if the slot was consumed by
    /// a previous resume or by the machine settling. The rejected closure is
    /// dropped without running.
    pub fn set_init_resume<F>(&self, init: F) -> Result<(), InitResumeError>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let result = match inner.init_resume {
            InitResume::Unset => Ok(()),
            InitResume::Pending(_) => Err(InitResumeError::AlreadyAssigned),
            InitResume::Consumed => Err(InitResumeError::AlreadyConsumed),
        };
        if result.is_ok() {
            inner.init_resume = InitResume::Pending(Box::new(init));
        }
        result
    }

    /// Whether a deferred start closure is still waiting to run.
    #[must_use]
    pub fn has_init_resume(&self) -> bool {
        self.inner
            .with(|inner| matches!(inner.init_resume, InitResume::Pending(_)))
    }

    /// Whether progress values are discarded instead of stored.
    #[must_use]
    pub fn is_weakified(&self) -> bool {
        self.weakified
    }

    /// The current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.inner.with(|inner| inner.state)
    }

    /// Register a progress observer.
    ///
    /// Returns `None` once the machine has settled; the observer is dropped
    /// and never called. Missed progress is never replayed.
    pub fn add_progress_handler<F>(&self, handler: F) -> Option<Token>
    where
        F: Fn(Option<&P>, &P) + Send + Sync + 'static,
    {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        if inner.state.is_terminal() {
            trace!(state = %inner.state, "progress handler refused");
            return None;
        }
        let token = inner.progress_handlers.insert(Arc::new(handler));
        trace!(%token, "progress handler added");
        Some(token)
    }

    /// Remove a progress observer. Stale tokens report `false`.
    pub fn remove_progress_handler(&self, token: Token) -> bool {
        let guard = self.inner.lock();
        let removed = guard.borrow_mut().progress_handlers.remove(token);
        let found = removed.is_some();
        drop(removed);
        if found {
            trace!(%token, "progress handler removed");
        }
        found
    }

    /// Register an observer fired once when the machine settles.
    ///
    /// Returns `None` once the machine has settled; the caller must check
    /// [`state`](Self::state) itself if it needs the outcome immediately.
    pub fn add_completion_handler<F>(&self, handler: F) -> Option<Token>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        if inner.state.is_terminal() {
            trace!(state = %inner.state, "completion handler refused");
            return None;
        }
        let token = inner.completion_handlers.insert(Box::new(handler));
        trace!(%token, "completion handler added");
        Some(token)
    }

    /// Remove a completion observer. Stale tokens report `false`.
    pub fn remove_completion_handler(&self, token: Token) -> bool {
        let guard = self.inner.lock();
        let removed = guard.borrow_mut().completion_handlers.remove(token);
        let found = removed.is_some();
        drop(removed);
        if found {
            trace!(%token, "completion handler removed");
        }
        found
    }

    /// Number of registered progress observers.
    #[must_use]
    pub fn progress_handler_count(&self) -> usize {
        self.inner.with(|inner| inner.progress_handlers.len())
    }

    /// Number of registered completion observers.
    #[must_use]
    pub fn completion_handler_count(&self) -> usize {
        self.inner.with(|inner| inner.completion_handlers.len())
    }

    /// Settle as fulfilled. Only legal while running.
    pub fn handle_fulfill(&self, value: T) -> bool {
        let guard = self.inner.lock();
        {
            let mut inner = guard.borrow_mut();
            if !inner.transition(State::Fulfilled, &[State::Running]) {
                return false;
            }
            inner.value = Some(value);
        }
        Self::finish(&guard);
        true
    }

    /// Settle as rejected, or as cancelled when `info.is_cancelled` is set.
    ///
    /// Legal while running or paused.
    pub fn handle_reject_info(&self, info: ErrorInfo<E>) -> bool {
        let guard = self.inner.lock();
        {
            let mut inner = guard.borrow_mut();
            if !inner.transition(info.target_state(), &[State::Running, State::Paused]) {
                return false;
            }
            inner.error_info = Some(info);
        }
        Self::finish(&guard);
        true
    }

    /// Settle as rejected with `error`.
    pub fn handle_reject(&self, error: E) -> bool {
        self.handle_reject_info(ErrorInfo::rejected(error))
    }

    /// Settle as cancelled. Legal while running or paused.
    pub fn handle_cancel(&self, error: Option<E>) -> bool {
        self.handle_reject_info(ErrorInfo::cancelled(error))
    }

    /// Enter the paused state, running the pause hook first.
    ///
    /// Only legal while running. If the hook itself settles or pauses the
    /// machine, the transition is abandoned and this reports `false`.
    pub fn handle_pause(&self) -> bool {
        let guard = self.inner.lock();
        let hook = {
            let inner = guard.borrow();
            if inner.state != State::Running {
                trace!(state = %inner.state, "pause ignored");
                return false;
            }
            inner.hooks.pause.clone()
        };
        Self::run_hook(hook);
        let paused = guard
            .borrow_mut()
            .transition(State::Paused, &[State::Running]);
        paused
    }

    /// Resume a paused machine.
    ///
    /// The first call consumes the init-resume closure before anything else.
    /// If the machine is paused at that point it is switched to running for
    /// the duration of the closure, so the closure can report progress or
    /// settle the task; if it does not settle, the machine goes back to
    /// paused and the normal resume follows.
    ///
    /// The normal resume is only legal while paused: it runs the resume hook
    /// and switches to running. When the init closure already settled the
    /// task, this reports `false` even though the closure ran.
    pub fn handle_resume(&self) -> bool {
        let guard = self.inner.lock();
        Self::init_resume_if_needed(&guard);

        let hook = {
            let inner = guard.borrow();
            if inner.state != State::Paused {
                trace!(state = %inner.state, "resume ignored");
                return false;
            }
            inner.hooks.resume.clone()
        };
        Self::run_hook(hook);
        let resumed = guard
            .borrow_mut()
            .transition(State::Running, &[State::Paused]);
        resumed
    }

    fn init_resume_if_needed(guard: &Guard<'_, T, E, P>) {
        let (init, forced) = {
            let mut inner = guard.borrow_mut();
            // Settled machines release the closure in `finish` without running it.
            if inner.state.is_terminal() {
                return;
            }
            let Some(init) = inner.init_resume.take() else {
                return;
            };
            let forced = inner.state == State::Paused;
            if forced {
                inner.state = State::Running;
            }
            (init, forced)
        };

        debug!(forced, "running init-resume closure");
        init();

        if forced {
            let mut inner = guard.borrow_mut();
            if inner.state == State::Running {
                inner.state = State::Paused;
            }
        }
    }

    fn run_hook(hook: Option<HookFn>) {
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Terminal cleanup, run once right after the settling transition.
    fn finish(guard: &Guard<'_, T, E, P>) {
        let (completion, progress_handlers, state) = {
            let mut inner = guard.borrow_mut();
            (
                inner.completion_handlers.take(),
                inner.progress_handlers.take(),
                inner.state,
            )
        };
        debug!(%state, handlers = completion.len(), "finishing");

        for (_, handler) in completion {
            handler();
        }
        drop(progress_handlers);

        let finish = guard.borrow_mut().hooks.finish.take();
        if let Some(finish) = finish {
            finish();
        }

        let released = {
            let mut inner = guard.borrow_mut();
            (
                inner.init_resume.take(),
                inner.hooks.pause.take(),
                inner.hooks.resume.take(),
                inner.progress.take(),
            )
        };
        drop(released);
    }
}

impl<T, E, P: Clone> StateMachine<T, E, P> {
    /// Report progress to every observer, in registration order.
    ///
    /// Only delivered while running; otherwise the value is dropped and this
    /// reports `false`. Observers receive the previously stored progress
    /// (always `None` when weakified) and the new value. An observer removed
    /// by an earlier observer in the same broadcast is skipped; if an earlier
    /// observer pauses or settles the machine, delivery stops for all the
    /// remaining ones.
    pub fn handle_progress(&self, progress: P) -> bool {
        let guard = self.inner.lock();
        let (previous, handlers) = {
            let mut inner = guard.borrow_mut();
            if inner.state != State::Running {
                trace!(state = %inner.state, "progress dropped");
                return false;
            }
            let previous = if self.weakified {
                None
            } else {
                inner.progress.replace(progress.clone())
            };
            (previous, inner.progress_handlers.snapshot())
        };

        for (token, handler) in handlers {
            let live = {
                let inner = guard.borrow();
                inner.state == State::Running && inner.progress_handlers.contains(token)
            };
            if live {
                handler(previous.as_ref(), &progress);
            }
        }
        true
    }

    /// The latest stored progress.
    #[must_use]
    pub fn progress(&self) -> Option<P> {
        self.inner.with(|inner| inner.progress.clone())
    }
}

impl<T: Clone, E, P> StateMachine<T, E, P> {
    /// The success value, once fulfilled.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.inner.with(|inner| inner.value.clone())
    }
}

impl<T, E: Clone, P> StateMachine<T, E, P> {
    /// The failure info, once rejected or cancelled.
    #[must_use]
    pub fn error_info(&self) -> Option<ErrorInfo<E>> {
        self.inner.with(|inner| inner.error_info.clone())
    }
}

impl<T: Clone, E: Clone, P> StateMachine<T, E, P> {
    /// The settled result, or `None` while running or paused.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome<T, E>> {
        self.inner.with(|inner| match inner.state {
            State::Running | State::Paused => None,
            State::Fulfilled => inner.value.clone().map(Outcome::Fulfilled),
            State::Rejected => Some(Outcome::Rejected(
                inner.error_info.as_ref().and_then(|info| info.error.clone()),
            )),
            State::Cancelled => Some(Outcome::Cancelled(
                inner.error_info.as_ref().and_then(|info| info.error.clone()),
            )),
        })
    }
}

impl<T: Clone, E: Clone, P: Clone> StateMachine<T, E, P> {
    /// State and result slots captured under one lock hold.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T, E, P> {
        self.inner.with(|inner| Snapshot {
            state: inner.state,
            progress: inner.progress.clone(),
            value: inner.value.clone(),
            error_info: inner.error_info.clone(),
        })
    }
}

impl<T, E, P> fmt::Debug for StateMachine<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("StateMachine");
        d.field("weakified", &self.weakified);
        let Some(guard) = self.inner.try_lock() else {
            return d.field("state", &format_args!("<locked>")).finish();
        };
        let state = guard.try_borrow().map(|inner| inner.state);
        match state {
            Some(state) => d.field("state", &state).finish(),
            None => d.field("state", &format_args!("<borrowed>")).finish(),
        }
    }
}
