//! Construction-time configuration: options, producer hooks and the builder.

use crate::{FinishFn, HookFn, InitResumeFn, StateMachine};
use core::{fmt, marker::PhantomData};
use std::sync::Arc;

/// Flags fixed for the lifetime of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineOptions {
    /// Never retain progress values, so they cannot extend any lifetime.
    pub weakified: bool,
    /// Start in [`State::Paused`](crate::State::Paused) instead of running.
    pub paused: bool,
}

impl MachineOptions {
    /// Default options: retaining progress, starting in the running state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            weakified: false,
            paused: false,
        }
    }

    /// Set whether progress values are retained.
    #[must_use]
    pub const fn with_weakified(mut self, weakified: bool) -> Self {
        self.weakified = weakified;
        self
    }

    /// Set whether the machine starts paused.
    #[must_use]
    pub const fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

/// The producer's side of the lifecycle.
///
/// `pause` and `resume` are optional and run at the matching transitions;
/// `finish` is mandatory and runs exactly once, when the machine settles.
/// All hooks run under the machine's lock on the caller's thread.
pub struct Hooks {
    pub(crate) pause: Option<HookFn>,
    pub(crate) resume: Option<HookFn>,
    pub(crate) finish: Option<FinishFn>,
}

impl Hooks {
    /// Hooks with only the mandatory finish hook.
    pub fn new<F>(finish: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            pause: None,
            resume: None,
            finish: Some(Box::new(finish)),
        }
    }

    /// Set the hook run before entering the paused state.
    #[must_use]
    pub fn on_pause<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.pause = Some(Arc::new(hook));
        self
    }

    /// Set the hook run before leaving the paused state.
    #[must_use]
    pub fn on_resume<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.resume = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("pause", &self.pause.is_some())
            .field("resume", &self.resume.is_some())
            .field("finish", &self.finish.is_some())
            .finish()
    }
}

/// Builder for [`StateMachine`].
///
/// ```rust
/// use pledge_core::{State, StateMachine};
///
/// let machine: StateMachine<(), ()> = StateMachine::builder()
///     .paused()
///     .weakified()
///     .on_resume(|| println!("resumed"))
///     .build(|| println!("finished"));
///
/// assert_eq!(machine.state(), State::Paused);
/// assert!(machine.is_weakified());
/// ```
#[must_use]
pub struct StateMachineBuilder<T, E, P = f64> {
    options: MachineOptions,
    pause: Option<HookFn>,
    resume: Option<HookFn>,
    init_resume: Option<InitResumeFn>,
    _marker: PhantomData<fn() -> (T, E, P)>,
}

impl<T, E, P> StateMachineBuilder<T, E, P> {
    /// A builder with default options and no hooks.
    pub fn new() -> Self {
        Self {
            options: MachineOptions::new(),
            pause: None,
            resume: None,
            init_resume: None,
            _marker: PhantomData,
        }
    }

    /// Replace all options at once.
    pub fn options(mut self, options: MachineOptions) -> Self {
        self.options = options;
        self
    }

    /// Start in the paused state.
    pub fn paused(mut self) -> Self {
        self.options.paused = true;
        self
    }

    /// Never retain progress values.
    pub fn weakified(mut self) -> Self {
        self.options.weakified = true;
        self
    }

    /// Set the pause hook.
    pub fn on_pause<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.pause = Some(Arc::new(hook));
        self
    }

    /// Set the resume hook.
    pub fn on_resume<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.resume = Some(Arc::new(hook));
        self
    }

    /// Set the closure consumed by the first resume.
    pub fn init_resume<F>(mut self, init: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.init_resume = Some(Box::new(init));
        self
    }

    /// Build the machine with its mandatory finish hook.
    pub fn build<F>(self, finish: F) -> StateMachine<T, E, P>
    where
        F: FnOnce() + Send + 'static,
    {
        let hooks = Hooks {
            pause: self.pause,
            resume: self.resume,
            finish: Some(Box::new(finish)),
        };
        StateMachine::with_init_resume(self.options, hooks, self.init_resume)
    }
}

impl<T, E, P> Default for StateMachineBuilder<T, E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E, P> fmt::Debug for StateMachineBuilder<T, E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachineBuilder")
            .field("options", &self.options)
            .field("pause", &self.pause.is_some())
            .field("resume", &self.resume.is_some())
            .field("init_resume", &self.init_resume.is_some())
            .finish()
    }
}
