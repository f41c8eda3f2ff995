//! Synchronization primitives for the Pledge task state machine.
//!
//! The state machine must tolerate callbacks that call straight back into the
//! instance that invoked them, on the same thread, while the instance still
//! holds its lock. [`ReentrantCell`] provides exactly that: a reentrant mutex
//! serializing threads, wrapped around a `RefCell` that hands out short-lived
//! borrows of the protected data.
//!
//! The rule for callers is simple: hold the guard for the whole operation,
//! but never hold a `borrow()`/`borrow_mut()` across a call into foreign code.

#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use core::{
    cell::{Ref, RefCell, RefMut},
    fmt,
};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// A mutual exclusion cell that the owning thread may lock again.
///
/// Other threads block in [`lock`](Self::lock) until every guard held by the
/// owning thread has been dropped.
pub struct ReentrantCell<T> {
    inner: ReentrantMutex<RefCell<T>>,
}

/// RAII guard returned by [`ReentrantCell::lock`].
///
/// Holding the guard excludes other threads. Access to the data goes through
/// [`borrow`](Self::borrow) and [`borrow_mut`](Self::borrow_mut), which follow
/// the usual `RefCell` rules for the current thread.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReentrantCellGuard<'a, T> {
    inner: ReentrantMutexGuard<'a, RefCell<T>>,
}

impl<T> ReentrantCell<T> {
    /// Create a new cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    /// Acquire the lock, blocking while another thread holds it.
    ///
    /// Returns immediately if the current thread already holds it.
    pub fn lock(&self) -> ReentrantCellGuard<'_, T> {
        ReentrantCellGuard {
            inner: self.inner.lock(),
        }
    }

    /// Try to acquire the lock without blocking.
    pub fn try_lock(&self) -> Option<ReentrantCellGuard<'_, T>> {
        self.inner
            .try_lock()
            .map(|inner| ReentrantCellGuard { inner })
    }

    /// Check whether any thread currently holds the lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Check whether the current thread holds the lock.
    #[must_use]
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.inner.is_owned_by_current_thread()
    }

    /// Run `f` with shared access to the data.
    ///
    /// # Panics
    ///
    /// Panics if the current thread holds a mutable borrow.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.lock();
        let data = guard.borrow();
        f(&data)
    }

    /// Run `f` with exclusive access to the data.
    ///
    /// # Panics
    ///
    /// Panics if the current thread holds any borrow.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let guard = self.lock();
        let mut data = guard.borrow_mut();
        f(&mut data)
    }

    /// Get mutable access without locking; the borrow checker proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut().get_mut()
    }

    /// Consume the cell and return the data.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().into_inner()
    }
}

impl<T: Default> Default for ReentrantCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for ReentrantCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ReentrantCell");
        let Some(guard) = self.try_lock() else {
            return d.field("data", &format_args!("<locked>")).finish();
        };
        let rendered = match guard.try_borrow() {
            Some(data) => d.field("data", &&*data).finish(),
            None => d.field("data", &format_args!("<borrowed>")).finish(),
        };
        rendered
    }
}

impl<T> ReentrantCellGuard<'_, T> {
    /// Borrow the protected data.
    ///
    /// # Panics
    ///
    /// Panics if the current thread holds a mutable borrow.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    /// Mutably borrow the protected data.
    ///
    /// # Panics
    ///
    /// Panics if the current thread holds any borrow.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Borrow the protected data unless the current thread holds a mutable borrow.
    pub fn try_borrow(&self) -> Option<Ref<'_, T>> {
        self.inner.try_borrow().ok()
    }
}
