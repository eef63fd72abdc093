//! A lock for state shared between thread mode and the engine interrupt.
//!
//! Used for the completion wakers, and handy for parking a [`crate::Ppe`]
//! where both application code and a handler can reach it.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// Guards a `T` with a single atomic flag.
///
/// Taking the lock never blocks: [`SpinLock::try_lock`] fails when the lock
/// is held. An interrupt handler must only ever `try_lock`, since the holder
/// it interrupted cannot make progress until the handler returns.
/// [`SpinLock::lock`] spins and is for thread mode only.
#[derive(Debug)]
pub struct SpinLock<T: ?Sized> {
    held: AtomicBool,
    value: UnsafeCell<T>,
}

unsafe impl<T: Send + ?Sized> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        SpinLock {
            held: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }
}

/// The lock was held by someone else.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Contended;

impl<T: ?Sized + Send> SpinLock<T> {
    pub fn try_lock(&self) -> Result<SpinLockGuard<'_, T>, Contended> {
        if self.held.swap(true, Ordering::Acquire) {
            return Err(Contended);
        }
        // We saw the false->true transition, so nobody else holds a
        // reference until the guard releases the flag.
        Ok(SpinLockGuard {
            held: &self.held,
            // Safety: locked above.
            value: unsafe { &mut *self.value.get() },
        })
    }

    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        loop {
            if let Ok(guard) = self.try_lock() {
                return guard;
            }
            core::hint::spin_loop();
        }
    }

    /// Runs `f` on the contents if the lock is free.
    pub fn try_with<R>(
        &self,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, Contended> {
        self.try_lock().map(|mut g| f(&mut g))
    }
}

#[must_use = "if dropped, the lock is released immediately"]
#[derive(Debug)]
pub struct SpinLockGuard<'a, T: ?Sized> {
    held: &'a AtomicBool,
    value: &'a mut T,
}

impl<'a, T: ?Sized> core::ops::Deref for SpinLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.value
    }
}

impl<'a, T: ?Sized> core::ops::DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value
    }
}

impl<'a, T: ?Sized> Drop for SpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
