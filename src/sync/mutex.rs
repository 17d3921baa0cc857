//! Non-reentrant exclusive lock

use std::fmt;

use super::{LockGuard, NativeMutex, RawMutex};
use crate::error::{check_status, LockError};

/// Exclusive lock dengan `lock` / `try_lock` / `unlock` eksplisit.
///
/// Non-reentrant: locking twice from the same thread deadlocks. There is
/// no timeout variant. If native initialization failed the failure has
/// already been logged and the lock is unusable; check
/// [`Mutex::is_initialized`] when that matters.
///
/// Prefer [`Mutex::guard`] over manual pairing.
pub struct Mutex {
    raw: NativeMutex,
}

impl Mutex {
    pub fn new() -> Self {
        Self {
            raw: NativeMutex::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.raw.is_initialized()
    }

    /// Block sampai lock dipegang thread ini.
    #[inline]
    pub fn lock(&self) -> Result<(), LockError> {
        check_status(self.raw.lock())
    }

    /// Non-blocking acquire. Returns `true` jika berhasil.
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    /// Release the lock.
    ///
    /// # Safety
    /// The calling thread must hold the lock through a successful
    /// [`lock`](Self::lock) or [`try_lock`](Self::try_lock) that has not
    /// been released yet.
    #[inline]
    pub unsafe fn unlock(&self) {
        unsafe { self.raw.unlock() }
    }

    /// Acquire the lock for the lifetime of the returned guard.
    #[inline]
    pub fn guard(&self) -> LockGuard<'_> {
        LockGuard::mutex(Some(self))
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_lock_unlock() {
        let m = Mutex::new();
        assert!(m.is_initialized());

        m.lock().unwrap();
        unsafe { m.unlock() };

        assert!(m.try_lock());
        unsafe { m.unlock() };
    }

    #[test]
    fn test_try_lock_fails_while_held() {
        let m = Mutex::new();
        m.lock().unwrap();

        thread::scope(|s| {
            assert!(!s.spawn(|| m.try_lock()).join().unwrap());
        });

        unsafe { m.unlock() };

        thread::scope(|s| {
            let acquired = s
                .spawn(|| {
                    let ok = m.try_lock();
                    if ok {
                        unsafe { m.unlock() };
                    }
                    ok
                })
                .join()
                .unwrap();
            assert!(acquired);
        });
    }

    #[test]
    fn test_mutual_exclusion() {
        const THREADS: usize = 4;
        const ROUNDS: usize = 10_000;

        let m = Mutex::new();
        // Non-atomic read-modify-write, only correct under the lock
        let counter = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..ROUNDS {
                        let _guard = m.guard();
                        let v = counter.load(Ordering::Relaxed);
                        counter.store(v + 1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(counter.load(Ordering::Relaxed), THREADS * ROUNDS);
    }
}
