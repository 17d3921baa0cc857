//! Shared/exclusive lock

use std::fmt;

use super::{LockGuard, LockMode, NativeRwLock, RawRwLock};
use crate::error::{check_status, LockError};

/// Read/write lock: banyak reader bersamaan atau satu writer.
///
/// Native initialization can fail (pthread). The failure is logged and the
/// instance is marked uninitialized; operations are still forwarded to the
/// native primitive, so callers that care must check
/// [`RwLock::is_initialized`] themselves. An uninitialized lock skips
/// native teardown on drop.
pub struct RwLock {
    raw: NativeRwLock,
}

impl RwLock {
    pub fn new() -> Self {
        Self {
            raw: NativeRwLock::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.raw.is_initialized()
    }

    /// Block sampai exclusive ownership didapat.
    #[inline]
    pub fn lock_write(&self) -> Result<(), LockError> {
        check_status(self.raw.lock_write())
    }

    /// Block sampai shared ownership didapat.
    #[inline]
    pub fn lock_read(&self) -> Result<(), LockError> {
        check_status(self.raw.lock_read())
    }

    #[inline]
    pub fn try_lock_write(&self) -> bool {
        self.raw.try_lock_write()
    }

    #[inline]
    pub fn try_lock_read(&self) -> bool {
        self.raw.try_lock_read()
    }

    /// # Safety
    /// The calling thread must hold the lock in write mode.
    #[inline]
    pub unsafe fn unlock_write(&self) {
        unsafe { self.raw.unlock_write() }
    }

    /// # Safety
    /// The calling thread must hold the lock in read mode.
    #[inline]
    pub unsafe fn unlock_read(&self) {
        unsafe { self.raw.unlock_read() }
    }

    #[inline]
    pub fn read(&self) -> LockGuard<'_> {
        LockGuard::rw(Some(self), LockMode::Read)
    }

    #[inline]
    pub fn write(&self) -> LockGuard<'_> {
        LockGuard::rw(Some(self), LockMode::Write)
    }
}

impl Default for RwLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLock")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn try_read_elsewhere(lock: &RwLock) -> bool {
        thread::scope(|s| {
            s.spawn(|| {
                let ok = lock.try_lock_read();
                if ok {
                    unsafe { lock.unlock_read() };
                }
                ok
            })
            .join()
            .unwrap()
        })
    }

    fn try_write_elsewhere(lock: &RwLock) -> bool {
        thread::scope(|s| {
            s.spawn(|| {
                let ok = lock.try_lock_write();
                if ok {
                    unsafe { lock.unlock_write() };
                }
                ok
            })
            .join()
            .unwrap()
        })
    }

    #[test]
    fn test_readers_share() {
        let lock = RwLock::new();
        assert!(lock.is_initialized());

        lock.lock_read().unwrap();
        assert!(try_read_elsewhere(&lock));
        assert!(!try_write_elsewhere(&lock));
        unsafe { lock.unlock_read() };

        assert!(try_write_elsewhere(&lock));
    }

    #[test]
    fn test_writer_excludes_everyone() {
        let lock = RwLock::new();

        lock.lock_write().unwrap();
        assert!(!try_read_elsewhere(&lock));
        assert!(!try_write_elsewhere(&lock));
        unsafe { lock.unlock_write() };

        assert!(try_read_elsewhere(&lock));
        assert!(try_write_elsewhere(&lock));
    }

    #[cfg(unix)]
    #[test]
    fn test_relock_write_reports_native_status() {
        let lock = RwLock::new();
        lock.lock_write().unwrap();

        let err = lock.lock_write().unwrap_err();
        assert_eq!(err.status(), libc::EDEADLK);

        unsafe { lock.unlock_write() };
        assert!(try_write_elsewhere(&lock));
    }

    #[test]
    fn test_try_variants_on_free_lock() {
        let lock = RwLock::new();

        assert!(lock.try_lock_write());
        unsafe { lock.unlock_write() };

        assert!(lock.try_lock_read());
        assert!(lock.try_lock_read());
        unsafe {
            lock.unlock_read();
            lock.unlock_read();
        }

        assert!(lock.try_lock_write());
        unsafe { lock.unlock_write() };
    }
}
