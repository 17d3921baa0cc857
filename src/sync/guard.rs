//! Scoped lock guard
//!
//! Guard mengikat satu lock saat dibuat dan melepasnya di `Drop`,
//! apapun jalur keluarnya (return normal, early return, `?`, panic).

use std::marker::PhantomData;

use tracing::error;

use super::{Mutex, RwLock};

/// Mode akuisisi untuk [`RwLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

enum Held<'a> {
    Mutex(&'a Mutex),
    Rw(&'a RwLock, LockMode),
}

/// A single, non-transferable lock acquisition.
///
/// Passing `None` builds a no-op guard: nothing is acquired and nothing
/// is released, so call sites can hand over an optional lock without
/// branching. A failed native acquire is logged and the guard records
/// that nothing is held, so drop never unlocks a lock it did not take.
///
/// The guard is neither `Clone` nor `Send`: pthread locks must be
/// released by the thread that acquired them.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    held: Option<Held<'a>>,
    _not_send: PhantomData<*const ()>,
}

impl<'a> LockGuard<'a> {
    /// Bind to an exclusive lock and block until it is acquired.
    pub fn mutex(lock: Option<&'a Mutex>) -> Self {
        let held = lock.and_then(|m| match m.lock() {
            Ok(()) => Some(Held::Mutex(m)),
            Err(err) => {
                error!(status = err.status(), "mutex lock failure, ret={}", err.status());
                None
            }
        });

        Self {
            held,
            _not_send: PhantomData,
        }
    }

    /// Bind to a read/write lock in the given mode and block until acquired.
    pub fn rw(lock: Option<&'a RwLock>, mode: LockMode) -> Self {
        let held = lock.and_then(|l| {
            let ret = match mode {
                LockMode::Write => l.lock_write(),
                LockMode::Read => l.lock_read(),
            };
            match ret {
                Ok(()) => Some(Held::Rw(l, mode)),
                Err(err) => {
                    error!(
                        status = err.status(),
                        ?mode,
                        "rwlock lock failure, ret={}",
                        err.status()
                    );
                    None
                }
            }
        });

        Self {
            held,
            _not_send: PhantomData,
        }
    }

    /// `true` jika akuisisi berhasil dan lock masih dipegang guard ini.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.held.is_some()
    }

    /// Mode yang dipegang. `None` untuk mutex atau guard kosong.
    pub fn mode(&self) -> Option<LockMode> {
        match self.held {
            Some(Held::Rw(_, mode)) => Some(mode),
            _ => None,
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: `held` is only set after a successful acquire by this
        // thread (the guard is !Send), and is taken exactly once here.
        match self.held.take() {
            Some(Held::Mutex(m)) => unsafe { m.unlock() },
            Some(Held::Rw(l, LockMode::Write)) => unsafe { l.unlock_write() },
            Some(Held::Rw(l, LockMode::Read)) => unsafe { l.unlock_read() },
            None => {}
        }
    }
}
