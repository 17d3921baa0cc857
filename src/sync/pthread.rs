//! pthread backend (Unix)
//!
//! Native object di-box supaya alamatnya tidak pernah berpindah
//! setelah `pthread_*_init`.

use std::cell::UnsafeCell;
use std::ptr;

use tracing::error;

use super::{RawMutex, RawRwLock};

pub(crate) struct PthreadMutex {
    inner: Box<UnsafeCell<libc::pthread_mutex_t>>,
    inited: bool,
}

// SAFETY: pthread mutexes are designed to be shared between threads and
// the boxed object is never moved after init.
unsafe impl Send for PthreadMutex {}
unsafe impl Sync for PthreadMutex {}

impl RawMutex for PthreadMutex {
    fn new() -> Self {
        let inner = Box::new(UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER));

        // SAFETY: `inner` is heap allocated and not shared yet
        let ret = unsafe { libc::pthread_mutex_init(inner.get(), ptr::null()) };
        if ret != 0 {
            error!(status = ret, "pthread_mutex_init failed, ret={}", ret);
        }

        Self {
            inner,
            inited: ret == 0,
        }
    }

    fn is_initialized(&self) -> bool {
        self.inited
    }

    #[inline]
    fn lock(&self) -> i32 {
        unsafe { libc::pthread_mutex_lock(self.inner.get()) }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        unsafe { libc::pthread_mutex_trylock(self.inner.get()) == 0 }
    }

    #[inline]
    unsafe fn unlock(&self) {
        let ret = unsafe { libc::pthread_mutex_unlock(self.inner.get()) };
        if ret != 0 {
            error!(status = ret, "pthread_mutex_unlock failed, ret={}", ret);
        }
    }
}

impl Drop for PthreadMutex {
    fn drop(&mut self) {
        if !self.inited {
            return;
        }
        // SAFETY: `&mut self` means no guard can still reference the mutex
        let ret = unsafe { libc::pthread_mutex_destroy(self.inner.get()) };
        if ret != 0 {
            error!(status = ret, "pthread_mutex_destroy failed, ret={}", ret);
        }
    }
}

pub(crate) struct PthreadRwLock {
    inner: Box<UnsafeCell<libc::pthread_rwlock_t>>,
    inited: bool,
}

// SAFETY: same reasoning as PthreadMutex
unsafe impl Send for PthreadRwLock {}
unsafe impl Sync for PthreadRwLock {}

impl RawRwLock for PthreadRwLock {
    fn new() -> Self {
        let inner = Box::new(UnsafeCell::new(libc::PTHREAD_RWLOCK_INITIALIZER));

        // SAFETY: `inner` is heap allocated and not shared yet
        let ret = unsafe { libc::pthread_rwlock_init(inner.get(), ptr::null()) };
        if ret != 0 {
            error!(status = ret, "pthread_rwlock_init failed, ret={}", ret);
        }

        Self {
            inner,
            inited: ret == 0,
        }
    }

    fn is_initialized(&self) -> bool {
        self.inited
    }

    #[inline]
    fn lock_read(&self) -> i32 {
        unsafe { libc::pthread_rwlock_rdlock(self.inner.get()) }
    }

    #[inline]
    fn lock_write(&self) -> i32 {
        unsafe { libc::pthread_rwlock_wrlock(self.inner.get()) }
    }

    #[inline]
    fn try_lock_read(&self) -> bool {
        unsafe { libc::pthread_rwlock_tryrdlock(self.inner.get()) == 0 }
    }

    #[inline]
    fn try_lock_write(&self) -> bool {
        unsafe { libc::pthread_rwlock_trywrlock(self.inner.get()) == 0 }
    }

    // pthread uses a single unlock call for both modes
    #[inline]
    unsafe fn unlock_read(&self) {
        unsafe { self.release() }
    }

    #[inline]
    unsafe fn unlock_write(&self) {
        unsafe { self.release() }
    }
}

impl PthreadRwLock {
    unsafe fn release(&self) {
        let ret = unsafe { libc::pthread_rwlock_unlock(self.inner.get()) };
        if ret != 0 {
            error!(status = ret, "pthread_rwlock_unlock failed, ret={}", ret);
        }
    }
}

impl Drop for PthreadRwLock {
    fn drop(&mut self) {
        // Destroying an invalid handle is undefined behavior
        if !self.inited {
            return;
        }
        let ret = unsafe { libc::pthread_rwlock_destroy(self.inner.get()) };
        if ret != 0 {
            error!(status = ret, "pthread_rwlock_destroy failed, ret={}", ret);
        }
    }
}
