//! parking_lot backend untuk target non-Unix
//!
//! Akuisisi tidak pernah gagal, jadi status selalu 0.

use parking_lot::lock_api;

use super::{RawMutex, RawRwLock};

pub(crate) struct ParkingMutex(parking_lot::RawMutex);

impl RawMutex for ParkingMutex {
    fn new() -> Self {
        Self(<parking_lot::RawMutex as lock_api::RawMutex>::INIT)
    }

    fn is_initialized(&self) -> bool {
        true
    }

    #[inline]
    fn lock(&self) -> i32 {
        lock_api::RawMutex::lock(&self.0);
        0
    }

    #[inline]
    fn try_lock(&self) -> bool {
        lock_api::RawMutex::try_lock(&self.0)
    }

    #[inline]
    unsafe fn unlock(&self) {
        unsafe { lock_api::RawMutex::unlock(&self.0) }
    }
}

pub(crate) struct ParkingRwLock(parking_lot::RawRwLock);

impl RawRwLock for ParkingRwLock {
    fn new() -> Self {
        Self(<parking_lot::RawRwLock as lock_api::RawRwLock>::INIT)
    }

    fn is_initialized(&self) -> bool {
        true
    }

    #[inline]
    fn lock_read(&self) -> i32 {
        lock_api::RawRwLock::lock_shared(&self.0);
        0
    }

    #[inline]
    fn lock_write(&self) -> i32 {
        lock_api::RawRwLock::lock_exclusive(&self.0);
        0
    }

    #[inline]
    fn try_lock_read(&self) -> bool {
        lock_api::RawRwLock::try_lock_shared(&self.0)
    }

    #[inline]
    fn try_lock_write(&self) -> bool {
        lock_api::RawRwLock::try_lock_exclusive(&self.0)
    }

    #[inline]
    unsafe fn unlock_read(&self) {
        unsafe { lock_api::RawRwLock::unlock_shared(&self.0) }
    }

    #[inline]
    unsafe fn unlock_write(&self) {
        unsafe { lock_api::RawRwLock::unlock_exclusive(&self.0) }
    }
}
