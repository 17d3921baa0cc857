//! Sync module: native lock primitives dan scoped guard
//!
//! Prinsip desain:
//! - Satu tipe publik per jenis lock, backend dipilih saat build
//! - Unix: pthread via libc, platform lain: parking_lot raw locks
//! - Release dijamin oleh `Drop` pada [`LockGuard`]
//!
//! These are explicit lock/unlock primitives, not data-carrying locks:
//! they guard state that lives elsewhere (see `core::ArrayBuffer`).

mod guard;
mod mutex;
mod rwlock;

#[cfg(not(unix))]
mod portable;
#[cfg(unix)]
mod pthread;

pub use guard::{LockGuard, LockMode};
pub use mutex::Mutex;
pub use rwlock::RwLock;

#[cfg(unix)]
type NativeMutex = pthread::PthreadMutex;
#[cfg(unix)]
type NativeRwLock = pthread::PthreadRwLock;

#[cfg(not(unix))]
type NativeMutex = portable::ParkingMutex;
#[cfg(not(unix))]
type NativeRwLock = portable::ParkingRwLock;

/// Capability set of an exclusive lock backend.
///
/// Status codes follow pthread conventions: 0 is success.
pub(crate) trait RawMutex: Send + Sync + Sized {
    /// Initializes the native primitive. Failures are logged, never returned.
    fn new() -> Self;

    fn is_initialized(&self) -> bool;

    fn lock(&self) -> i32;

    fn try_lock(&self) -> bool;

    /// # Safety
    /// The calling thread must hold the lock.
    unsafe fn unlock(&self);
}

/// Capability set of a shared/exclusive lock backend.
pub(crate) trait RawRwLock: Send + Sync + Sized {
    fn new() -> Self;

    fn is_initialized(&self) -> bool;

    fn lock_read(&self) -> i32;

    fn lock_write(&self) -> i32;

    fn try_lock_read(&self) -> bool;

    fn try_lock_write(&self) -> bool;

    /// # Safety
    /// The calling thread must hold a shared lock.
    unsafe fn unlock_read(&self);

    /// # Safety
    /// The calling thread must hold the exclusive lock.
    unsafe fn unlock_write(&self);
}
