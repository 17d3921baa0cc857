//! arraybuf - Thread-safe byte ring buffer untuk streaming pipeline
//!
//! Arsitektur:
//! - `sync`: Mutex, RwLock, dan LockGuard di atas native primitives
//! - `core`: ArrayBuffer, hand-off producer/consumer dengan copy-in/copy-out
//! - `log`: logging service yang di-inject, bukan global tersembunyi
//!
//! Overflow ditolak, bukan overwrite: `put` yang tidak muat tidak menulis
//! apa pun dan mengembalikan error.

pub mod core;
pub mod error;
pub mod log;
pub mod sync;

pub use crate::core::ArrayBuffer;
pub use crate::error::{ArrayBufferError, LockError, LogError};
pub use crate::sync::{LockGuard, LockMode, Mutex, RwLock};
