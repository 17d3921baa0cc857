//! Error types untuk lock primitives, array buffer, dan logging service.
//!
//! Semua kegagalan bersifat lokal dan dikembalikan lewat `Result`.
//! Tidak ada yang di-throw melewati public API.

use std::io;

use thiserror::Error;

/// Native lock call returned a nonzero OS status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("native lock operation failed, status={status}")]
pub struct LockError {
    status: i32,
}

impl LockError {
    pub(crate) const fn new(status: i32) -> Self {
        Self { status }
    }

    /// Raw status code returned by the native primitive (never 0).
    pub const fn status(&self) -> i32 {
        self.status
    }
}

/// Converts a pthread-style status code into a `Result`.
pub(crate) fn check_status(status: i32) -> Result<(), LockError> {
    if status == 0 {
        Ok(())
    } else {
        Err(LockError::new(status))
    }
}

/// Capacity and precondition errors reported by [`crate::core::ArrayBuffer`].
///
/// A failed call never mutates the buffer. Whether a rejection is fatal,
/// retried, or dropped is up to the caller.
#[derive(Debug, Error)]
pub enum ArrayBufferError {
    /// `put`/`get` before `set_size`.
    #[error("array buffer has no backing store, call set_size first")]
    Unsized,

    /// `put` with zero bytes.
    #[error("nothing to put, input is empty")]
    EmptyInput,

    /// `put` larger than the free space. Unread bytes are never overwritten.
    #[error("insufficient space: requested {requested} bytes, {available} available")]
    InsufficientSpace { requested: usize, available: usize },

    /// `set_size(0)`.
    #[error("buffer size must be greater than zero")]
    InvalidSize,

    /// The internal mutex could not be acquired.
    #[error("internal lock unavailable")]
    LockUnavailable,

    /// Backing store allocation failed.
    #[error("failed to allocate backing store: {0}")]
    Alloc(#[from] io::Error),
}

impl ArrayBufferError {
    /// Stable negative sentinel for callers that speak integer status codes.
    pub fn code(&self) -> i32 {
        match self {
            ArrayBufferError::Unsized => -1,
            ArrayBufferError::EmptyInput => -2,
            ArrayBufferError::InsufficientSpace { .. } => -3,
            ArrayBufferError::InvalidSize => -4,
            ArrayBufferError::LockUnavailable => -5,
            ArrayBufferError::Alloc(_) => -6,
        }
    }
}

/// Errors from [`crate::log::Logger`] construction and installation.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("unknown log level '{0}'")]
    UnknownLevel(String),

    #[error("cannot open log file '{path}': {source}")]
    OpenFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("a global logger is already installed")]
    AlreadyInstalled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check_status(0).is_ok());
        let err = check_status(16).unwrap_err();
        assert_eq!(err.status(), 16);
        assert_eq!(err.to_string(), "native lock operation failed, status=16");
    }

    #[test]
    fn test_error_codes_are_negative_and_distinct() {
        let errors = [
            ArrayBufferError::Unsized,
            ArrayBufferError::EmptyInput,
            ArrayBufferError::InsufficientSpace {
                requested: 4,
                available: 1,
            },
            ArrayBufferError::InvalidSize,
            ArrayBufferError::LockUnavailable,
            ArrayBufferError::Alloc(io::Error::new(io::ErrorKind::OutOfMemory, "oom")),
        ];

        let mut codes: Vec<i32> = errors.iter().map(ArrayBufferError::code).collect();
        assert!(codes.iter().all(|&c| c < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
