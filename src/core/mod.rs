//! Core module: Thread-safe byte ring buffer dengan mmap backing
//!
//! Prinsip desain:
//! - Copy-in / copy-out: backing store tidak pernah diekspos ke caller
//! - Satu mutex per buffer: put/get/count/clear terserialisasi
//! - No-Allocation: backing store dialokasikan sekali saat set_size

mod array_buffer;
mod backing_store;

pub use array_buffer::ArrayBuffer;
