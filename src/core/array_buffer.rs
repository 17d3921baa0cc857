//! Thread-safe fixed-capacity byte ring buffer
//!
//! Titik hand-off antara producer (mis. network receiver) dan consumer
//! (mis. media processor). Semua akses lewat satu mutex internal, jadi
//! urutan mutasi efektif = urutan lock diberikan.

use std::cell::UnsafeCell;
use std::fmt;

use super::backing_store::BackingStore;
use crate::error::ArrayBufferError;
use crate::sync::{LockGuard, Mutex};

/// Cursor dan count. Hanya disentuh saat mutex dipegang atau via `&mut`.
struct State {
    store: Option<BackingStore>,
    count: usize,
    write_pos: usize,
    read_pos: usize,
}

impl State {
    const fn empty() -> Self {
        Self {
            store: None,
            count: 0,
            write_pos: 0,
            read_pos: 0,
        }
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.store.as_ref().map_or(0, BackingStore::capacity)
    }

    #[inline(always)]
    fn reset(&mut self) {
        self.count = 0;
        self.write_pos = 0;
        self.read_pos = 0;
    }

    fn put(&mut self, data: &[u8]) -> Result<usize, ArrayBufferError> {
        let capacity = self.capacity();
        let store = self.store.as_mut().ok_or(ArrayBufferError::Unsized)?;

        if data.is_empty() {
            return Err(ArrayBufferError::EmptyInput);
        }

        // Reject, jangan overwrite data yang belum dibaca
        let available = capacity - self.count;
        if data.len() > available {
            return Err(ArrayBufferError::InsufficientSpace {
                requested: data.len(),
                available,
            });
        }

        store.write_at(self.write_pos, data);
        self.write_pos = (self.write_pos + data.len()) % capacity;
        self.count += data.len();

        Ok(data.len())
    }

    fn get(&mut self, dst: &mut [u8]) -> Result<usize, ArrayBufferError> {
        let capacity = self.capacity();
        let store = self.store.as_ref().ok_or(ArrayBufferError::Unsized)?;

        let n = dst.len().min(self.count);
        if n == 0 {
            return Ok(0);
        }

        store.read_at(self.read_pos, &mut dst[..n]);
        self.read_pos = (self.read_pos + n) % capacity;
        self.count -= n;

        Ok(n)
    }
}

/// Fixed-size byte store dengan read cursor dan write cursor independen.
///
/// Lifecycle: dibuat kosong (capacity 0) lewat [`ArrayBuffer::new`], lalu
/// [`set_size`](ArrayBuffer::set_size) mengalokasikan backing store. Setelah
/// itu buffer bisa di-share (mis. lewat `Arc`) antara producer dan consumer.
///
/// Overflow policy: [`put`](ArrayBuffer::put) yang melebihi free space
/// ditolak utuh, tidak ada byte yang ditulis. [`get`](ArrayBuffer::get)
/// tidak pernah block menunggu data; consumer yang polling harus punya
/// backoff sendiri.
///
/// ```
/// use arraybuf::ArrayBuffer;
///
/// let buf = ArrayBuffer::with_capacity(8).unwrap();
/// assert_eq!(buf.put(b"hello").unwrap(), 5);
///
/// let mut out = [0u8; 8];
/// let n = buf.get(&mut out).unwrap();
/// assert_eq!(&out[..n], b"hello");
/// assert_eq!(buf.count(), 0);
/// ```
pub struct ArrayBuffer {
    mutex: Mutex,
    state: UnsafeCell<State>,
}

// SAFETY: `state` is only reached through `&mut self` or while `mutex` is
// held (see `ArrayBuffer::locked`), so shared access is serialized.
unsafe impl Sync for ArrayBuffer {}

impl Default for ArrayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayBuffer {
    /// Buffer kosong tanpa backing store (state Unsized).
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(),
            state: UnsafeCell::new(State::empty()),
        }
    }

    /// Shorthand untuk `new()` + `set_size(capacity)`.
    pub fn with_capacity(capacity: usize) -> Result<Self, ArrayBufferError> {
        let mut buf = Self::new();
        buf.set_size(capacity)?;
        Ok(buf)
    }

    /// Alokasi ulang backing store sebesar `n` bytes dan reset ke kosong.
    ///
    /// Takes `&mut self`: a resize can never overlap an in-flight
    /// `put`/`get`. Share the buffer only after it has been sized. On
    /// failure the previous store and its contents are left untouched.
    pub fn set_size(&mut self, n: usize) -> Result<(), ArrayBufferError> {
        if n == 0 {
            return Err(ArrayBufferError::InvalidSize);
        }

        let store = BackingStore::allocate(n)?;

        let state = self.state.get_mut();
        state.store = Some(store);
        state.reset();

        Ok(())
    }

    /// Append `data` (Producer side).
    ///
    /// Returns jumlah bytes yang ditulis (selalu `data.len()`), atau error
    /// tanpa mutasi jika buffer belum di-size, `data` kosong, atau free
    /// space tidak cukup.
    #[inline]
    pub fn put(&self, data: &[u8]) -> Result<usize, ArrayBufferError> {
        self.locked(|state| state.put(data))?
    }

    /// Append the UTF-8 bytes of `s`.
    #[inline]
    pub fn put_str(&self, s: &str) -> Result<usize, ArrayBufferError> {
        self.put(s.as_bytes())
    }

    /// Drain sampai `dst.len()` bytes (Consumer side).
    ///
    /// Returns jumlah bytes yang dicopy, `min(dst.len(), count)`. `Ok(0)`
    /// berarti buffer sedang kosong, bukan error.
    #[inline]
    pub fn get(&self, dst: &mut [u8]) -> Result<usize, ArrayBufferError> {
        self.locked(|state| state.get(dst))?
    }

    /// Jumlah byte yang belum dibaca.
    ///
    /// This is a snapshot; another thread may change it right after return.
    pub fn count(&self) -> usize {
        self.locked(|state| state.count).unwrap_or(0)
    }

    /// Reset cursor dan count ke kosong tanpa dealokasi.
    pub fn clear(&self) {
        // Lock failure is already logged by the guard
        let _ = self.locked(State::reset);
    }

    /// Ukuran backing store, 0 sebelum `set_size`.
    pub fn capacity(&self) -> usize {
        self.locked(|state| state.capacity()).unwrap_or(0)
    }

    /// Free space snapshot, `capacity - count`.
    pub fn free_space(&self) -> usize {
        self.locked(|state| state.capacity() - state.count)
            .unwrap_or(0)
    }

    /// `true` jika tidak ada byte yang belum dibaca (snapshot).
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// `true` setelah `set_size` berhasil.
    pub fn is_sized(&self) -> bool {
        self.capacity() > 0
    }

    /// Run `f` with the internal mutex held.
    #[inline(always)]
    fn locked<R>(&self, f: impl FnOnce(&mut State) -> R) -> Result<R, ArrayBufferError> {
        let guard = LockGuard::mutex(Some(&self.mutex));
        if !guard.is_locked() {
            return Err(ArrayBufferError::LockUnavailable);
        }

        // SAFETY: the mutex is held until `guard` drops at the end of this
        // function, so this is the only live reference to the state.
        let state = unsafe { &mut *self.state.get() };
        Ok(f(state))
    }
}

impl fmt::Debug for ArrayBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (capacity, count) = self
            .locked(|state| (state.capacity(), state.count))
            .unwrap_or((0, 0));
        f.debug_struct("ArrayBuffer")
            .field("capacity", &capacity)
            .field("count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    #[test]
    fn test_round_trip() {
        let buf = ArrayBuffer::with_capacity(16).unwrap();
        assert!(buf.is_sized());
        assert!(buf.is_empty());

        assert_eq!(buf.put(b"0123456789").unwrap(), 10);
        assert_eq!(buf.count(), 10);
        assert_eq!(buf.free_space(), 6);

        let mut out = [0u8; 10];
        assert_eq!(buf.get(&mut out).unwrap(), 10);
        assert_eq!(&out, b"0123456789");
        assert_eq!(buf.count(), 0);
    }

    #[test]
    fn test_wraparound_straddle() {
        let buf = ArrayBuffer::with_capacity(8).unwrap();

        // Geser cursor ke offset 6
        buf.put(&[0xaa; 6]).unwrap();
        let mut sink = [0u8; 6];
        assert_eq!(buf.get(&mut sink).unwrap(), 6);

        // 4 bytes melewati ujung store, lalu 4 bytes lagi: total = capacity
        assert_eq!(buf.put(b"abcd").unwrap(), 4);
        assert_eq!(buf.put(b"efgh").unwrap(), 4);
        assert_eq!(buf.count(), 8);

        let mut out = [0u8; 8];
        assert_eq!(buf.get(&mut out).unwrap(), 8);
        assert_eq!(&out, b"abcdefgh");
    }

    #[test]
    fn test_no_silent_overwrite() {
        let buf = ArrayBuffer::with_capacity(8).unwrap();
        buf.put(b"12345678").unwrap();

        let err = buf.put(b"9").unwrap_err();
        assert!(matches!(
            err,
            ArrayBufferError::InsufficientSpace {
                requested: 1,
                available: 0
            }
        ));
        assert!(err.code() < 0);
        assert_eq!(buf.count(), 8);

        let mut out = [0u8; 8];
        buf.get(&mut out).unwrap();
        assert_eq!(&out, b"12345678");
    }

    #[test]
    fn test_oversized_put_writes_nothing() {
        let buf = ArrayBuffer::with_capacity(8).unwrap();
        buf.put(b"abc").unwrap();

        assert!(buf.put(b"123456").is_err());
        assert_eq!(buf.count(), 3);
        assert_eq!(buf.put(b"12345").unwrap(), 5);

        let mut out = [0u8; 8];
        assert_eq!(buf.get(&mut out).unwrap(), 8);
        assert_eq!(&out, b"abc12345");
    }

    #[test]
    fn test_partial_read() {
        let buf = ArrayBuffer::with_capacity(32).unwrap();
        buf.put(b"ABCDEFGHIJ").unwrap();

        let mut first = [0u8; 4];
        assert_eq!(buf.get(&mut first).unwrap(), 4);
        assert_eq!(&first, b"ABCD");
        assert_eq!(buf.count(), 6);

        let mut rest = [0u8; 6];
        assert_eq!(buf.get(&mut rest).unwrap(), 6);
        assert_eq!(&rest, b"EFGHIJ");
    }

    #[test]
    fn test_get_more_than_stored() {
        let buf = ArrayBuffer::with_capacity(8).unwrap();
        buf.put_str("hi").unwrap();

        let mut out = [0u8; 8];
        assert_eq!(buf.get(&mut out).unwrap(), 2);
        assert_eq!(&out[..2], b"hi");

        // Kosong: Ok(0), bukan error
        assert_eq!(buf.get(&mut out).unwrap(), 0);
        assert_eq!(buf.get(&mut []).unwrap(), 0);
    }

    #[test]
    fn test_unsized_buffer() {
        let buf = ArrayBuffer::new();
        assert!(!buf.is_sized());
        assert_eq!(buf.capacity(), 0);

        assert!(matches!(buf.put(b"x"), Err(ArrayBufferError::Unsized)));
        let mut out = [0u8; 4];
        assert!(matches!(buf.get(&mut out), Err(ArrayBufferError::Unsized)));
        assert_eq!(buf.count(), 0);
    }

    #[test]
    fn test_empty_put_rejected() {
        let buf = ArrayBuffer::with_capacity(4).unwrap();
        let err = buf.put(&[]).unwrap_err();
        assert!(matches!(err, ArrayBufferError::EmptyInput));
        assert_eq!(err.code(), -2);
        assert_eq!(buf.count(), 0);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let buf = ArrayBuffer::with_capacity(8).unwrap();
        buf.put(b"xyz").unwrap();

        buf.clear();
        assert_eq!(buf.count(), 0);
        assert_eq!(buf.capacity(), 8);

        buf.put(b"12345678").unwrap();
        let mut out = [0u8; 8];
        buf.get(&mut out).unwrap();
        assert_eq!(&out, b"12345678");
    }

    #[test]
    fn test_set_size_resets() {
        let mut buf = ArrayBuffer::with_capacity(4).unwrap();
        buf.put(b"ab").unwrap();

        buf.set_size(16).unwrap();
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.count(), 0);

        assert!(matches!(buf.set_size(0), Err(ArrayBufferError::InvalidSize)));
        assert_eq!(buf.capacity(), 16);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(Vec<u8>),
        Get(usize),
        Clear,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => prop::collection::vec(any::<u8>(), 0..24).prop_map(Op::Put),
            4 => (0usize..24).prop_map(Op::Get),
            1 => Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn prop_matches_fifo_model(
            capacity in 1usize..32,
            ops in prop::collection::vec(op_strategy(), 1..64),
        ) {
            let buf = ArrayBuffer::with_capacity(capacity).unwrap();
            let mut model: VecDeque<u8> = VecDeque::new();

            for op in ops {
                match op {
                    Op::Put(data) => {
                        let fits = !data.is_empty() && data.len() <= capacity - model.len();
                        let result = buf.put(&data);
                        if fits {
                            prop_assert_eq!(result.unwrap(), data.len());
                            model.extend(data.iter().copied());
                        } else {
                            prop_assert!(result.is_err());
                        }
                    }
                    Op::Get(n) => {
                        let mut dst = vec![0u8; n];
                        let got = buf.get(&mut dst).unwrap();
                        let take = n.min(model.len());
                        let expected: Vec<u8> = model.drain(..take).collect();
                        prop_assert_eq!(&dst[..got], expected.as_slice());
                    }
                    Op::Clear => {
                        buf.clear();
                        model.clear();
                    }
                }

                let count = buf.count();
                prop_assert!(count <= capacity);
                prop_assert_eq!(count, model.len());
            }
        }
    }
}
