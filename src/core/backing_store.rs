//! Anonymous mmap backing store untuk array buffer
//!
//! Region memori private, contiguous, dan dimiliki eksklusif oleh satu
//! buffer. Tidak ada file di belakangnya: data hilang saat di-drop.

use memmap2::{MmapMut, MmapOptions};
use std::io;

/// Contiguous byte region dengan copy yang sadar wraparound.
pub(crate) struct BackingStore {
    mmap: MmapMut,
    capacity: usize,
}

impl BackingStore {
    /// Alokasi region baru sebesar `capacity` bytes (harus > 0).
    pub(crate) fn allocate(capacity: usize) -> io::Result<Self> {
        debug_assert!(capacity > 0);
        let mmap = MmapOptions::new().len(capacity).map_anon()?;
        Ok(Self { mmap, capacity })
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tulis `data` mulai dari `offset`, lanjut ke offset 0 jika melewati ujung.
    ///
    /// Caller guarantees `offset < capacity` and `data.len() <= capacity`.
    #[inline]
    pub(crate) fn write_at(&mut self, offset: usize, data: &[u8]) {
        debug_assert!(offset < self.capacity && data.len() <= self.capacity);

        let first_part = (self.capacity - offset).min(data.len());
        self.mmap[offset..offset + first_part].copy_from_slice(&data[..first_part]);

        // Handle wraparound
        if first_part < data.len() {
            let second_part = data.len() - first_part;
            self.mmap[..second_part].copy_from_slice(&data[first_part..]);
        }
    }

    /// Baca `dst.len()` bytes mulai dari `offset`, wrap ke offset 0.
    #[inline]
    pub(crate) fn read_at(&self, offset: usize, dst: &mut [u8]) {
        debug_assert!(offset < self.capacity && dst.len() <= self.capacity);

        let first_part = (self.capacity - offset).min(dst.len());
        dst[..first_part].copy_from_slice(&self.mmap[offset..offset + first_part]);

        if first_part < dst.len() {
            let second_part = dst.len() - first_part;
            dst[first_part..].copy_from_slice(&self.mmap[..second_part]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_zeroed() {
        let store = BackingStore::allocate(64).unwrap();
        assert_eq!(store.capacity(), 64);

        let mut out = [0xffu8; 64];
        store.read_at(0, &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_read_wraparound() {
        let mut store = BackingStore::allocate(8).unwrap();

        store.write_at(6, b"abcd");

        let mut head = [0u8; 2];
        store.read_at(0, &mut head);
        assert_eq!(&head, b"cd");

        let mut out = [0u8; 4];
        store.read_at(6, &mut out);
        assert_eq!(&out, b"abcd");
    }

    #[test]
    fn test_full_capacity_copy() {
        let mut store = BackingStore::allocate(4).unwrap();

        store.write_at(3, b"wxyz");
        let mut out = [0u8; 4];
        store.read_at(3, &mut out);
        assert_eq!(&out, b"wxyz");

        store.read_at(0, &mut out);
        assert_eq!(&out, b"xyzw");
    }
}
