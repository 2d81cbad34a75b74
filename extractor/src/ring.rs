//! Fixed-capacity byte ring buffer between the transport and the extractor.
//!
//! Frame format is irrelevant here: this is a byte-granular FIFO, not a message
//! queue. Physical storage wraps at `capacity`; wrap is invisible to callers, who
//! only ever see logical offsets from the current head.
//!
//! Concurrency model: single producer (the transport, via `append_at_tail`),
//! single consumer (the extractor, via `peek_at`/`consume`/`next`). `head`,
//! `tail`, and `used` are atomics so the two sides can safely run on separate
//! threads without a mutex, matching the SPSC discipline used elsewhere in this
//! codebase for the kernel-to-user ring.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use shared::errors::RingError;

/// Byte-granular FIFO of fixed capacity.
pub struct RingBuffer {
    buf: UnsafeCell<Box<[u8]>>,
    capacity: usize,
    /// Physical index of the next byte to read.
    head: AtomicUsize,
    /// Physical index of the next byte to write.
    tail: AtomicUsize,
    /// Number of occupied bytes; tracked separately so head==tail is unambiguous
    /// (it always means "empty", never "full") and the full capacity is usable.
    used: AtomicUsize,
    /// Total bytes ever consumed from this ring, never wrapped or reset. This is
    /// the logical stream offset of the current head and is what `source_offset`
    /// is derived from: unlike `head`/`tail`, it never wraps at `capacity`, so it
    /// stays monotonic across an arbitrarily long-running stream.
    total_consumed: AtomicU64,
}

// SAFETY: `buf` is only ever accessed through `copy_in`/`copy_out`, which write
// and read disjoint logical ranges under the SPSC discipline described above:
// a region is either being written by the producer (not yet reflected in `used`)
// or read by the consumer (already reflected in `used`), never both.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Allocates a ring with the given fixed capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
            capacity,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            used: AtomicUsize::new(0),
            total_consumed: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Logical stream offset of the byte currently at the head, i.e. the total
    /// number of bytes ever consumed from this ring. Monotonically non-decreasing
    /// for the lifetime of the ring; used by callers to stamp `source_offset`.
    pub fn total_consumed(&self) -> u64 {
        self.total_consumed.load(Ordering::Acquire)
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn available(&self) -> usize {
        self.capacity - self.used()
    }

    pub fn has_data(&self) -> bool {
        self.used() > 0
    }

    /// Writes `src` in full or not at all.
    ///
    /// # Errors
    /// Returns `RingError::Full` without writing anything if `src.len() > available()`.
    pub fn append_at_tail(&self, src: &[u8]) -> Result<(), RingError> {
        let available = self.available();
        if src.len() > available {
            return Err(RingError::Full {
                needed: src.len(),
                available,
                capacity: self.capacity,
            });
        }
        if src.is_empty() {
            return Ok(());
        }

        let tail = self.tail.load(Ordering::Relaxed);
        self.copy_in(tail, src);

        let new_tail = (tail + src.len()) % self.capacity;
        self.tail.store(new_tail, Ordering::Relaxed);
        self.used.fetch_add(src.len(), Ordering::Release);
        Ok(())
    }

    /// Returns the byte at logical `offset` from the head without advancing it.
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        if offset >= self.used() {
            return None;
        }
        let head = self.head.load(Ordering::Relaxed);
        let phys = (head + offset) % self.capacity;
        // SAFETY: only the consumer reads single bytes this way, and only at
        // offsets already reflected in `used` (checked above).
        let buf: &[u8] = unsafe { &*self.buf.get() };
        Some(buf[phys])
    }

    /// Copies `dst.len()` logical bytes starting at the head into `dst`, without consuming them.
    fn peek_into(&self, dst: &mut [u8]) {
        let head = self.head.load(Ordering::Relaxed);
        self.copy_out(head, dst);
    }

    /// Advances the head by `n` bytes, making them unrecoverable.
    ///
    /// # Panics
    /// Panics if `n > used()`: an invariant violation that is always a caller
    /// bug, never a runtime condition.
    pub fn consume(&self, n: usize) {
        let used = self.used();
        assert!(
            n <= used,
            "RingBuffer::consume({n}) exceeds used bytes ({used})"
        );
        if n == 0 {
            return;
        }
        let head = self.head.load(Ordering::Relaxed);
        let new_head = (head + n) % self.capacity;
        self.head.store(new_head, Ordering::Relaxed);
        self.used.fetch_sub(n, Ordering::Release);
        self.total_consumed.fetch_add(n as u64, Ordering::Release);
    }

    /// Pops exactly one byte from the head.
    pub fn next(&self) -> Option<u8> {
        let b = self.peek_at(0)?;
        self.consume(1);
        Some(b)
    }

    /// Copies `len` logical bytes starting at the head into a freshly owned buffer,
    /// without consuming them. Used by the extractor to materialize a candidate
    /// payload before committing to consume it.
    pub fn peek_owned(&self, len: usize) -> Option<Vec<u8>> {
        if len > self.used() {
            return None;
        }
        let mut out = vec![0u8; len];
        self.peek_into(&mut out);
        Some(out)
    }

    /// Drops all buffered bytes without returning them.
    pub fn clear(&self) {
        let used = self.used();
        self.consume(used);
    }

    #[inline]
    fn copy_in(&self, mut off: usize, src: &[u8]) {
        // SAFETY: `buf` outlives this call and only the producer calls `copy_in`.
        let buf: *mut u8 = unsafe { (*self.buf.get()).as_mut_ptr() };
        let cap = self.capacity;
        let mut written = 0usize;
        while written < src.len() {
            let to_end = cap - off;
            let chunk = (src.len() - written).min(to_end);
            // SAFETY: `off + chunk <= cap`, and this region is not concurrently
            // read: the consumer only sees bytes already reflected in `used`.
            unsafe {
                std::ptr::copy_nonoverlapping(src[written..].as_ptr(), buf.add(off), chunk);
            }
            written += chunk;
            off = (off + chunk) % cap;
        }
    }

    #[inline]
    fn copy_out(&self, mut off: usize, dst: &mut [u8]) {
        // SAFETY: only the consumer calls `copy_out`, and only over bytes already
        // published via `used.fetch_add` with Release ordering in `append_at_tail`.
        let buf: &[u8] = unsafe { &*self.buf.get() };
        let mut read = 0usize;
        let cap = self.capacity;
        while read < dst.len() {
            let to_end = cap - off;
            let chunk = (dst.len() - read).min(to_end);
            dst[read..read + chunk].copy_from_slice(&buf[off..off + chunk]);
            read += chunk;
            off = (off + chunk) % cap;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_updates_used_and_available_exactly() {
        let ring = RingBuffer::new(16);
        ring.append_at_tail(b"hello").unwrap();
        assert_eq!(ring.used(), 5);
        assert_eq!(ring.available(), 11);
    }

    #[test]
    fn round_trips_bytes_through_next() {
        let ring = RingBuffer::new(16);
        let msg = b"the quick fox";
        ring.append_at_tail(msg).unwrap();

        let mut out = Vec::new();
        while let Some(b) = ring.next() {
            out.push(b);
        }
        assert_eq!(out, msg);
        assert!(!ring.has_data());
    }

    #[test]
    fn append_and_read_are_correct_across_a_physical_wrap() {
        let ring = RingBuffer::new(8);
        ring.append_at_tail(b"abcd").unwrap();
        ring.consume(4);
        ring.append_at_tail(b"efghij").unwrap(); // wraps past the physical end
        let mut out = Vec::new();
        while let Some(b) = ring.next() {
            out.push(b);
        }
        assert_eq!(out, b"efghij");
    }

    #[test]
    fn append_rejects_oversized_chunk_entirely() {
        let ring = RingBuffer::new(4);
        ring.append_at_tail(b"ab").unwrap();
        let err = ring.append_at_tail(b"xyz").unwrap_err();
        assert!(matches!(err, RingError::Full { .. }));
        // Nothing was written on the failed attempt.
        assert_eq!(ring.used(), 2);
    }

    #[test]
    fn full_capacity_is_usable() {
        let ring = RingBuffer::new(4);
        ring.append_at_tail(b"abcd").unwrap();
        assert_eq!(ring.used(), 4);
        assert_eq!(ring.available(), 0);
        assert_eq!(ring.peek_owned(4).unwrap(), b"abcd");
    }

    #[test]
    fn clear_drops_everything() {
        let ring = RingBuffer::new(8);
        ring.append_at_tail(b"abcd").unwrap();
        ring.clear();
        assert!(!ring.has_data());
        assert_eq!(ring.available(), 8);
    }

    #[test]
    fn total_consumed_is_monotonic_across_wraps() {
        let ring = RingBuffer::new(4);
        ring.append_at_tail(b"ab").unwrap();
        ring.consume(2);
        assert_eq!(ring.total_consumed(), 2);
        ring.append_at_tail(b"cdef").unwrap(); // wraps physically
        ring.consume(4);
        assert_eq!(ring.total_consumed(), 6);
    }

    #[test]
    #[should_panic]
    fn consume_past_used_panics() {
        let ring = RingBuffer::new(8);
        ring.append_at_tail(b"ab").unwrap();
        ring.consume(3);
    }
}
