//! Fixed-capacity byte ring buffer shared between interrupt and task context.
//!
//! One producer (typically the UART receive interrupt) fills the buffer and
//! one consumer (the main loop) drains it. No locks are taken, so the
//! producer can run inside an interrupt handler.
//!
//! # Memory ordering
//!
//! - `tail` is written only by the producer, `head` only by the consumer.
//! - `count` is the hand-off: the producer stores the byte, advances `tail`,
//!   then increments `count` with `Release`; the consumer loads `count` with
//!   `Acquire` before reading a slot. Freeing a slot is symmetric: the consumer
//!   reads the byte, advances `head`, then decrements `count` with `Release`.
//! - An explicit count (rather than comparing `head` and `tail`) means a full
//!   buffer and an empty buffer are never confused and all `N` slots are
//!   usable.
//!
//! `portable-atomic` provides the read-modify-write operations on targets
//! without native compare-and-swap (Cortex-M0).
//!
//! # Example
//!
//! ```
//! use ventlink_core::CircularBuffer;
//!
//! let mut buf = CircularBuffer::<4>::new();
//! assert!(buf.put(1));
//! assert!(buf.put(2));
//! assert_eq!(buf.get(), Some(1));
//! assert_eq!(buf.full_count() + buf.free_count(), 4);
//! ```

use core::cell::UnsafeCell;

use portable_atomic::{AtomicUsize, Ordering};
use ventlink_proto::{ByteSink, ByteSource};

/// Ring buffer of `N` bytes.
///
/// Use it directly through `&mut self` from a single context, or
/// [`split`](Self::split) it into a [`Producer`] and a [`Consumer`] that may
/// live in different execution contexts.
pub struct CircularBuffer<const N: usize> {
    storage: UnsafeCell<[u8; N]>,
    /// Next slot to read. Owned by the consumer.
    head: AtomicUsize,
    /// Next slot to write. Owned by the producer.
    tail: AtomicUsize,
    /// Number of readable bytes.
    count: AtomicUsize,
}

// SAFETY: a slot is written only by the single producer while `count` says it
// is free and read only by the single consumer while `count` says it is full.
// The Release/Acquire pairs on `count` order those accesses. Shared access is
// only handed out through `Producer`/`Consumer`, which `split` creates once per
// exclusive borrow.
unsafe impl<const N: usize> Sync for CircularBuffer<N> {}

impl<const N: usize> CircularBuffer<N> {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            storage: UnsafeCell::new([0; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        }
    }

    /// Total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Append a byte.
    ///
    /// Returns `false` and changes nothing if the buffer is full (always, for
    /// `N == 0`).
    #[inline]
    pub fn put(&mut self, byte: u8) -> bool {
        self.push_shared(byte)
    }

    /// Remove and return the oldest byte, or `None` if the buffer is empty.
    #[inline]
    pub fn get(&mut self) -> Option<u8> {
        self.pop_shared()
    }

    /// Number of bytes waiting to be read.
    #[inline]
    #[must_use]
    pub fn full_count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Number of bytes that can still be written.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        N - self.full_count()
    }

    /// Whether there is nothing to read.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.full_count() == 0
    }

    /// Whether a `put` would fail.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.full_count() == N
    }

    /// Discard all contents and rewind both indices.
    pub fn flush(&mut self) {
        self.head.store(0, Ordering::Relaxed);
        self.tail.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Release);
    }

    /// Split into producer and consumer halves.
    ///
    /// The halves borrow the buffer, so only one pair can exist at a time.
    /// Pass a `&'static mut` buffer to get `'static` halves.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let buf: &Self = self;
        (Producer { buf }, Consumer { buf })
    }

    #[inline]
    fn slot(&self, index: usize) -> *mut u8 {
        self.storage.get().cast::<u8>().wrapping_add(index)
    }

    #[inline]
    const fn next(index: usize) -> usize {
        (index + 1) % N
    }

    /// Producer side. Must only be called from one context at a time.
    fn push_shared(&self, byte: u8) -> bool {
        if self.count.load(Ordering::Acquire) >= N {
            return false;
        }

        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: count < N implies N > 0 and tail < N. The slot at tail is
        // free, so the consumer is not reading it.
        unsafe { self.slot(tail).write_volatile(byte) };
        self.tail.store(Self::next(tail), Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Release);
        true
    }

    /// Consumer side. Must only be called from one context at a time.
    fn pop_shared(&self) -> Option<u8> {
        if self.count.load(Ordering::Acquire) == 0 {
            return None;
        }

        let head = self.head.load(Ordering::Relaxed);
        // SAFETY: count > 0 implies N > 0 and head < N. The slot at head holds
        // published data the producer will not touch until count drops.
        let byte = unsafe { self.slot(head).read_volatile() };
        self.head.store(Self::next(head), Ordering::Relaxed);
        self.count.fetch_sub(1, Ordering::Release);
        Some(byte)
    }
}

impl<const N: usize> Default for CircularBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteSink for CircularBuffer<N> {
    #[inline]
    fn put(&mut self, byte: u8) -> bool {
        CircularBuffer::put(self, byte)
    }
}

impl<const N: usize> ByteSource for CircularBuffer<N> {
    #[inline]
    fn pop(&mut self) -> Option<u8> {
        self.get()
    }
}

/// Writing half of a split [`CircularBuffer`]. Safe to use from an interrupt.
pub struct Producer<'a, const N: usize> {
    buf: &'a CircularBuffer<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Append a byte. Returns `false` if the buffer is full.
    #[inline]
    pub fn put(&mut self, byte: u8) -> bool {
        self.buf.push_shared(byte)
    }

    /// Number of bytes that can still be written.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.buf.free_count()
    }
}

impl<const N: usize> ByteSink for Producer<'_, N> {
    #[inline]
    fn put(&mut self, byte: u8) -> bool {
        Producer::put(self, byte)
    }
}

/// Reading half of a split [`CircularBuffer`].
pub struct Consumer<'a, const N: usize> {
    buf: &'a CircularBuffer<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Remove and return the oldest byte.
    #[inline]
    pub fn get(&mut self) -> Option<u8> {
        self.buf.pop_shared()
    }

    /// Number of bytes waiting to be read.
    #[inline]
    #[must_use]
    pub fn full_count(&self) -> usize {
        self.buf.full_count()
    }

    /// Discard every byte that was readable when called.
    ///
    /// Drains through the consumer path instead of rewinding indices, so a
    /// producer running concurrently is never corrupted.
    pub fn flush(&mut self) {
        for _ in 0..self.full_count() {
            let _ = self.get();
        }
    }
}

impl<const N: usize> ByteSource for Consumer<'_, N> {
    #[inline]
    fn pop(&mut self) -> Option<u8> {
        self.get()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// Small deterministic generator for test data.
    fn pseudo_random(len: usize) -> Vec<u8> {
        let mut state: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn test_counts_across_wraparound() {
        const SIZE: usize = 128;
        let mut buf = CircularBuffer::<SIZE>::new();
        assert_eq!(buf.free_count(), SIZE);
        assert_eq!(buf.full_count(), 0);

        // 100 rounds of 20 bytes wraps the indices many times.
        for _ in 0..100 {
            for j in 0..20u8 {
                assert!(buf.put(j));
                assert_eq!(buf.full_count(), usize::from(j) + 1);
                assert_eq!(buf.free_count(), SIZE - usize::from(j) - 1);
            }
            for j in 0..20u8 {
                assert_eq!(buf.get(), Some(j));
                assert_eq!(buf.full_count(), 19 - usize::from(j));
                assert_eq!(buf.free_count(), SIZE - 19 + usize::from(j));
            }
        }
    }

    #[test]
    fn test_data_integrity_and_full_rejection() {
        const SIZE: usize = 256;
        let mut buf = CircularBuffer::<SIZE>::new();
        let data = pseudo_random(SIZE + 20);

        for (i, &b) in data.iter().enumerate() {
            let ok = buf.put(b);
            if i < SIZE {
                assert!(ok);
                assert_eq!(buf.full_count(), i + 1);
            } else {
                // Failed puts leave the contents alone.
                assert!(!ok);
                assert_eq!(buf.full_count(), SIZE);
                assert_eq!(buf.free_count(), 0);
            }
        }

        for &expected in &data[..SIZE] {
            assert_eq!(buf.get(), Some(expected));
        }

        assert_eq!(buf.full_count(), 0);
        assert_eq!(buf.free_count(), SIZE);
        assert_eq!(buf.get(), None);
        assert_eq!(buf.full_count(), 0);
        assert_eq!(buf.free_count(), SIZE);
    }

    #[test]
    fn test_zero_capacity_always_empty() {
        let mut buf = CircularBuffer::<0>::new();
        assert_eq!(buf.capacity(), 0);
        assert_eq!(buf.full_count(), 0);
        assert_eq!(buf.free_count(), 0);
        assert!(!buf.put(0));
        assert_eq!(buf.get(), None);
        assert!(buf.is_empty());
        assert!(buf.is_full());

        let (mut producer, mut consumer) = buf.split();
        assert!(!producer.put(1));
        assert_eq!(consumer.get(), None);
    }

    #[test]
    fn test_capacity_five_scenario() {
        let mut buf = CircularBuffer::<5>::new();
        for b in 0..5 {
            assert!(buf.put(b));
        }
        assert!(!buf.put(5));

        for expected in 0..4 {
            assert_eq!(buf.get(), Some(expected));
        }

        assert!(buf.put(9));
        assert_eq!(buf.get(), Some(4));
        assert_eq!(buf.get(), Some(9));
        assert_eq!(buf.get(), None);
    }

    #[test]
    fn test_small_buffer_every_offset() {
        const SIZE: usize = 5;
        let mut buf = CircularBuffer::<SIZE>::new();
        let mut elem: u8 = 0;
        assert!(buf.put(elem));
        elem += 1;

        // Leaving one byte behind each round shifts head/tail by one, so every
        // start offset is exercised with a full buffer.
        for _ in 0..=SIZE {
            for j in 1..SIZE {
                assert!(buf.put(elem));
                elem = elem.wrapping_add(1);
                assert_eq!(buf.full_count(), j + 1);
            }
            assert!(!buf.put(0));
            for j in 1..SIZE {
                let expected = elem.wrapping_sub((SIZE + 1 - j) as u8);
                assert_eq!(buf.get(), Some(expected));
                assert_eq!(buf.free_count(), j);
            }
        }

        buf.flush();
        assert_eq!(buf.full_count(), 0);
        assert_eq!(buf.free_count(), SIZE);
        assert_eq!(buf.get(), None);

        for _ in 0..SIZE {
            assert!(buf.put(elem));
            assert_eq!(buf.get(), Some(elem));
            elem = elem.wrapping_add(1);
            assert_eq!(buf.get(), None);
            assert_eq!(buf.free_count(), SIZE);
        }
    }

    #[test]
    fn test_flush_from_any_position() {
        let mut buf = CircularBuffer::<8>::new();
        for b in 0..6 {
            buf.put(b);
        }
        buf.get();
        buf.get();
        buf.flush();
        assert_eq!(buf.full_count(), 0);
        assert_eq!(buf.free_count(), 8);
        assert!(buf.put(42));
        assert_eq!(buf.get(), Some(42));
    }

    #[test]
    fn test_consumer_flush_drains() {
        let mut buf = CircularBuffer::<8>::new();
        let (mut producer, mut consumer) = buf.split();
        for b in 0..5 {
            assert!(producer.put(b));
        }
        consumer.flush();
        assert_eq!(consumer.full_count(), 0);
        assert_eq!(producer.free_count(), 8);
        assert!(producer.put(7));
        assert_eq!(consumer.get(), Some(7));
    }

    #[test]
    fn test_split_across_threads_preserves_order() {
        const TOTAL: u32 = 100_000;
        let mut buf = CircularBuffer::<64>::new();
        let (mut producer, mut consumer) = buf.split();

        std::thread::scope(|s| {
            s.spawn(move || {
                for i in 0..TOTAL {
                    while !producer.put(i as u8) {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut expected: u32 = 0;
            while expected < TOTAL {
                if let Some(byte) = consumer.get() {
                    assert_eq!(byte, expected as u8);
                    expected += 1;
                }
                let full = consumer.full_count();
                assert!(full <= 64);
            }
        });
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(u8),
        Get,
        Flush,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => any::<u8>().prop_map(Op::Put),
            4 => Just(Op::Get),
            1 => Just(Op::Flush),
        ]
    }

    fn check_against_model<const N: usize>(ops: &[Op]) -> Result<(), TestCaseError> {
        let mut buf = CircularBuffer::<N>::new();
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match *op {
                Op::Put(b) => {
                    let before = buf.full_count();
                    let ok = buf.put(b);
                    prop_assert_eq!(ok, model.len() < N);
                    if ok {
                        model.push_back(b);
                    } else {
                        prop_assert_eq!(buf.full_count(), before);
                    }
                }
                Op::Get => prop_assert_eq!(buf.get(), model.pop_front()),
                Op::Flush => {
                    buf.flush();
                    model.clear();
                }
            }
            prop_assert_eq!(buf.full_count() + buf.free_count(), N);
            prop_assert_eq!(buf.full_count(), model.len());
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_matches_fifo_model(ops in proptest::collection::vec(op(), 0..200)) {
            check_against_model::<0>(&ops)?;
            check_against_model::<1>(&ops)?;
            check_against_model::<5>(&ops)?;
            check_against_model::<16>(&ops)?;
        }
    }
}
