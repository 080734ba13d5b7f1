//! Byte-granular source and sink traits.
//!
//! These are the seam between the circular buffers, the frame detector and
//! the frame encoder. Both are non-blocking: a sink that cannot take a byte
//! and a source with nothing to give report it immediately.

/// Destination for bytes produced one at a time.
pub trait ByteSink {
    /// Store one byte.
    ///
    /// Returns `false` and leaves the sink unchanged if it is full.
    fn put(&mut self, byte: u8) -> bool;
}

/// Origin of bytes consumed one at a time.
pub trait ByteSource {
    /// Start delivering bytes (e.g. arm a DMA receive).
    ///
    /// Returns `false` if the source could not be started.
    fn begin(&mut self) -> bool {
        true
    }

    /// Take the oldest available byte, or `None` if nothing is pending.
    fn pop(&mut self) -> Option<u8>;
}

impl<const N: usize> ByteSink for heapless::Vec<u8, N> {
    #[inline]
    fn put(&mut self, byte: u8) -> bool {
        self.push(byte).is_ok()
    }
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    #[inline]
    fn put(&mut self, byte: u8) -> bool {
        (**self).put(byte)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    #[inline]
    fn begin(&mut self) -> bool {
        (**self).begin()
    }

    #[inline]
    fn pop(&mut self) -> Option<u8> {
        (**self).pop()
    }
}

/// Sink wrapper that counts accepted bytes.
pub(crate) struct Counting<'a, S: ?Sized> {
    inner: &'a mut S,
    written: usize,
}

impl<'a, S: ByteSink + ?Sized> Counting<'a, S> {
    pub(crate) fn new(inner: &'a mut S) -> Self {
        Self { inner, written: 0 }
    }

    pub(crate) fn written(&self) -> usize {
        self.written
    }
}

impl<S: ByteSink + ?Sized> ByteSink for Counting<'_, S> {
    #[inline]
    fn put(&mut self, byte: u8) -> bool {
        let ok = self.inner.put(byte);
        if ok {
            self.written += 1;
        }
        ok
    }
}
