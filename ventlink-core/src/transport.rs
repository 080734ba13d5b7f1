//! Seams to the hardware: serial transmit, time, and transmit completion events.

use portable_atomic::{AtomicU32, Ordering};

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// A previous transmission is still in flight.
    Busy,
    /// The frame does not fit the transport's buffer.
    FrameTooLong,
    /// The peripheral reported a fault.
    Hardware,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Busy => write!(f, "transmission in progress"),
            Self::FrameTooLong => write!(f, "frame too long for transport"),
            Self::Hardware => write!(f, "transport hardware fault"),
        }
    }
}

/// Non-blocking outbound byte transport (UART with DMA, typically).
pub trait Transport {
    /// Whether a previously started transmission is still in flight.
    fn tx_in_progress(&self) -> bool;

    /// Start sending `frame`. Must not block; the bytes are copied or fully
    /// consumed before returning.
    fn start_tx(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Transmit errors reported since the last call.
    ///
    /// Transports that track completion through [`TxEvents`] return
    /// [`TxEvents::take_errors`] here.
    fn take_tx_errors(&mut self) -> u32 {
        0
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn tx_in_progress(&self) -> bool {
        (**self).tx_in_progress()
    }

    fn start_tx(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).start_tx(frame)
    }

    fn take_tx_errors(&mut self) -> u32 {
        (**self).take_tx_errors()
    }
}

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;

    /// [`now_ms`](Self::now_ms) cut to the 32-bit uptime carried on the
    /// wire. Wraps every ~49.7 days.
    #[inline]
    fn uptime_ms(&self) -> u32 {
        u32::try_from(self.now_ms() % (1u64 << 32)).unwrap_or_default()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Transmit completion counters, updated from the transport's interrupt.
///
/// All methods take `&self` and only touch atomics, so a `static` instance can
/// be shared between the completion interrupt and the main loop.
#[derive(Debug, Default)]
pub struct TxEvents {
    completed: AtomicU32,
    errors: AtomicU32,
}

impl TxEvents {
    pub const fn new() -> Self {
        Self {
            completed: AtomicU32::new(0),
            errors: AtomicU32::new(0),
        }
    }

    /// Record a successful transmission.
    #[inline]
    pub fn on_tx_complete(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed transmission.
    #[inline]
    pub fn on_tx_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Total successful transmissions.
    #[inline]
    #[must_use]
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Errors since the previous call, resetting the counter.
    #[inline]
    pub fn take_errors(&self) -> u32 {
        self.errors.swap(0, Ordering::Relaxed)
    }
}
