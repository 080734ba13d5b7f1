//! UART transport and clock for the link.
//!
//! # Pins
//!
//! Uses UART1 by default:
//! - GPIO 8: TX
//! - GPIO 9: RX
//! - GPIO 10: CTS (optional, with `uart-flow-control` feature)
//! - GPIO 11: RTS (optional, with `uart-flow-control` feature)
//!
//! The transmit side is split in two: [`UartTransport`] is handed to
//! [`Comms`](ventlink_core::Comms) and only queues a frame, the TX task owns
//! the `UartTx` and performs the DMA write. They meet in a [`TxChannel`].

use defmt::{error, trace};
use embassy_rp::uart::Error as UartError;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use heapless::Vec;
use portable_atomic::{AtomicBool, Ordering};
use ventlink_core::ventlink_proto::TX_FRAME_LENGTH_MAX;
use ventlink_core::{Clock, Transport, TransportError, TxEvents};

/// One queued outbound frame.
pub type TxFrame = Vec<u8, TX_FRAME_LENGTH_MAX>;

/// Hand-off between [`UartTransport`] and the TX task.
pub struct TxChannel {
    frame: Signal<CriticalSectionRawMutex, TxFrame>,
    busy: AtomicBool,
    events: TxEvents,
}

impl TxChannel {
    pub const fn new() -> Self {
        Self {
            frame: Signal::new(),
            busy: AtomicBool::new(false),
            events: TxEvents::new(),
        }
    }

    /// Wait for the next frame to send. Called by the TX task.
    pub async fn next_frame(&self) -> TxFrame {
        self.frame.wait().await
    }

    /// Record the outcome of a write and release the channel.
    pub fn finish(&self, result: Result<(), UartError>) {
        match result {
            Ok(()) => self.events.on_tx_complete(),
            Err(e) => {
                error!("UART write failed: {:?}", e);
                self.events.on_tx_error();
            }
        }
        self.busy.store(false, Ordering::Release);
    }

    /// Completion counters.
    #[inline]
    pub fn events(&self) -> &TxEvents {
        &self.events
    }
}

impl Default for TxChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Transport`] that queues frames for the TX task.
pub struct UartTransport<'a> {
    channel: &'a TxChannel,
}

impl<'a> UartTransport<'a> {
    #[must_use]
    pub fn new(channel: &'a TxChannel) -> Self {
        Self { channel }
    }
}

impl Transport for UartTransport<'_> {
    fn tx_in_progress(&self) -> bool {
        self.channel.busy.load(Ordering::Acquire)
    }

    fn start_tx(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.channel.busy.swap(true, Ordering::AcqRel) {
            return Err(TransportError::Busy);
        }
        let Ok(queued) = TxFrame::from_slice(frame) else {
            self.channel.busy.store(false, Ordering::Release);
            return Err(TransportError::FrameTooLong);
        };
        trace!("queued {} byte frame", queued.len());
        self.channel.frame.signal(queued);
        Ok(())
    }

    fn take_tx_errors(&mut self) -> u32 {
        self.channel.events.take_errors()
    }
}

/// Milliseconds since boot from the embassy time driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
