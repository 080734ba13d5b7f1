//! Controller side of the GUI link.
//!
//! [`Comms`] is driven from the main control loop. Every call to
//! [`handler`](Comms::handler):
//!
//! 1. sends the latest [`ControllerStatus`] if the previous transmission has
//!    finished and at least the configured interval has passed;
//! 2. takes at most one received frame and, if it decodes, replaces the
//!    caller's [`GuiStatus`];
//! 3. reports transmit errors, a stalled transmitter and its recovery to the
//!    [`LinkAlarm`].
//!
//! Nothing blocks. A corrupted or undecodable frame is dropped and the caller
//! keeps its last known good [`GuiStatus`]; a failed transmission is retried
//! on the next handler call.

use heapless::Vec;
use ventlink_proto::{
    decode_frame, encode_frame, ByteSource, ControllerStatus, DecodeResult, GuiStatus,
    TX_FRAME_LENGTH_MAX,
};

use crate::alarm::{LinkAlarm, NoAlarm};
use crate::config::CommsConfig;
use crate::frame_detector::FrameDetector;
use crate::transport::{Clock, Transport};

/// Periodic transmit and opportunistic receive over one serial link.
pub struct Comms<S, T, C, A = NoAlarm> {
    detector: FrameDetector<S>,
    transport: T,
    clock: C,
    alarm: A,
    config: CommsConfig,
    tx_buf: Vec<u8, TX_FRAME_LENGTH_MAX>,
    /// `None` until the first successful transmission, so the first handler
    /// call always transmits.
    last_tx: Option<u64>,
    last_rx: Option<u64>,
    started: Option<u64>,
    stale: bool,
}

impl<S, T, C, A> Comms<S, T, C, A>
where
    S: ByteSource,
    T: Transport,
    C: Clock,
    A: LinkAlarm,
{
    /// Create a link from its receive path, transport, clock, timing and
    /// alarm hook. Call [`init`](Self::init) before the first
    /// [`handler`](Self::handler).
    pub fn new(
        detector: FrameDetector<S>,
        transport: T,
        clock: C,
        config: CommsConfig,
        alarm: A,
    ) -> Self {
        Self {
            detector,
            transport,
            clock,
            alarm,
            config,
            tx_buf: Vec::new(),
            last_tx: None,
            last_rx: None,
            started: None,
            stale: false,
        }
    }

    /// Start the receive path. Returns `false` if the byte source failed to
    /// start.
    pub fn init(&mut self) -> bool {
        self.started = Some(self.clock.now_ms());
        self.detector.begin()
    }

    /// Run one transmit/receive cycle.
    pub fn handler(&mut self, controller_status: &ControllerStatus, gui_status: &mut GuiStatus) {
        self.process_tx(controller_status);
        self.process_rx(gui_status);
        self.check_link_health();
    }

    /// Whether enough time has passed since the last transmission.
    pub fn is_time_to_transmit(&self) -> bool {
        match self.last_tx {
            None => true,
            Some(last) => self.clock.now_ms().saturating_sub(last) > self.config.tx_interval_ms,
        }
    }

    /// Whether the transport is still busy with the previous frame.
    #[inline]
    pub fn is_transmitting(&self) -> bool {
        self.transport.tx_in_progress()
    }

    /// Encode and start sending `status` if the link is idle and due.
    ///
    /// Returns `true` if a frame was handed to the transport.
    pub fn process_tx(&mut self, status: &ControllerStatus) -> bool {
        if self.is_transmitting() || !self.is_time_to_transmit() {
            return false;
        }

        let tx_buf = &mut self.tx_buf;
        let encoded = critical_section::with(|_| {
            tx_buf.clear();
            encode_frame(status, tx_buf)
        });
        if let Err(e) = encoded {
            warn!("status frame encode failed: {}", e);
            return false;
        }

        if let Err(e) = self.transport.start_tx(&self.tx_buf) {
            warn!("status frame not sent: {}", e);
            return false;
        }

        self.last_tx = Some(self.clock.now_ms());
        trace!("status frame sent: {} bytes", self.tx_buf.len());
        true
    }

    /// Decode one pending frame into `gui_status`.
    ///
    /// `gui_status` is only overwritten when the frame decodes. Returns `None`
    /// when no frame was pending.
    pub fn process_rx(&mut self, gui_status: &mut GuiStatus) -> Option<DecodeResult> {
        if !self.detector.frame_available() {
            return None;
        }
        let frame = self.detector.take_frame()?;
        let result = decode_frame::<GuiStatus>(frame);
        let outcome = DecodeResult::from(&result);

        match result {
            Ok(status) => {
                *gui_status = status;
                self.last_rx = Some(self.clock.now_ms());
            }
            Err(e) => warn!("dropped gui frame: {}", e),
        }
        Some(outcome)
    }

    fn check_link_health(&mut self) {
        let errors = self.transport.take_tx_errors();
        if errors > 0 {
            error!("{} status transmissions failed", errors);
            self.alarm.tx_error(errors);
        }

        let Some(since) = self.last_tx.or(self.started) else {
            return;
        };
        let elapsed = self.clock.now_ms().saturating_sub(since);
        if elapsed > self.config.tx_stale_after_ms {
            if !self.stale {
                warn!("no status transmitted for {} ms", elapsed);
                self.stale = true;
            }
            self.alarm.tx_stale(elapsed);
        } else if self.stale {
            debug!("status transmission resumed");
            self.stale = false;
            self.alarm.tx_recovered();
        }
    }

    /// Time of the last successful transmission.
    #[inline]
    pub fn last_tx(&self) -> Option<u64> {
        self.last_tx
    }

    /// Time the last valid [`GuiStatus`] was received.
    #[inline]
    pub fn last_rx(&self) -> Option<u64> {
        self.last_rx
    }

    /// Milliseconds since the last valid [`GuiStatus`], or `None` if none has
    /// arrived yet.
    pub fn rx_age(&self, now_ms: u64) -> Option<u64> {
        self.last_rx.map(|t| now_ms.saturating_sub(t))
    }

    /// Get the timing configuration.
    pub fn config(&self) -> &CommsConfig {
        &self.config
    }

    /// Get a reference to the frame detector.
    pub fn detector(&self) -> &FrameDetector<S> {
        &self.detector
    }

    /// Get a mutable reference to the frame detector.
    pub fn detector_mut(&mut self) -> &mut FrameDetector<S> {
        &mut self.detector
    }

    /// Get a reference to the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a reference to the alarm hook.
    pub fn alarm(&self) -> &A {
        &self.alarm
    }
}
