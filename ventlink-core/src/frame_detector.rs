//! Frame synchronisation over an unbounded byte stream.
//!
//! The detector pulls bytes from a [`ByteSource`] and recovers frame
//! boundaries from the [`FRAMING_MARK`] delimiter. It hands out one complete,
//! still-escaped frame at a time and never validates checksums; that is left
//! to [`decode_frame`](ventlink_proto::decode_frame).
//!
//! # State machine
//!
//! ```text
//!            MARK                 MARK (len > 0)
//! Hunting ---------> Accumulating ---------------> FrameReady
//!    ^                 |     ^  \                      |
//!    |   len > N       |     |   MARK (len == 0)       | take_frame()
//!    +-----------------+     +-------------------------+
//! ```
//!
//! The closing delimiter of one frame doubles as the opening delimiter of the
//! next. While a frame is pending no bytes are pulled, so the single frame
//! slot is never overwritten and backpressure lands in the source buffer.

use ventlink_proto::{ByteSource, FRAMING_MARK, RX_FRAME_LENGTH_MAX};

/// Largest frame body, between but excluding the two delimiters, that an
/// inbound message can encode to.
pub const RX_FRAME_BODY_MAX: usize = RX_FRAME_LENGTH_MAX - 2;

/// Synchronisation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DetectorState {
    /// Discarding bytes until a delimiter is seen.
    Hunting,
    /// Inside a frame, collecting bytes.
    Accumulating,
    /// A complete frame is waiting to be taken.
    FrameReady,
}

/// Diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DetectorStats {
    /// Frames completed.
    pub frames: u32,
    /// Frames abandoned for exceeding the slot size.
    pub overflows: u32,
    /// Bytes thrown away while hunting or in abandoned frames.
    pub discarded_bytes: u32,
}

/// Recovers delimited frames from a byte source.
///
/// `N` is the largest frame (without delimiters) the detector accepts.
pub struct FrameDetector<S, const N: usize = RX_FRAME_BODY_MAX> {
    source: S,
    buf: [u8; N],
    len: usize,
    state: DetectorState,
    stats: DetectorStats,
}

impl<S: ByteSource, const N: usize> FrameDetector<S, N> {
    /// Create a detector reading from `source`. Call [`begin`](Self::begin)
    /// before polling.
    pub const fn new(source: S) -> Self {
        Self {
            source,
            buf: [0; N],
            len: 0,
            state: DetectorState::Hunting,
            stats: DetectorStats {
                frames: 0,
                overflows: 0,
                discarded_bytes: 0,
            },
        }
    }

    /// Reset synchronisation and start the underlying source.
    ///
    /// Returns whatever the source reports from its own start-up.
    pub fn begin(&mut self) -> bool {
        self.state = DetectorState::Hunting;
        self.len = 0;
        self.source.begin()
    }

    /// Pull bytes until a frame is ready or the source runs dry.
    ///
    /// Returns `true` if a frame is pending afterwards.
    pub fn poll(&mut self) -> bool {
        while self.state != DetectorState::FrameReady {
            match self.source.pop() {
                Some(byte) => self.process_byte(byte),
                None => break,
            }
        }
        self.state == DetectorState::FrameReady
    }

    /// Poll, then report whether a frame is pending.
    #[inline]
    pub fn frame_available(&mut self) -> bool {
        self.poll()
    }

    /// Length of the pending frame, or 0 if there is none.
    #[inline]
    #[must_use]
    pub fn frame_length(&self) -> usize {
        match self.state {
            DetectorState::FrameReady => self.len,
            _ => 0,
        }
    }

    /// Take the pending frame, releasing the slot.
    ///
    /// The returned bytes exclude both delimiters and are still escaped. The
    /// slice stays valid until the detector is next used.
    pub fn take_frame(&mut self) -> Option<&[u8]> {
        if self.state != DetectorState::FrameReady {
            return None;
        }
        let len = core::mem::take(&mut self.len);
        self.state = DetectorState::Accumulating;
        self.buf.get(..len)
    }

    /// Current synchronisation state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Diagnostic counters since construction.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> DetectorStats {
        self.stats
    }

    /// Get a reference to the byte source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the byte source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Decompose the detector into its byte source.
    pub fn into_source(self) -> S {
        self.source
    }

    fn process_byte(&mut self, byte: u8) {
        match self.state {
            DetectorState::Hunting => {
                if byte == FRAMING_MARK {
                    debug!("frame detector synchronised");
                    self.len = 0;
                    self.state = DetectorState::Accumulating;
                } else {
                    self.stats.discarded_bytes = self.stats.discarded_bytes.wrapping_add(1);
                }
            }
            DetectorState::Accumulating => {
                if byte == FRAMING_MARK {
                    // Back-to-back delimiters are idle fill.
                    if self.len > 0 {
                        self.stats.frames = self.stats.frames.wrapping_add(1);
                        self.state = DetectorState::FrameReady;
                        trace!("frame ready: {} bytes", self.len);
                    }
                } else if let Some(slot) = self.buf.get_mut(self.len) {
                    *slot = byte;
                    self.len += 1;
                } else {
                    warn!("frame exceeds {} bytes, resynchronising", N);
                    self.stats.overflows = self.stats.overflows.wrapping_add(1);
                    self.stats.discarded_bytes =
                        self.stats.discarded_bytes.wrapping_add(self.len as u32 + 1);
                    self.len = 0;
                    self.state = DetectorState::Hunting;
                }
            }
            // poll() never pulls a byte while a frame is pending.
            DetectorState::FrameReady => {}
        }
    }
}
