//! Platform-agnostic link machinery for the ventilator controller.
//!
//! This crate connects the [`ventlink_proto`] frame format to a serial link
//! without knowing anything about the hardware:
//!
//! - [`CircularBuffer`]: lock-free byte FIFO between the receive interrupt and
//!   the main loop
//! - [`FrameDetector`]: recovers frames from the raw byte stream
//! - [`Comms`]: rate-limited status transmission and last-known-good receive
//! - [`Transport`], [`Clock`], [`LinkAlarm`]: the seams a board implements
//!
//! # Example
//!
//! ```
//! use ventlink_core::{CircularBuffer, Clock, Comms, CommsConfig, FrameDetector, NoAlarm,
//!     Transport, TransportError};
//! use ventlink_proto::{ControllerStatus, GuiStatus};
//!
//! struct Loopback;
//! impl Transport for Loopback {
//!     fn tx_in_progress(&self) -> bool { false }
//!     fn start_tx(&mut self, _frame: &[u8]) -> Result<(), TransportError> { Ok(()) }
//! }
//!
//! struct Epoch;
//! impl Clock for Epoch {
//!     fn now_ms(&self) -> u64 { 0 }
//! }
//!
//! let detector = FrameDetector::new(CircularBuffer::<128>::new());
//! let mut comms = Comms::new(detector, Loopback, Epoch, CommsConfig::default(), NoAlarm);
//! assert!(comms.init());
//!
//! let mut gui = GuiStatus::default();
//! comms.handler(&ControllerStatus::default(), &mut gui);
//! assert_eq!(comms.last_tx(), Some(0));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(any(test, feature = "std")), no_std)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod alarm;
pub mod circular_buffer;
pub mod comms;
pub mod config;
pub mod frame_detector;
pub mod transport;

pub use alarm::{LinkAlarm, NoAlarm};
pub use circular_buffer::{CircularBuffer, Consumer, Producer};
pub use comms::Comms;
pub use config::{CommsConfig, TX_INTERVAL_MS, TX_STALE_AFTER_MS};
pub use frame_detector::{DetectorState, DetectorStats, FrameDetector, RX_FRAME_BODY_MAX};
pub use transport::{Clock, Transport, TransportError, TxEvents};

// Re-export the protocol crate for convenience
pub use ventlink_proto;
