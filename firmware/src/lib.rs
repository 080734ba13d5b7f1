//! Ventilator controller GUI link for RP2040.
//!
//! This crate provides the board side of the controller/GUI serial link:
//! the UART transport, the millisecond clock and the LED alarm that
//! [`ventlink_core::Comms`] is wired to.
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | UART1 TX | 8    | Controller status to the GUI |
//! | UART1 RX | 9    | GUI status from the GUI |
//! | UART1 CTS| 10   | Optional, with `uart-flow-control` |
//! | UART1 RTS| 11   | Optional, with `uart-flow-control` |
//! | LED      | 25   | On-board LED (link fault indicator) |
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with three concurrent tasks:
//!
//! - **RX Task**: reads UART bytes and pushes them into the receive
//!   [`CircularBuffer`](ventlink_core::CircularBuffer) producer
//! - **TX Task**: waits for a frame from [`UartTransport`] and writes it out,
//!   recording completion in [`TxEvents`](ventlink_core::TxEvents)
//! - **Control Task**: runs [`Comms::handler`](ventlink_core::Comms::handler)
//!   on a fixed tick
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//! - **`uart-flow-control`**: Enable hardware flow control (CTS/RTS on GPIO 10/11)

#![no_std]

#[cfg(all(feature = "dev-panic", feature = "prod-panic"))]
compile_error!("Cannot enable both `dev-panic` and `prod-panic` features");

pub mod config;
pub mod led_alarm;
pub mod uart;

pub use config::{LinkConfig, RX_BUFFER_SIZE};
pub use led_alarm::LedAlarm;
pub use uart::{EmbassyClock, TxChannel, TxFrame, UartTransport};

// Re-export the link layer for convenience
pub use ventlink_core::{self, ventlink_proto};
