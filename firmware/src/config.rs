//! Board-level link configuration.

use ventlink_core::CommsConfig;

/// Receive ring buffer size. Holds a few maximum-size frames so the control
/// loop can fall behind by several ticks without losing bytes.
pub const RX_BUFFER_SIZE: usize = 512;

/// Serial link parameters.
pub struct LinkConfig;

impl LinkConfig {
    /// UART baud rate, 8N1.
    pub const BAUD_RATE: u32 = 115_200;

    /// Period of the control loop that drives the link.
    pub const CONTROL_TICK_MS: u64 = 10;

    /// Link timing.
    pub const COMMS: CommsConfig = CommsConfig::new();
}
