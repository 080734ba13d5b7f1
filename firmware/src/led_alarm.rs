//! On-board LED as the link fault indicator.

use defmt::{error, info, warn};
use embassy_rp::gpio::Output;
use ventlink_core::LinkAlarm;

/// Lights the LED while transmission is stale and toggles it on transmit
/// errors. The LED goes dark again when transmission recovers.
pub struct LedAlarm<'d> {
    led: Output<'d>,
    tx_errors: u32,
}

impl<'d> LedAlarm<'d> {
    #[must_use]
    pub fn new(led: Output<'d>) -> Self {
        Self { led, tx_errors: 0 }
    }

    /// Total transmit errors reported.
    #[inline]
    #[must_use]
    pub fn tx_errors(&self) -> u32 {
        self.tx_errors
    }
}

impl LinkAlarm for LedAlarm<'_> {
    fn tx_error(&mut self, count: u32) {
        self.tx_errors = self.tx_errors.wrapping_add(count);
        error!("UART transmit errors: {} (total {})", count, self.tx_errors);
        self.led.toggle();
    }

    fn tx_stale(&mut self, elapsed_ms: u64) {
        if self.led.is_set_low() {
            warn!("status link stale for {} ms", elapsed_ms);
        }
        self.led.set_high();
    }

    fn tx_recovered(&mut self) {
        info!("status link recovered");
        self.led.set_low();
    }
}
