//! Link timing configuration.

/// Default interval between controller status transmissions.
pub const TX_INTERVAL_MS: u64 = 30;

/// Default time without a successful transmission before the link is reported
/// stale.
pub const TX_STALE_AFTER_MS: u64 = 1000;

/// Timing parameters for [`Comms`](crate::Comms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommsConfig {
    /// Minimum time between transmissions. A transmission happens once strictly
    /// more than this has elapsed.
    pub tx_interval_ms: u64,
    /// Time without a transmission after which [`LinkAlarm::tx_stale`] fires.
    ///
    /// [`LinkAlarm::tx_stale`]: crate::LinkAlarm::tx_stale
    pub tx_stale_after_ms: u64,
}

impl CommsConfig {
    pub const fn new() -> Self {
        Self {
            tx_interval_ms: TX_INTERVAL_MS,
            tx_stale_after_ms: TX_STALE_AFTER_MS,
        }
    }

    #[must_use]
    pub const fn with_tx_interval_ms(mut self, ms: u64) -> Self {
        self.tx_interval_ms = ms;
        self
    }

    #[must_use]
    pub const fn with_tx_stale_after_ms(mut self, ms: u64) -> Self {
        self.tx_stale_after_ms = ms;
        self
    }
}

impl Default for CommsConfig {
    fn default() -> Self {
        Self::new()
    }
}
