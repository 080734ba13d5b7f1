//! Link health notifications.

/// Receives link fault notifications from [`Comms`](crate::Comms).
///
/// Every hook defaults to doing nothing; implement the ones the application
/// wants to raise alarms for.
pub trait LinkAlarm {
    /// `count` transmissions failed since the previous notification.
    fn tx_error(&mut self, count: u32) {
        let _ = count;
    }

    /// Nothing has been transmitted for `elapsed_ms`. Repeated every handler
    /// call while the condition lasts.
    fn tx_stale(&mut self, elapsed_ms: u64) {
        let _ = elapsed_ms;
    }

    /// Transmission resumed after [`tx_stale`](Self::tx_stale) was reported.
    fn tx_recovered(&mut self) {}
}

impl<A: LinkAlarm + ?Sized> LinkAlarm for &mut A {
    fn tx_error(&mut self, count: u32) {
        (**self).tx_error(count);
    }

    fn tx_stale(&mut self, elapsed_ms: u64) {
        (**self).tx_stale(elapsed_ms);
    }

    fn tx_recovered(&mut self) {
        (**self).tx_recovered();
    }
}

/// Alarm hook that ignores everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoAlarm;

impl LinkAlarm for NoAlarm {}
