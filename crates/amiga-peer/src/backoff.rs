use std::time::Duration;

/// Exponential, capped reconnection schedule.
///
/// The delay slept before attempt `k` (0-indexed) is
/// `unit * min(2^k, cap_units)`. The delay precedes every attempt, the first
/// one included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub unit: Duration,
    pub cap_units: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            cap_units: 10,
        }
    }
}

impl BackoffPolicy {
    /// Delay before attempt `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let units = 1u32
            .checked_shl(attempt)
            .unwrap_or(u32::MAX)
            .min(self.cap_units);
        self.unit.saturating_mul(units)
    }

    /// Delays for `max_retries` attempts, in order.
    pub fn schedule(&self, max_retries: u32) -> impl Iterator<Item = Duration> + '_ {
        (0..max_retries).map(|attempt| self.delay(attempt))
    }
}

/// Lifecycle of a channel's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Unconnected,
    Connecting,
    Connected,
    Closed,
}

/// Inputs driving [`ConnectionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connect sequence started.
    Dial,
    /// A dial attempt succeeded.
    Established,
    /// Every attempt of the connect sequence failed.
    GaveUp,
    /// The live connection broke.
    Failed,
    /// The owner released the connection.
    Close,
}

impl ConnectionState {
    /// Next state after `event`. Events that do not apply leave the state alone.
    pub fn next(self, event: ConnectionEvent) -> ConnectionState {
        use ConnectionEvent as E;
        use ConnectionState as S;
        match (self, event) {
            (S::Unconnected | S::Closed, E::Dial) => S::Connecting,
            (S::Connecting, E::Established) => S::Connected,
            (S::Connecting, E::GaveUp) => S::Closed,
            (S::Connected, E::Failed) => S::Closed,
            (_, E::Close) => S::Closed,
            (state, _) => state,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}
