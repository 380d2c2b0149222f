//! Trade configuration - timeouts and capacities
//!
//! All durations are in simulation ticks. The embedding simulation drives
//! time through `TradeController::tick`.

use barter_core::Tick;
use serde::{Deserialize, Serialize};

/// Configuration for a trade controller
///
/// # Example
///
/// ```
/// use barter_session::TradeConfig;
///
/// let config = TradeConfig::default();
/// assert_eq!(config.pending_timeout_ticks, 600);
///
/// let config = TradeConfig::default().with_max_queued_requests(0);
/// assert_eq!(config.max_queued_requests, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    /// Queued requests older than this are dropped
    pub request_timeout_ticks: Tick,
    /// A `Pending` invitation unanswered for this long is cancelled
    pub pending_timeout_ticks: Tick,
    /// A `Confirming` session whose commit is unanswered for this long is
    /// cancelled
    pub commit_timeout_ticks: Tick,
    /// Maximum number of queued trade requests (at least 1)
    pub max_queued_requests: usize,
    /// Number of concluded trades kept in history (0 disables history)
    pub history_capacity: usize,
}

impl TradeConfig {
    /// Set the request queue bound, clamped to at least 1
    pub fn with_max_queued_requests(mut self, n: usize) -> Self {
        self.max_queued_requests = n.max(1);
        self
    }

    pub fn with_pending_timeout(mut self, ticks: Tick) -> Self {
        self.pending_timeout_ticks = ticks;
        self
    }

    pub fn with_request_timeout(mut self, ticks: Tick) -> Self {
        self.request_timeout_ticks = ticks;
        self
    }

    pub fn with_commit_timeout(mut self, ticks: Tick) -> Self {
        self.commit_timeout_ticks = ticks;
        self
    }
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ticks: 600,
            pending_timeout_ticks: 600,
            commit_timeout_ticks: 600,
            max_queued_requests: 8,
            history_capacity: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TradeConfig::default();
        assert_eq!(config.request_timeout_ticks, 600);
        assert_eq!(config.commit_timeout_ticks, 600);
        assert_eq!(config.max_queued_requests, 8);
        assert_eq!(config.history_capacity, 32);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: TradeConfig = ron::from_str("(pending_timeout_ticks: 30)").unwrap();
        assert_eq!(config.pending_timeout_ticks, 30);
        assert_eq!(config.request_timeout_ticks, 600);
    }

    #[test]
    fn test_builders() {
        let config = TradeConfig::default()
            .with_pending_timeout(5)
            .with_request_timeout(7)
            .with_commit_timeout(9)
            .with_max_queued_requests(3);
        assert_eq!(config.pending_timeout_ticks, 5);
        assert_eq!(config.request_timeout_ticks, 7);
        assert_eq!(config.commit_timeout_ticks, 9);
        assert_eq!(config.max_queued_requests, 3);
    }
}
