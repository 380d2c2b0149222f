//! Trade status and cancellation reasons

use crate::ports::CommitRejection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a trade session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Invitation sent, waiting for the partner to accept
    Pending,
    /// Both parties may edit their offers
    Negotiating,
    /// Both offers confirmed; one commit attempt is in flight
    Confirming,
    /// Commit succeeded
    Completed,
    /// Cancelled, declined, timed out or rejected
    Cancelled,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeStatus::Completed | TradeStatus::Cancelled)
    }

    /// Offers and confirmations may only change while negotiating
    pub fn allows_offer_edits(&self) -> bool {
        matches!(self, TradeStatus::Negotiating)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Negotiating => "negotiating",
            TradeStatus::Confirming => "confirming",
            TradeStatus::Completed => "completed",
            TradeStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Why a session ended in `Cancelled`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// The local party cancelled
    LocalCancel,
    /// The partner cancelled
    PartnerCancelled,
    /// The partner declined the invitation
    PartnerDeclined,
    /// The partner withdrew an invitation we had already accepted
    PartnerWithdrew,
    /// The partner's connection went away
    PartnerDisconnected,
    /// The invitation was not answered in time
    Timeout,
    /// A new trade replaced this one
    Superseded,
    /// The authority refused the commit
    CommitRejected(CommitRejection),
    /// The authority did not answer the commit in time
    CommitTimedOut,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::LocalCancel => f.write_str("cancelled"),
            CancelReason::PartnerCancelled => f.write_str("partner cancelled"),
            CancelReason::PartnerDeclined => f.write_str("partner declined"),
            CancelReason::PartnerWithdrew => f.write_str("partner withdrew the invitation"),
            CancelReason::PartnerDisconnected => f.write_str("partner disconnected"),
            CancelReason::Timeout => f.write_str("timed out"),
            CancelReason::Superseded => f.write_str("replaced by a new trade"),
            CancelReason::CommitRejected(rejection) => write!(f, "commit rejected: {}", rejection),
            CancelReason::CommitTimedOut => f.write_str("commit timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TradeStatus::Completed.is_terminal());
        assert!(TradeStatus::Cancelled.is_terminal());
        assert!(!TradeStatus::Pending.is_terminal());
        assert!(!TradeStatus::Confirming.is_terminal());
    }

    #[test]
    fn test_only_negotiating_allows_edits() {
        assert!(TradeStatus::Negotiating.allows_offer_edits());
        assert!(!TradeStatus::Pending.allows_offer_edits());
        assert!(!TradeStatus::Confirming.allows_offer_edits());
    }

    #[test]
    fn test_cancel_reason_display() {
        let reason = CancelReason::CommitRejected(CommitRejection::ItemNoLongerOwned("e1".into()));
        assert_eq!(reason.to_string(), "commit rejected: item no longer owned: e1");
        assert_eq!(CancelReason::CommitTimedOut.to_string(), "commit timed out");
        assert_eq!(
            CancelReason::PartnerWithdrew.to_string(),
            "partner withdrew the invitation"
        );
    }
}
