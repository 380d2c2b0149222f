//! Trade session state machine
//!
//! A [`TradeSession`] is one negotiation between the local party and one
//! partner: two offers plus a status.
//!
//! ```text
//! Pending ──accept──▶ Negotiating ──both confirmed──▶ Confirming ──commit ok──▶ Completed
//!    │                     │                              │
//!    └──decline/timeout────┴────────────cancel────────────┴──commit rejected──▶ Cancelled
//! ```
//!
//! `are_both_confirmed` is re-derived from the current offers after every
//! change, so the order in which local and partner events arrive does not
//! matter.

use crate::error::{ProtocolError, Result};
use crate::ports::CommitTicket;
use crate::state::{CancelReason, TradeStatus};
use barter_core::{ItemId, ItemRef, Offer, PartyInfo, Tick};
use tracing::debug;

/// One negotiation between the local party and a partner
#[derive(Debug, Clone)]
pub struct TradeSession {
    partner: PartyInfo,
    local_offer: Offer,
    partner_offer: Offer,
    status: TradeStatus,
    /// Tick at which the session was opened
    opened_at: Tick,
    /// Outstanding commit attempt, set on entering Confirming
    commit: Option<CommitTicket>,
    /// Tick at which the commit attempt was issued
    commit_issued_at: Option<Tick>,
    cancel_reason: Option<CancelReason>,
}

impl TradeSession {
    /// Open a session by inviting `partner`; starts in `Pending`
    pub fn invite(partner: PartyInfo, now: Tick) -> Self {
        Self::with_status(partner, TradeStatus::Pending, now)
    }

    /// Open a session directly in `Negotiating`
    pub fn negotiate(partner: PartyInfo, now: Tick) -> Self {
        Self::with_status(partner, TradeStatus::Negotiating, now)
    }

    fn with_status(partner: PartyInfo, status: TradeStatus, now: Tick) -> Self {
        Self {
            partner,
            local_offer: Offer::new(),
            partner_offer: Offer::new(),
            status,
            opened_at: now,
            commit: None,
            commit_issued_at: None,
            cancel_reason: None,
        }
    }

    pub fn partner(&self) -> &PartyInfo {
        &self.partner
    }

    pub fn status(&self) -> TradeStatus {
        self.status
    }

    pub fn local_offer(&self) -> &Offer {
        &self.local_offer
    }

    pub fn partner_offer(&self) -> &Offer {
        &self.partner_offer
    }

    pub fn opened_at(&self) -> Tick {
        self.opened_at
    }

    pub fn commit_ticket(&self) -> Option<CommitTicket> {
        self.commit
    }

    /// Tick at which the outstanding commit was issued
    pub fn commit_issued_at(&self) -> Option<Tick> {
        self.commit_issued_at
    }

    pub fn cancel_reason(&self) -> Option<&CancelReason> {
        self.cancel_reason.as_ref()
    }

    /// Both offers are confirmed right now
    pub fn are_both_confirmed(&self) -> bool {
        self.local_offer.is_confirmed() && self.partner_offer.is_confirmed()
    }

    /// The partner accepted our invitation
    pub fn partner_accepted(&mut self, name: impl Into<String>) -> Result<()> {
        if self.status != TradeStatus::Pending {
            return Err(self.not_allowed("request-accepted"));
        }
        self.partner.name = name.into();
        self.set_status(TradeStatus::Negotiating);
        Ok(())
    }

    // Local side. Every method reports a refused precondition as `false`.

    pub fn add_local(&mut self, item: ItemRef) -> bool {
        self.status.allows_offer_edits() && self.local_offer.add(item)
    }

    pub fn remove_local(&mut self, id: &ItemId) -> bool {
        self.status.allows_offer_edits() && self.local_offer.remove(id)
    }

    pub fn confirm_local(&mut self) -> bool {
        if !self.status.allows_offer_edits() {
            return false;
        }
        self.local_offer.confirm();
        true
    }

    pub fn unconfirm_local(&mut self) -> bool {
        if !self.status.allows_offer_edits() {
            return false;
        }
        self.local_offer.unconfirm();
        true
    }

    // Partner side. A refused event is a protocol violation.

    pub fn add_partner(&mut self, item: ItemRef) -> Result<()> {
        self.require_edits("partner-item-added")?;
        let id = item.id.clone();
        if !self.partner_offer.add(item) {
            return Err(ProtocolError::DuplicateItem(id));
        }
        Ok(())
    }

    pub fn remove_partner(&mut self, id: &ItemId) -> Result<()> {
        self.require_edits("partner-item-removed")?;
        if !self.partner_offer.remove(id) {
            return Err(ProtocolError::ItemNotOffered(id.clone()));
        }
        Ok(())
    }

    pub fn confirm_partner(&mut self) -> Result<()> {
        self.require_edits("partner-confirmed")?;
        self.partner_offer.confirm();
        Ok(())
    }

    pub fn unconfirm_partner(&mut self) -> Result<()> {
        self.require_edits("partner-unconfirmed")?;
        self.partner_offer.unconfirm();
        Ok(())
    }

    /// Move to `Confirming` if both offers are confirmed
    ///
    /// Returns true if the transition happened. Call after every offer or
    /// confirmation change on either side.
    pub fn advance(&mut self) -> bool {
        if self.status == TradeStatus::Negotiating && self.are_both_confirmed() {
            self.set_status(TradeStatus::Confirming);
            return true;
        }
        false
    }

    /// Record the commit attempt issued for this session at `now`
    pub fn attach_commit(&mut self, ticket: CommitTicket, now: Tick) {
        self.commit = Some(ticket);
        self.commit_issued_at = Some(now);
    }

    /// Whether an outcome for `ticket` belongs to this session
    pub fn awaits(&self, ticket: CommitTicket) -> bool {
        self.status == TradeStatus::Confirming && self.commit == Some(ticket)
    }

    /// Commit succeeded
    pub fn complete(&mut self, ticket: CommitTicket) -> bool {
        if !self.awaits(ticket) {
            return false;
        }
        self.set_status(TradeStatus::Completed);
        true
    }

    /// Cancel from any non-terminal state
    pub fn cancel(&mut self, reason: CancelReason) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        debug!(partner = %self.partner.id, %reason, "trade cancelled");
        self.cancel_reason = Some(reason);
        self.set_status(TradeStatus::Cancelled);
        true
    }

    /// Drop both offers and the commit ticket
    pub fn clear(&mut self) {
        self.local_offer.clear();
        self.partner_offer.clear();
        self.commit = None;
        self.commit_issued_at = None;
    }

    fn set_status(&mut self, status: TradeStatus) {
        debug!(partner = %self.partner.id, from = %self.status, to = %status, "trade status");
        self.status = status;
    }

    fn require_edits(&self, event: &'static str) -> Result<()> {
        if self.status.allows_offer_edits() {
            Ok(())
        } else {
            Err(self.not_allowed(event))
        }
    }

    fn not_allowed(&self, event: &'static str) -> ProtocolError {
        ProtocolError::NotAllowed {
            event,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barter_core::{ItemInstance, Rarity};

    fn bob() -> PartyInfo {
        PartyInfo::new("bob", "Bob")
    }

    fn egg(id: &str) -> ItemRef {
        ItemInstance::with_rarity(id, "Egg", Rarity::Common).to_ref()
    }

    #[test]
    fn test_invite_then_accept() {
        let mut session = TradeSession::invite(PartyInfo::new("bob", "?"), 3);
        assert_eq!(session.status(), TradeStatus::Pending);
        assert_eq!(session.opened_at(), 3);

        // No edits before the partner is in
        assert!(!session.add_local(egg("e1")));
        assert!(!session.confirm_local());

        session.partner_accepted("Bob").unwrap();
        assert_eq!(session.status(), TradeStatus::Negotiating);
        assert_eq!(session.partner().name, "Bob");
        assert!(session.partner_accepted("Bob").is_err());
    }

    #[test]
    fn test_both_confirmed_moves_to_confirming() {
        let mut session = TradeSession::negotiate(bob(), 0);
        assert!(session.add_local(egg("e1")));
        assert!(session.confirm_local());
        assert!(!session.advance());

        session.confirm_partner().unwrap();
        assert!(session.are_both_confirmed());
        assert!(session.advance());
        assert_eq!(session.status(), TradeStatus::Confirming);
    }

    #[test]
    fn test_mutation_resets_only_mutators_confirmation() {
        let mut session = TradeSession::negotiate(bob(), 0);
        session.confirm_partner().unwrap();
        session.confirm_local();
        // Simulate interleaving where the partner's item arrives after
        // its confirmation: the partner's flag drops, ours stays.
        session.add_partner(egg("p1")).unwrap();
        assert!(session.local_offer().is_confirmed());
        assert!(!session.partner_offer().is_confirmed());
        assert!(!session.are_both_confirmed());
        assert!(!session.advance());

        session.confirm_partner().unwrap();
        session.add_local(egg("e1"));
        assert!(session.partner_offer().is_confirmed());
        assert!(!session.local_offer().is_confirmed());
        assert_eq!(session.status(), TradeStatus::Negotiating);
    }

    #[test]
    fn test_confirming_rejects_edits() {
        let mut session = TradeSession::negotiate(bob(), 0);
        session.add_local(egg("e1"));
        session.confirm_local();
        session.confirm_partner().unwrap();
        session.advance();

        assert!(!session.remove_local(&ItemId::new("e1")));
        assert!(!session.add_local(egg("e2")));
        assert!(!session.unconfirm_local());
        assert_eq!(session.local_offer().len(), 1);
        assert!(session.local_offer().is_confirmed());
        assert_eq!(session.status(), TradeStatus::Confirming);

        assert!(matches!(
            session.unconfirm_partner(),
            Err(ProtocolError::NotAllowed { status: TradeStatus::Confirming, .. })
        ));
    }

    #[test]
    fn test_partner_duplicate_and_absent() {
        let mut session = TradeSession::negotiate(bob(), 0);
        session.add_partner(egg("p1")).unwrap();
        assert_eq!(
            session.add_partner(egg("p1")),
            Err(ProtocolError::DuplicateItem(ItemId::new("p1")))
        );
        assert_eq!(
            session.remove_partner(&ItemId::new("p2")),
            Err(ProtocolError::ItemNotOffered(ItemId::new("p2")))
        );
    }

    #[test]
    fn test_commit_ticket_matching() {
        let mut session = TradeSession::negotiate(bob(), 0);
        session.confirm_local();
        session.confirm_partner().unwrap();
        session.advance();
        session.attach_commit(CommitTicket(4), 12);
        assert_eq!(session.commit_issued_at(), Some(12));

        assert!(!session.complete(CommitTicket(3)));
        assert!(session.complete(CommitTicket(4)));
        assert_eq!(session.status(), TradeStatus::Completed);
        assert!(!session.cancel(CancelReason::LocalCancel));
    }

    #[test]
    fn test_cancel_then_late_commit() {
        let mut session = TradeSession::negotiate(bob(), 0);
        session.confirm_local();
        session.confirm_partner().unwrap();
        session.advance();
        session.attach_commit(CommitTicket(1), 0);

        assert!(session.cancel(CancelReason::LocalCancel));
        assert!(!session.complete(CommitTicket(1)));
        assert_eq!(session.status(), TradeStatus::Cancelled);
        assert_eq!(session.cancel_reason(), Some(&CancelReason::LocalCancel));
    }

    #[test]
    fn test_clear() {
        let mut session = TradeSession::negotiate(bob(), 0);
        session.add_local(egg("e1"));
        session.add_partner(egg("p1")).unwrap();
        session.clear();
        assert!(session.local_offer().is_empty());
        assert!(session.partner_offer().is_empty());
        assert!(session.commit_ticket().is_none());
    }
}
