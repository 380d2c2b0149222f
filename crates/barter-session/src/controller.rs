//! Trade controller - owns the local party's trade state
//!
//! The controller is the only owner of the active [`TradeSession`] and the
//! [`RequestQueue`]. Everything happens synchronously inside `&mut self`
//! calls: local user actions, inbound partner envelopes, commit outcomes
//! and clock ticks.
//!
//! Outbound traffic is not sent directly. Every local change queues an
//! [`Outbound`] that the sync layer collects with
//! [`TradeController::drain_outbound`].
//!
//! ```rust,ignore
//! let mut trade = TradeController::new(me, authority, inventory);
//! trade.on_cancel(|partner, reason| println!("trade with {} ended: {}", partner.name, reason));
//!
//! trade.invite(PartyInfo::new("bob", "Bob"));
//! for outbound in trade.drain_outbound() {
//!     adapter.send(outbound);
//! }
//! ```

use crate::config::TradeConfig;
use crate::error::{ProtocolError, Result};
use crate::history::{TradeHistory, TradeOutcome, TradeRecord};
use crate::hooks::{Observers, OfferSide, SubscriptionId, TradeAction, TradeEvent};
use crate::ports::{CommitAuthority, CommitOutcome, CommitProposal, CommitTicket, Inventory};
use crate::queue::{Enqueued, RequestQueue, TradeRequest};
use crate::session::TradeSession;
use crate::state::{CancelReason, TradeStatus};
use barter_core::{
    find_group, group, resolve_selection, toggle_selection, Envelope, ItemCatalog, ItemId,
    ItemInstance, ItemRef, Outbound, PartnerEvent, PartyId, PartyInfo, SelectionAction, StackKey,
    StackedGroup, Tick,
};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Owns one party's trade session, request queue and hooks
pub struct TradeController<A, I> {
    local: PartyInfo,
    config: TradeConfig,
    authority: A,
    inventory: I,
    /// When set, partner items of unknown type are refused
    catalog: Option<ItemCatalog>,
    /// Never holds a terminal session; those are torn down immediately
    session: Option<TradeSession>,
    requests: RequestQueue,
    observers: Observers,
    outbox: Vec<Outbound>,
    selected: Option<StackKey>,
    visible: bool,
    history: TradeHistory,
    next_ticket: u64,
    now: Tick,
}

impl<A: CommitAuthority, I: Inventory> TradeController<A, I> {
    /// Create a controller with the default configuration
    pub fn new(local: PartyInfo, authority: A, inventory: I) -> Self {
        Self::with_config(local, authority, inventory, TradeConfig::default())
    }

    pub fn with_config(local: PartyInfo, authority: A, inventory: I, config: TradeConfig) -> Self {
        Self {
            requests: RequestQueue::new(config.max_queued_requests),
            history: TradeHistory::new(config.history_capacity),
            local,
            config,
            authority,
            inventory,
            catalog: None,
            session: None,
            observers: Observers::new(),
            outbox: Vec::new(),
            selected: None,
            visible: false,
            next_ticket: 1,
            now: 0,
        }
    }

    /// Refuse partner items whose type is not in `catalog`
    pub fn with_catalog(mut self, catalog: ItemCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn local(&self) -> &PartyInfo {
        &self.local
    }

    pub fn config(&self) -> &TradeConfig {
        &self.config
    }

    /// The active session, if any
    pub fn session(&self) -> Option<&TradeSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> Option<TradeStatus> {
        self.session.as_ref().map(|s| s.status())
    }

    /// Both offers of the active session are confirmed right now
    pub fn are_both_confirmed(&self) -> bool {
        self.session
            .as_ref()
            .map(|s| s.are_both_confirmed())
            .unwrap_or(false)
    }

    /// The request currently surfaced to the user
    pub fn current_request(&self) -> Option<&TradeRequest> {
        self.requests.peek_current()
    }

    pub fn requests(&self) -> &RequestQueue {
        &self.requests
    }

    pub fn history(&self) -> &TradeHistory {
        &self.history
    }

    pub fn selected(&self) -> Option<&StackKey> {
        self.selected.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    pub fn authority_mut(&mut self) -> &mut A {
        &mut self.authority
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    pub fn inventory_mut(&mut self) -> &mut I {
        &mut self.inventory
    }

    /// Take every queued outbound event
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Local inventory stacks not yet in the local offer
    pub fn local_stacks(&self) -> Vec<StackedGroup<ItemInstance>> {
        let owned = self.inventory.owned_items(&self.local.id);
        match &self.session {
            Some(session) => session.local_offer().available_stacks(&owned),
            None => group(&owned),
        }
    }

    pub fn local_offer_stacks(&self) -> Vec<StackedGroup<ItemRef>> {
        self.session
            .as_ref()
            .map(|s| s.local_offer().stacks())
            .unwrap_or_default()
    }

    pub fn partner_offer_stacks(&self) -> Vec<StackedGroup<ItemRef>> {
        self.session
            .as_ref()
            .map(|s| s.partner_offer().stacks())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Receive every [`TradeEvent`]
    pub fn subscribe(&mut self, handler: impl FnMut(&TradeEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn on_item_selected(&mut self, mut f: impl FnMut(&SelectionAction) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::ItemSelected(action) = event {
                f(action);
            }
        })
    }

    pub fn on_action(&mut self, mut f: impl FnMut(&TradeAction) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::Action(action) = event {
                f(action);
            }
        })
    }

    pub fn on_visibility_changed(&mut self, mut f: impl FnMut(bool) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::VisibilityChanged(visible) = event {
                f(*visible);
            }
        })
    }

    pub fn on_trade_request(&mut self, mut f: impl FnMut(&TradeRequest) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::TradeRequest(request) = event {
                f(request);
            }
        })
    }

    pub fn on_accept(&mut self, mut f: impl FnMut(&PartyInfo) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::Accept(partner) = event {
                f(partner);
            }
        })
    }

    pub fn on_decline(&mut self, mut f: impl FnMut(&TradeRequest) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::Decline(request) = event {
                f(request);
            }
        })
    }

    pub fn on_offer_changed(&mut self, mut f: impl FnMut(OfferSide) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::OfferChanged { side, .. } = event {
                f(*side);
            }
        })
    }

    pub fn on_complete(&mut self, mut f: impl FnMut(&PartyInfo) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::Completed { partner } = event {
                f(partner);
            }
        })
    }

    pub fn on_cancel(&mut self, mut f: impl FnMut(&PartyInfo, &CancelReason) + 'static) -> SubscriptionId {
        self.subscribe(move |event| {
            if let TradeEvent::Cancelled { partner, reason } = event {
                f(partner, reason);
            }
        })
    }

    /// Show or hide the trade panel
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        self.observers.notify(&TradeEvent::VisibilityChanged(visible));
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Invite `partner` to trade; the new session waits in `Pending`
    ///
    /// Any active session is cancelled first. Returns false when inviting
    /// ourselves.
    pub fn invite(&mut self, partner: PartyInfo) -> bool {
        if partner.id == self.local.id {
            return false;
        }
        let to = partner.id.clone();
        self.replace_session(TradeSession::invite(partner, self.now));
        self.authority.request_trade(&self.local, &to);
        self.outbox.push(Outbound::new(
            to.clone(),
            PartnerEvent::TradeRequestReceived {
                from_name: self.local.name.clone(),
            },
        ));
        self.observers
            .notify(&TradeEvent::Action(TradeAction::Invited(to)));
        true
    }

    /// Open a session with `partner` directly in `Negotiating`
    ///
    /// Any active session is cancelled first and nothing from it carries
    /// over. Nothing is sent to `partner`: both sides are expected to call
    /// `start_trade` for each other, otherwise the partner refuses our
    /// offer events with `NoActiveSession`.
    pub fn start_trade(&mut self, partner: PartyInfo) -> bool {
        if partner.id == self.local.id {
            return false;
        }
        self.replace_session(TradeSession::negotiate(partner.clone(), self.now));
        self.observers.notify(&TradeEvent::Accept(partner));
        true
    }

    /// Accept the current request and start negotiating with its sender
    pub fn accept_current_request(&mut self) -> bool {
        let Some(request) = self.requests.dequeue_current() else {
            return false;
        };
        let partner = PartyInfo::new(request.from_party_id.clone(), request.from_party_name);
        self.replace_session(TradeSession::negotiate(partner.clone(), self.now));
        self.outbox.push(Outbound::new(
            partner.id.clone(),
            PartnerEvent::RequestAccepted {
                name: self.local.name.clone(),
            },
        ));
        info!(partner = %partner.id, "trade request accepted");
        self.observers.notify(&TradeEvent::Accept(partner));
        self.surface_current();
        true
    }

    /// Decline the current request
    pub fn decline_current_request(&mut self) -> bool {
        let Some(request) = self.requests.dequeue_current() else {
            return false;
        };
        self.outbox.push(Outbound::new(
            request.from_party_id.clone(),
            PartnerEvent::RequestDeclined,
        ));
        debug!(partner = %request.from_party_id, "trade request declined");
        self.observers.notify(&TradeEvent::Decline(request));
        self.surface_current();
        true
    }

    /// Cancel the active session
    ///
    /// Effective immediately; a commit outcome arriving afterwards is
    /// discarded.
    pub fn cancel(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let status = session.status();
        let partner = session.partner().id.clone();
        if !session.cancel(CancelReason::LocalCancel) {
            return false;
        }
        self.outbox.push(Outbound::new(partner, farewell(status)));
        self.observers
            .notify(&TradeEvent::Action(TradeAction::Cancelled));
        self.finish();
        true
    }

    /// The connection to `party` is gone
    pub fn partner_disconnected(&mut self, party: &PartyId) {
        if let Some((_, was_current)) = self.requests.withdraw(party) {
            if was_current {
                self.surface_current();
            }
        }
        if let Some(session) = self.session.as_mut() {
            if &session.partner().id == party {
                session.cancel(CancelReason::PartnerDisconnected);
                self.finish();
            }
        }
    }

    /// Advance the clock, expiring stale requests, invitations and commits
    pub fn tick(&mut self, now: Tick) {
        self.now = now;

        let current_before = self.requests.peek_current().map(|r| r.from_party_id.clone());
        let expired = self.requests.expire(now, self.config.request_timeout_ticks);
        for request in &expired {
            debug!(partner = %request.from_party_id, "trade request expired");
        }
        let current_after = self.requests.peek_current().map(|r| r.from_party_id.clone());
        if !expired.is_empty() && current_after.is_some() && current_after != current_before {
            self.surface_current();
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let status = session.status();
        let reason = match status {
            TradeStatus::Pending
                if now.saturating_sub(session.opened_at()) >= self.config.pending_timeout_ticks =>
            {
                CancelReason::Timeout
            }
            TradeStatus::Confirming
                if session
                    .commit_issued_at()
                    .is_some_and(|at| now.saturating_sub(at) >= self.config.commit_timeout_ticks) =>
            {
                warn!(
                    partner = %session.partner().id,
                    ticket = ?session.commit_ticket().map(|t| t.0),
                    "commit unanswered, cancelling trade"
                );
                CancelReason::CommitTimedOut
            }
            _ => return,
        };
        let partner = session.partner().id.clone();
        session.cancel(reason);
        self.outbox.push(Outbound::new(partner, farewell(status)));
        self.finish();
    }

    // ------------------------------------------------------------------
    // Local offer
    // ------------------------------------------------------------------

    /// Click a stack in the local inventory panel
    ///
    /// Returns `None` if no available stack has that key.
    pub fn click_stack(&mut self, key: &StackKey) -> Option<SelectionAction> {
        let stacks = self.local_stacks();
        let group = find_group(&stacks, key)?;
        let action = toggle_selection(group, self.selected.as_ref());
        self.selected = match &action {
            SelectionAction::Select(key) => Some(key.clone()),
            SelectionAction::Deselect(_) => None,
        };
        self.observers
            .notify(&TradeEvent::ItemSelected(action.clone()));
        Some(action)
    }

    /// Offer `count` items from the selected stack
    pub fn offer_selected(&mut self, count: usize) -> Vec<ItemId> {
        match self.selected.clone() {
            Some(key) => self.offer_from_stack(&key, count),
            None => Vec::new(),
        }
    }

    /// Put one owned item into the local offer
    pub fn offer_item(&mut self, id: &ItemId) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(item) = self.inventory.find_item(&self.local.id, id) else {
            return false;
        };
        let item = item.to_ref();
        if !session.add_local(item.clone()) {
            return false;
        }
        let partner = session.partner().id.clone();
        let revision = session.local_offer().revision();
        self.outbox
            .push(Outbound::new(partner, PartnerEvent::ItemAdded { item }));
        self.observers
            .notify(&TradeEvent::Action(TradeAction::Offered(id.clone())));
        self.observers.notify(&TradeEvent::OfferChanged {
            side: OfferSide::Local,
            revision,
        });
        self.reevaluate();
        true
    }

    /// Offer the first `count` available items of a stack
    ///
    /// Returns the ids actually offered.
    pub fn offer_from_stack(&mut self, key: &StackKey, count: usize) -> Vec<ItemId> {
        let stacks = self.local_stacks();
        let Some(group) = find_group(&stacks, key) else {
            return Vec::new();
        };
        resolve_selection(group, count)
            .into_iter()
            .filter(|id| self.offer_item(id))
            .collect()
    }

    /// Take one item out of the local offer
    pub fn withdraw_item(&mut self, id: &ItemId) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.remove_local(id) {
            return false;
        }
        let partner = session.partner().id.clone();
        let revision = session.local_offer().revision();
        self.outbox
            .push(Outbound::new(partner, PartnerEvent::ItemRemoved { id: id.clone() }));
        self.observers
            .notify(&TradeEvent::Action(TradeAction::Withdrew(id.clone())));
        self.observers.notify(&TradeEvent::OfferChanged {
            side: OfferSide::Local,
            revision,
        });
        self.reevaluate();
        true
    }

    /// Take the first `count` items of an offered stack back out
    pub fn withdraw_from_stack(&mut self, key: &StackKey, count: usize) -> Vec<ItemId> {
        let stacks = self.local_offer_stacks();
        let Some(group) = find_group(&stacks, key) else {
            return Vec::new();
        };
        resolve_selection(group, count)
            .into_iter()
            .filter(|id| self.withdraw_item(id))
            .collect()
    }

    /// Confirm the local offer
    ///
    /// Returns false without a session or outside `Negotiating`.
    pub fn confirm(&mut self) -> bool {
        self.set_local_confirmation(true)
    }

    /// Withdraw the local confirmation
    pub fn unconfirm(&mut self) -> bool {
        self.set_local_confirmation(false)
    }

    fn set_local_confirmation(&mut self, confirmed: bool) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let changed = if confirmed {
            session.confirm_local()
        } else {
            session.unconfirm_local()
        };
        if !changed {
            return false;
        }
        let partner = session.partner().id.clone();
        let (event, action) = if confirmed {
            (PartnerEvent::Confirmed, TradeAction::Confirmed)
        } else {
            (PartnerEvent::Unconfirmed, TradeAction::Unconfirmed)
        };
        self.outbox.push(Outbound::new(partner, event));
        self.observers.notify(&TradeEvent::Action(action));
        self.reevaluate();
        true
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Apply an inbound envelope, dropping it with a warning if refused
    pub fn handle_inbound(&mut self, envelope: Envelope) {
        let from = envelope.from.clone();
        let event = envelope.event.name();
        let seq = envelope.seq;
        if let Err(err) = self.apply_inbound(envelope) {
            warn!(%from, event, seq, error = %err, "dropping inbound trade event");
        }
    }

    /// Apply an inbound envelope
    ///
    /// On error nothing has changed.
    pub fn apply_inbound(&mut self, envelope: Envelope) -> Result<()> {
        let Envelope { from, event, .. } = envelope;
        if from == self.local.id {
            return Err(ProtocolError::FromSelf(from));
        }

        match event {
            PartnerEvent::TradeRequestReceived { from_name } => self.receive_request(from, from_name),
            PartnerEvent::TradeRequestWithdrawn => {
                if let Some((request, was_current)) = self.requests.withdraw(&from) {
                    debug!(partner = %request.from_party_id, "trade request withdrawn");
                    if was_current {
                        self.surface_current();
                    }
                    return Ok(());
                }
                // Withdrawn after we accepted: the inviter has already given up
                let session = self
                    .session_with(&from)
                    .map_err(|_| ProtocolError::NoSuchRequest(from.clone()))?;
                info!(partner = %from, "accepted invitation withdrawn");
                session.cancel(CancelReason::PartnerWithdrew);
                self.finish();
                Ok(())
            }
            PartnerEvent::RequestAccepted { name } => {
                let session = self.session_with(&from)?;
                session.partner_accepted(name)?;
                let partner = session.partner().clone();
                info!(partner = %partner.id, "trade invitation accepted");
                self.observers.notify(&TradeEvent::StatusChanged {
                    from: TradeStatus::Pending,
                    to: TradeStatus::Negotiating,
                });
                self.observers.notify(&TradeEvent::Accept(partner));
                Ok(())
            }
            PartnerEvent::RequestDeclined => {
                let session = self.session_with(&from)?;
                if session.status() != TradeStatus::Pending {
                    return Err(ProtocolError::NotAllowed {
                        event: "request-declined",
                        status: session.status(),
                    });
                }
                session.cancel(CancelReason::PartnerDeclined);
                self.finish();
                Ok(())
            }
            PartnerEvent::ItemAdded { item } => {
                self.session_with(&from)?;
                let resolved = self.resolve_partner_item(&from, &item)?;
                let session = self.session_with(&from)?;
                session.add_partner(resolved)?;
                let revision = session.partner_offer().revision();
                self.partner_offer_changed(revision);
                Ok(())
            }
            PartnerEvent::ItemRemoved { id } => {
                let session = self.session_with(&from)?;
                session.remove_partner(&id)?;
                let revision = session.partner_offer().revision();
                self.partner_offer_changed(revision);
                Ok(())
            }
            PartnerEvent::Confirmed => {
                let session = self.session_with(&from)?;
                session.confirm_partner()?;
                let revision = session.partner_offer().revision();
                self.partner_offer_changed(revision);
                Ok(())
            }
            PartnerEvent::Unconfirmed => {
                let session = self.session_with(&from)?;
                session.unconfirm_partner()?;
                let revision = session.partner_offer().revision();
                self.partner_offer_changed(revision);
                Ok(())
            }
            PartnerEvent::Cancelled => {
                let session = self.session_with(&from)?;
                session.cancel(CancelReason::PartnerCancelled);
                self.finish();
                Ok(())
            }
        }
    }

    /// Feed back the authority's answer to a commit
    ///
    /// Returns false, discarding the outcome, when it does not belong to
    /// the active session (e.g. the session was cancelled meanwhile).
    pub fn handle_commit_outcome(&mut self, outcome: CommitOutcome) -> bool {
        let Some(session) = self.session.as_mut() else {
            warn!(ticket = outcome.ticket.0, "commit outcome without active trade, discarding");
            return false;
        };
        if !session.awaits(outcome.ticket) {
            warn!(ticket = outcome.ticket.0, "stale commit outcome, discarding");
            return false;
        }
        match outcome.result {
            Ok(()) => {
                session.complete(outcome.ticket);
                info!(partner = %session.partner().id, "trade completed");
            }
            Err(rejection) => {
                warn!(partner = %session.partner().id, %rejection, "trade commit rejected");
                session.cancel(CancelReason::CommitRejected(rejection));
            }
        }
        self.finish();
        true
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn receive_request(&mut self, from: PartyId, from_name: String) -> Result<()> {
        let request = TradeRequest::new(from.clone(), from_name, self.now);
        match self.requests.enqueue(request.clone()) {
            Enqueued::Queued { current } => {
                debug!(partner = %from, queued = self.requests.len(), "trade request queued");
                if current {
                    self.observers.notify(&TradeEvent::TradeRequest(request));
                }
                Ok(())
            }
            Enqueued::Duplicate => Err(ProtocolError::DuplicateRequest(from)),
            Enqueued::Full => Err(ProtocolError::QueueFull(from)),
        }
    }

    fn session_with(&mut self, from: &PartyId) -> Result<&mut TradeSession> {
        let session = self.session.as_mut().ok_or(ProtocolError::NoActiveSession)?;
        if &session.partner().id != from {
            return Err(ProtocolError::PartnerMismatch {
                expected: session.partner().id.clone(),
                got: from.clone(),
            });
        }
        Ok(session)
    }

    /// Check a partner item against the partner's inventory
    ///
    /// The inventory is trusted over the message.
    fn resolve_partner_item(&self, from: &PartyId, item: &ItemRef) -> Result<ItemRef> {
        if let Some(catalog) = &self.catalog {
            catalog.require(&item.item_type)?;
        }
        let owned = self
            .inventory
            .find_item(from, &item.id)
            .ok_or_else(|| ProtocolError::UnresolvedItem(item.id.clone()))?;
        let resolved = owned.to_ref();
        if resolved.item_type != item.item_type || resolved.stack_key != item.stack_key {
            return Err(ProtocolError::ItemMismatch(item.id.clone()));
        }
        Ok(resolved)
    }

    fn partner_offer_changed(&mut self, revision: u64) {
        self.observers.notify(&TradeEvent::OfferChanged {
            side: OfferSide::Partner,
            revision,
        });
        self.reevaluate();
    }

    /// Enter `Confirming` and issue the single commit attempt when both
    /// offers are confirmed
    fn reevaluate(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.advance() {
            return;
        }
        let ticket = CommitTicket(self.next_ticket);
        self.next_ticket += 1;
        session.attach_commit(ticket, self.now);
        let proposal = CommitProposal {
            ticket,
            local_party: self.local.id.clone(),
            partner: session.partner().id.clone(),
            local_item_ids: session.local_offer().item_ids(),
            partner_item_ids: session.partner_offer().item_ids(),
        };
        info!(
            partner = %proposal.partner,
            ticket = ticket.0,
            giving = proposal.local_item_ids.len(),
            receiving = proposal.partner_item_ids.len(),
            "both offers confirmed, submitting commit"
        );
        self.observers.notify(&TradeEvent::StatusChanged {
            from: TradeStatus::Negotiating,
            to: TradeStatus::Confirming,
        });
        self.authority.submit_commit(proposal);
    }

    /// Cancel whatever is active and adopt `session`
    fn replace_session(&mut self, session: TradeSession) {
        if let Some(active) = self.session.as_mut() {
            let status = active.status();
            let partner = active.partner().id.clone();
            if active.cancel(CancelReason::Superseded) {
                self.outbox.push(Outbound::new(partner, farewell(status)));
            }
            self.finish();
        }
        self.selected = None;
        self.session = Some(session);
    }

    /// Tear down a session that reached a terminal state
    ///
    /// Hooks fire first, then the session and its offers are dropped.
    fn finish(&mut self) {
        if !self
            .session
            .as_ref()
            .map(|s| s.status().is_terminal())
            .unwrap_or(false)
        {
            return;
        }
        let Some(mut session) = self.session.take() else {
            return;
        };
        let partner = session.partner().clone();
        let outcome = match session.status() {
            TradeStatus::Completed => TradeOutcome::Completed,
            _ => TradeOutcome::Cancelled(
                session
                    .cancel_reason()
                    .cloned()
                    .unwrap_or(CancelReason::LocalCancel),
            ),
        };
        let event = match &outcome {
            TradeOutcome::Completed => TradeEvent::Completed {
                partner: partner.clone(),
            },
            TradeOutcome::Cancelled(reason) => TradeEvent::Cancelled {
                partner: partner.clone(),
                reason: reason.clone(),
            },
        };
        self.history.record(TradeRecord {
            partner,
            given: session.local_offer().item_ids(),
            received: session.partner_offer().item_ids(),
            outcome,
            concluded_at: Utc::now(),
        });
        self.observers.notify(&event);
        session.clear();
        self.selected = None;
    }

    fn surface_current(&mut self) {
        if let Some(request) = self.requests.peek_current().cloned() {
            self.observers.notify(&TradeEvent::TradeRequest(request));
        }
    }
}

/// What to tell the partner when we leave a session in `status`
fn farewell(status: TradeStatus) -> PartnerEvent {
    if status == TradeStatus::Pending {
        PartnerEvent::TradeRequestWithdrawn
    } else {
        PartnerEvent::Cancelled
    }
}
