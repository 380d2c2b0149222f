//! Sync adapter - moves partner events between controllers and connections
//!
//! The adapter owns one [`Connection`] per remote party. Each frame
//! carries a per-link sequence number; frames that go backwards or claim
//! a sender other than the link's party are dropped.
//!
//! A link that reports itself disconnected, or fails to send, is removed
//! and the controller is told via `partner_disconnected`.

use crate::codec;
use crate::error::{Error, Result};
use crate::transport::Connection;
use barter_core::{Envelope, Outbound, PartyId};
use barter_session::{CommitAuthority, Inventory, TradeController};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

struct Link<C> {
    connection: C,
    next_seq: u64,
    last_seen: Option<u64>,
}

/// Counts from one pump or flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Frames delivered to the controller, or sent to the wire
    pub delivered: usize,
    /// Frames dropped (undecodable, out of order, no route)
    pub dropped: usize,
    /// Links removed because they were gone
    pub disconnected: usize,
}

/// Bridges a [`TradeController`] to its partners' connections
pub struct SyncAdapter<C> {
    local: PartyId,
    links: IndexMap<PartyId, Link<C>>,
}

impl<C: Connection> SyncAdapter<C> {
    pub fn new(local: impl Into<PartyId>) -> Self {
        Self {
            local: local.into(),
            links: IndexMap::new(),
        }
    }

    pub fn local(&self) -> &PartyId {
        &self.local
    }

    /// Add a connection; replaces any existing link to the same party
    pub fn connect(&mut self, connection: C) {
        let party = connection.remote_party().clone();
        debug!(%party, "link added");
        self.links.insert(
            party,
            Link {
                connection,
                next_seq: 0,
                last_seen: None,
            },
        );
    }

    pub fn is_connected(&self, party: &PartyId) -> bool {
        self.links
            .get(party)
            .map(|link| link.connection.is_connected())
            .unwrap_or(false)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PartyId> {
        self.links.keys()
    }

    /// Close the link to `party` and tell the controller
    pub fn disconnect<A, I>(&mut self, party: &PartyId, controller: &mut TradeController<A, I>) -> Result<()>
    where
        A: CommitAuthority,
        I: Inventory,
    {
        let link = self
            .links
            .shift_remove(party)
            .ok_or_else(|| Error::UnknownPeer(party.clone()))?;
        let closed = link.connection.close();
        controller.partner_disconnected(party);
        closed.map_err(|e| Error::Transport(e.to_string()))
    }

    /// Send one event to `to`
    pub fn send(&mut self, outbound: &Outbound) -> Result<()> {
        let link = self
            .links
            .get_mut(&outbound.to)
            .ok_or_else(|| Error::UnknownPeer(outbound.to.clone()))?;
        let envelope = Envelope::new(self.local.clone(), outbound.event.clone()).with_seq(link.next_seq);
        let frame = codec::encode(&envelope)?;
        link.connection
            .send(&frame)
            .map_err(|e| Error::Transport(e.to_string()))?;
        trace!(to = %outbound.to, seq = link.next_seq, event = outbound.event.name(), "sent");
        link.next_seq += 1;
        Ok(())
    }

    /// Send everything the controller has queued
    pub fn flush_outbound<A, I>(&mut self, controller: &mut TradeController<A, I>) -> SyncStats
    where
        A: CommitAuthority,
        I: Inventory,
    {
        let mut stats = SyncStats::default();
        let mut lost = Vec::new();
        for outbound in controller.drain_outbound() {
            match self.send(&outbound) {
                Ok(()) => stats.delivered += 1,
                Err(Error::Transport(err)) => {
                    warn!(to = %outbound.to, error = %err, "send failed, dropping link");
                    stats.dropped += 1;
                    if !lost.contains(&outbound.to) {
                        lost.push(outbound.to.clone());
                    }
                }
                Err(err) => {
                    warn!(to = %outbound.to, error = %err, "dropping outbound trade event");
                    stats.dropped += 1;
                }
            }
        }
        for party in lost {
            if self.links.shift_remove(&party).is_some() {
                stats.disconnected += 1;
                controller.partner_disconnected(&party);
            }
        }
        stats
    }

    /// Deliver every received frame to the controller
    pub fn pump_inbound<A, I>(&mut self, controller: &mut TradeController<A, I>) -> SyncStats
    where
        A: CommitAuthority,
        I: Inventory,
    {
        let mut stats = SyncStats::default();
        let mut gone = Vec::new();

        for (party, link) in self.links.iter_mut() {
            loop {
                let frame = match link.connection.recv() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(%party, error = %err, "receive failed");
                        gone.push(party.clone());
                        break;
                    }
                };
                match accept_frame(party, link, &frame) {
                    Ok(envelope) => {
                        controller.handle_inbound(envelope);
                        stats.delivered += 1;
                    }
                    Err(err) => {
                        warn!(%party, error = %err, "dropping inbound frame");
                        stats.dropped += 1;
                    }
                }
            }
            if !link.connection.is_connected() && !gone.contains(party) {
                gone.push(party.clone());
            }
        }

        for party in gone {
            if self.links.shift_remove(&party).is_some() {
                debug!(%party, "link lost");
                stats.disconnected += 1;
                controller.partner_disconnected(&party);
            }
        }
        stats
    }
}

/// Decode a frame and check it against the link it arrived on
fn accept_frame<C>(party: &PartyId, link: &mut Link<C>, frame: &[u8]) -> Result<Envelope> {
    let envelope = codec::decode(frame)?;
    if &envelope.from != party {
        return Err(Error::Transport(format!(
            "frame from {} on link to {}",
            envelope.from, party
        )));
    }
    if let Some(last) = link.last_seen {
        if envelope.seq <= last {
            return Err(Error::Transport(format!(
                "sequence {} after {}",
                envelope.seq, last
            )));
        }
    }
    link.last_seen = Some(envelope.seq);
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackConnection;
    use barter_core::{ItemId, ItemInstance, PartnerEvent, PartyInfo, Rarity};
    use barter_session::{
        CancelReason, CommitOutcome, CommitProposal, MemoryInventory, TradeOutcome, TradeStatus,
    };

    #[derive(Default)]
    struct Proposals(Vec<CommitProposal>);

    impl CommitAuthority for Proposals {
        fn request_trade(&mut self, _from: &PartyInfo, _to: &PartyId) {}

        fn submit_commit(&mut self, proposal: CommitProposal) {
            self.0.push(proposal);
        }
    }

    type Controller = TradeController<Proposals, MemoryInventory>;

    fn inventory() -> MemoryInventory {
        let mut inventory = MemoryInventory::new();
        inventory.set_items(
            PartyId::new("alice"),
            vec![
                ItemInstance::with_rarity("e1", "Egg", Rarity::Common),
                ItemInstance::with_rarity("e2", "Egg", Rarity::Common),
            ],
        );
        inventory.set_items(
            PartyId::new("bob"),
            vec![ItemInstance::with_rarity("c1", "Chicken", Rarity::Rare)],
        );
        inventory
    }

    struct Pair {
        alice: Controller,
        bob: Controller,
        alice_sync: SyncAdapter<LoopbackConnection>,
        bob_sync: SyncAdapter<LoopbackConnection>,
    }

    impl Pair {
        fn new() -> Self {
            let (a, b) = LoopbackConnection::pair("alice", "bob");
            let mut alice_sync = SyncAdapter::new("alice");
            alice_sync.connect(a);
            let mut bob_sync = SyncAdapter::new("bob");
            bob_sync.connect(b);
            Self {
                alice: TradeController::new(PartyInfo::new("alice", "Alice"), Proposals::default(), inventory()),
                bob: TradeController::new(PartyInfo::new("bob", "Bob"), Proposals::default(), inventory()),
                alice_sync,
                bob_sync,
            }
        }

        /// Exchange traffic until both sides are quiet
        fn settle(&mut self) {
            loop {
                let sent = self.alice_sync.flush_outbound(&mut self.alice).delivered
                    + self.bob_sync.flush_outbound(&mut self.bob).delivered;
                self.alice_sync.pump_inbound(&mut self.alice);
                self.bob_sync.pump_inbound(&mut self.bob);
                if sent == 0 {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_full_negotiation_over_loopback() {
        let mut pair = Pair::new();
        pair.alice.invite(PartyInfo::new("bob", "Bob"));
        pair.settle();
        assert_eq!(pair.bob.current_request().unwrap().from_party_name, "Alice");

        pair.bob.accept_current_request();
        pair.settle();
        assert_eq!(pair.alice.status(), Some(TradeStatus::Negotiating));

        pair.alice.offer_item(&ItemId::new("e1"));
        pair.bob.offer_item(&ItemId::new("c1"));
        pair.settle();
        assert_eq!(pair.bob.session().unwrap().partner_offer().len(), 1);
        assert_eq!(pair.alice.session().unwrap().partner_offer().len(), 1);

        pair.alice.confirm();
        pair.bob.confirm();
        pair.settle();
        assert_eq!(pair.alice.status(), Some(TradeStatus::Confirming));
        assert_eq!(pair.bob.status(), Some(TradeStatus::Confirming));

        let alice_proposal = pair.alice.authority().0[0].clone();
        let bob_proposal = pair.bob.authority().0[0].clone();
        assert!(alice_proposal.mirrors(&bob_proposal));

        assert!(pair.alice.handle_commit_outcome(CommitOutcome::success(alice_proposal.ticket)));
        assert!(pair.bob.handle_commit_outcome(CommitOutcome::success(bob_proposal.ticket)));
        assert!(pair.alice.history().latest().unwrap().is_completed());
    }

    #[test]
    fn test_disconnect_cancels_session() {
        let mut pair = Pair::new();
        pair.alice.start_trade(PartyInfo::new("bob", "Bob"));
        pair.bob.start_trade(PartyInfo::new("alice", "Alice"));

        pair.bob_sync
            .disconnect(&PartyId::new("alice"), &mut pair.bob)
            .unwrap();
        assert!(pair.bob.session().is_none());

        let stats = pair.alice_sync.pump_inbound(&mut pair.alice);
        assert_eq!(stats.disconnected, 1);
        assert!(pair.alice.session().is_none());
        assert_eq!(
            pair.alice.history().latest().unwrap().outcome,
            TradeOutcome::Cancelled(CancelReason::PartnerDisconnected)
        );
        assert!(!pair.alice_sync.is_connected(&PartyId::new("bob")));
    }

    #[test]
    fn test_unrouted_outbound_dropped() {
        let mut pair = Pair::new();
        pair.alice.start_trade(PartyInfo::new("carol", "Carol"));
        pair.alice.offer_item(&ItemId::new("e1"));

        let stats = pair.alice_sync.flush_outbound(&mut pair.alice);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.disconnected, 0);
    }

    #[test]
    fn test_spoofed_and_replayed_frames_dropped() {
        let (a, b) = LoopbackConnection::pair("alice", "bob");
        let mut bob_sync = SyncAdapter::new("bob");
        bob_sync.connect(b);
        let mut bob: Controller =
            TradeController::new(PartyInfo::new("bob", "Bob"), Proposals::default(), inventory());

        let request = PartnerEvent::TradeRequestReceived { from_name: "Alice".into() };
        let spoofed = Envelope::new("mallory", request.clone());
        a.send(&codec::encode(&spoofed).unwrap()).unwrap();

        let genuine = Envelope::new("alice", request).with_seq(3);
        a.send(&codec::encode(&genuine).unwrap()).unwrap();
        a.send(&codec::encode(&genuine).unwrap()).unwrap();

        let stats = bob_sync.pump_inbound(&mut bob);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.dropped, 2);
        assert_eq!(bob.requests().len(), 1);
    }
}
