//! Observer hooks for the rendering layer
//!
//! Hooks are an ordered subscription list rather than single callback
//! slots: every subscriber sees every [`TradeEvent`], in subscription
//! order, synchronously from inside the mutation that caused it.

use crate::queue::TradeRequest;
use crate::state::{CancelReason, TradeStatus};
use barter_core::{ItemId, PartyId, PartyInfo, SelectionAction};

/// Which offer changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferSide {
    Local,
    Partner,
}

/// A user-level action performed on the local side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeAction {
    Invited(PartyId),
    Offered(ItemId),
    Withdrew(ItemId),
    Confirmed,
    Unconfirmed,
    Cancelled,
}

/// Everything the rendering layer can observe
#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    ItemSelected(SelectionAction),
    Action(TradeAction),
    VisibilityChanged(bool),
    /// A request became the current one
    TradeRequest(TradeRequest),
    /// A trade was accepted, by us or by the invited partner
    Accept(PartyInfo),
    /// We declined a request
    Decline(TradeRequest),
    OfferChanged { side: OfferSide, revision: u64 },
    StatusChanged { from: TradeStatus, to: TradeStatus },
    Completed { partner: PartyInfo },
    Cancelled { partner: PartyInfo, reason: CancelReason },
}

/// Handle returned by [`Observers::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&TradeEvent)>;

/// Ordered list of event subscribers
#[derive(Default)]
pub struct Observers {
    handlers: Vec<(SubscriptionId, Handler)>,
    next_id: u64,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber; it runs after all earlier ones
    pub fn subscribe(&mut self, handler: impl FnMut(&TradeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a subscriber; returns false if it was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        self.handlers.len() != before
    }

    /// Deliver an event to every subscriber
    pub fn notify(&mut self, event: &TradeEvent) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_notify_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::new();

        let first = log.clone();
        observers.subscribe(move |_| first.borrow_mut().push("first"));
        let second = log.clone();
        observers.subscribe(move |_| second.borrow_mut().push("second"));

        observers.notify(&TradeEvent::VisibilityChanged(true));
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut observers = Observers::new();
        let c = count.clone();
        let id = observers.subscribe(move |_| *c.borrow_mut() += 1);

        observers.notify(&TradeEvent::Action(TradeAction::Confirmed));
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.notify(&TradeEvent::Action(TradeAction::Confirmed));

        assert_eq!(*count.borrow(), 1);
        assert!(observers.is_empty());
    }
}
