//! Queue of incoming trade requests
//!
//! Requests are surfaced one at a time in arrival order. The oldest queued
//! request is always the current one, so removing it promotes the next
//! without a gap.

use barter_core::{PartyId, Tick};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// An invitation to trade received from another party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub from_party_id: PartyId,
    pub from_party_name: String,
    /// Tick at which the request arrived
    pub timestamp: Tick,
}

impl TradeRequest {
    pub fn new(from_party_id: PartyId, from_party_name: impl Into<String>, timestamp: Tick) -> Self {
        Self {
            from_party_id,
            from_party_name: from_party_name.into(),
            timestamp,
        }
    }

    /// Whether this request is older than `timeout` ticks at `now`
    pub fn is_expired(&self, now: Tick, timeout: Tick) -> bool {
        now.saturating_sub(self.timestamp) >= timeout
    }
}

/// Result of [`RequestQueue::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// Queued; `current` is true if it is now the surfaced request
    Queued { current: bool },
    /// The party already has a request waiting
    Duplicate,
    /// The queue is at capacity
    Full,
}

/// FIFO queue of pending trade requests
#[derive(Debug, Clone)]
pub struct RequestQueue {
    /// Pending requests (oldest first)
    requests: VecDeque<TradeRequest>,
    /// Maximum number of queued requests
    capacity: usize,
}

impl RequestQueue {
    /// Create a queue holding at most `capacity` requests (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            requests: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queue a request
    ///
    /// A second request from a party that already has one waiting is
    /// ignored.
    pub fn enqueue(&mut self, request: TradeRequest) -> Enqueued {
        if self.contains(&request.from_party_id) {
            return Enqueued::Duplicate;
        }
        if self.requests.len() >= self.capacity {
            return Enqueued::Full;
        }
        self.requests.push_back(request);
        Enqueued::Queued {
            current: self.requests.len() == 1,
        }
    }

    /// Remove the current request, promoting the next one
    pub fn dequeue_current(&mut self) -> Option<TradeRequest> {
        self.requests.pop_front()
    }

    /// The request currently surfaced to the user
    pub fn peek_current(&self) -> Option<&TradeRequest> {
        self.requests.front()
    }

    /// Drop every queued request
    pub fn clear(&mut self) {
        self.requests.clear();
    }

    /// Remove the request from `party`
    ///
    /// Returns the request and whether it was the current one.
    pub fn withdraw(&mut self, party: &PartyId) -> Option<(TradeRequest, bool)> {
        let pos = self
            .requests
            .iter()
            .position(|r| &r.from_party_id == party)?;
        self.requests.remove(pos).map(|r| (r, pos == 0))
    }

    /// Remove every request older than `timeout` ticks
    ///
    /// Returns the expired requests, oldest first.
    pub fn expire(&mut self, now: Tick, timeout: Tick) -> Vec<TradeRequest> {
        let mut expired = Vec::new();
        self.requests.retain(|r| {
            if r.is_expired(now, timeout) {
                expired.push(r.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn contains(&self, party: &PartyId) -> bool {
        self.requests.iter().any(|r| &r.from_party_id == party)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeRequest> {
        self.requests.iter()
    }
}
