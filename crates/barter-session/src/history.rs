//! Record of concluded trades
//!
//! Every session that reaches a terminal state leaves one [`TradeRecord`].
//! The history is bounded; the oldest record is dropped first.

use crate::state::CancelReason;
use barter_core::{ItemId, PartyInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How a trade ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    Completed,
    Cancelled(CancelReason),
}

/// One concluded trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub partner: PartyInfo,
    /// Items the local party offered
    pub given: Vec<ItemId>,
    /// Items the partner offered
    pub received: Vec<ItemId>,
    pub outcome: TradeOutcome,
    pub concluded_at: DateTime<Utc>,
}

impl TradeRecord {
    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, TradeOutcome::Completed)
    }
}

/// Bounded history of concluded trades
#[derive(Debug, Clone)]
pub struct TradeHistory {
    records: VecDeque<TradeRecord>,
    capacity: usize,
}

impl TradeHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a record, evicting the oldest when full
    pub fn record(&mut self, record: TradeRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records, newest first
    pub fn iter(&self) -> impl Iterator<Item = &TradeRecord> {
        self.records.iter().rev()
    }

    pub fn latest(&self) -> Option<&TradeRecord> {
        self.records.back()
    }

    pub fn completed_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_completed()).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
