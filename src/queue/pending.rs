//! FIFO ledger of authorized actions
//!
//! Bolts are appended at the tail by `enqueue` and only ever leave from the
//! head. Two counters describe the queue:
//! - `next`: nonce of the oldest unfired bolt
//! - `nonce`: nonce the next enqueued bolt will receive
//!
//! `next <= nonce` always holds and the queue is empty exactly when they meet.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::core::Action;

// =============================================================================
// Error Types
// =============================================================================

/// Queue errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is empty")]
    EmptyQueue,
    #[error("Wait not elapsed: bolt {nonce} ready at {ready_at}, now {now}")]
    WaitNotElapsed { nonce: u64, ready_at: u64, now: u64 },
}

// =============================================================================
// Bolt
// =============================================================================

/// A queued, already-authorized action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bolt {
    pub nonce: u64,
    pub action: Action,
    /// Earliest time the bolt may fire
    pub ready_at: u64,
}

impl Bolt {
    pub fn is_ready(&self, now: u64) -> bool {
        now >= self.ready_at
    }
}

// =============================================================================
// Pending Queue
// =============================================================================

/// Timelocked FIFO of bolts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingQueue {
    bolts: VecDeque<Bolt>,
    next: u64,
    nonce: u64,
    /// Delay between load and readiness, 0 disables timelocking
    wait: u64,
}

impl PendingQueue {
    pub fn new(wait: u64) -> Self {
        Self {
            bolts: VecDeque::new(),
            next: 0,
            nonce: 0,
            wait,
        }
    }

    /// Append `action` and return the nonce it was assigned
    pub fn enqueue(&mut self, action: Action, now: u64) -> u64 {
        let nonce = self.nonce;
        let ready_at = now.saturating_add(self.wait);
        self.bolts.push_back(Bolt {
            nonce,
            action,
            ready_at,
        });
        self.nonce += 1;
        nonce
    }

    pub fn peek_head(&self) -> Option<&Bolt> {
        self.bolts.front()
    }

    /// Head bolt if its wait has elapsed at `now`
    pub fn ready_head(&self, now: u64) -> Result<&Bolt, QueueError> {
        let head = self.peek_head().ok_or(QueueError::EmptyQueue)?;
        if !head.is_ready(now) {
            return Err(QueueError::WaitNotElapsed {
                nonce: head.nonce,
                ready_at: head.ready_at,
                now,
            });
        }
        Ok(head)
    }

    /// Remove the head bolt, advancing `next`
    pub fn pop_head(&mut self) -> Result<Bolt, QueueError> {
        let bolt = self.bolts.pop_front().ok_or(QueueError::EmptyQueue)?;
        self.next += 1;
        Ok(bolt)
    }

    pub fn next(&self) -> u64 {
        self.next
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn wait(&self) -> u64 {
        self.wait
    }

    pub fn is_timelocked(&self) -> bool {
        self.wait > 0
    }

    pub fn len(&self) -> usize {
        self.bolts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next == self.nonce
    }

    /// Queued bolts from head to tail
    pub fn iter(&self) -> impl Iterator<Item = &Bolt> {
        self.bolts.iter()
    }
}
