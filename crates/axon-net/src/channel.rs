//! Per-member mailboxes.
//!
//! A mailbox is a bounded FIFO of pending messages behind its own mutex.
//! Overflow policy: when full, the oldest message is dropped to admit the
//! new one; senders never block.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::MemberId;

/// Default number of messages a mailbox can hold.
pub const DEFAULT_POOL_CAPACITY: usize = 100;

/// One pending message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: MemberId,
    pub payload: Vec<u8>,
}

/// A bounded, mutex-guarded FIFO of messages owned by one member.
///
/// Messages from the same sender are delivered in send order; no ordering
/// holds across different senders.
#[derive(Debug)]
pub struct Mailbox {
    queue: Mutex<VecDeque<Message>>,
    signal: Condvar,
    capacity: usize,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            signal: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Enqueues a message and signals any waiter.
    ///
    /// Returns `false` if the mailbox was full and its oldest message was
    /// dropped to make room.
    pub fn push(&self, message: Message) -> bool {
        let mut queue = self.queue.lock();
        let mut kept_all = true;
        if queue.len() == self.capacity {
            let dropped = queue.pop_front();
            if let Some(old) = dropped {
                debug!(sender = old.sender, "mailbox full, dropped oldest message");
            }
            kept_all = false;
        }
        queue.push_back(message);
        drop(queue);
        self.signal.notify_one();
        kept_all
    }

    /// Dequeues the oldest pending message, optionally restricted to a
    /// single sender. Non-blocking: returns `None` when nothing matches.
    pub fn pop(&self, from: Option<MemberId>) -> Option<Message> {
        let mut queue = self.queue.lock();
        match from {
            None => queue.pop_front(),
            Some(sender) => {
                let index = queue.iter().position(|m| m.sender == sender)?;
                queue.remove(index)
            }
        }
    }

    /// Blocks until a message is pending or the timeout elapses. Returns
    /// whether a message was pending when the wait ended.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut queue = self.queue.lock();
        if !queue.is_empty() {
            return true;
        }
        let _ = self.signal.wait_for(&mut queue, timeout);
        !queue.is_empty()
    }
}
