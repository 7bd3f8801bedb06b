// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};

use crate::core::{Result, StreamError};

/// Fixed-capacity MPMC queue with timed push and pop.
///
/// Both channel ends live inside the queue, so the channel never disconnects
/// while the queue exists. Dropping the queue drops every item still queued.
pub struct BoundedQueue<T> {
    capacity: usize,
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// A zero capacity would turn the queue into a rendezvous point and is
    /// rejected.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StreamError::Configuration(
                "BoundedQueue capacity must be greater than zero".into(),
            ));
        }
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Ok(Self {
            capacity,
            sender,
            receiver,
        })
    }

    /// Push `item`, waiting up to `timeout` for a free slot.
    ///
    /// On timeout the item is handed back and the queued items are untouched.
    pub fn push(&self, item: T, timeout: Duration) -> std::result::Result<(), T> {
        match self.sender.send_timeout(item, timeout) {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(item)) | Err(SendTimeoutError::Disconnected(item)) => {
                Err(item)
            }
        }
    }

    /// Push without waiting.
    pub fn try_push(&self, item: T) -> std::result::Result<(), T> {
        match self.sender.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) | Err(TrySendError::Disconnected(item)) => Err(item),
        }
    }

    /// Pop the oldest item, waiting up to `timeout`. `None` on timeout.
    pub fn pop(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Pop without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.receiver.len() >= self.capacity
    }
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
