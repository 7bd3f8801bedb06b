// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

/// Unbounded MPMC queue. Pushing never blocks.
pub struct ThreadSafeQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> ThreadSafeQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, item: T) {
        // Both ends are owned by `self`, so the send cannot fail.
        let _ = self.sender.send(item);
    }

    pub fn try_pop(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for an item.
    ///
    /// Meant for loops that must re-check a cancellation flag between waits,
    /// so `timeout` is usually short.
    pub fn wait_and_try_pop(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Drop every queued item, returning how many were discarded.
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }
}

impl<T> Default for ThreadSafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
