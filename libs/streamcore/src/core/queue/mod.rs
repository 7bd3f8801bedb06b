// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Thread-safe queues with timed blocking operations.
//!
//! - [`BoundedQueue`]: fixed capacity, producers block (up to a timeout) when
//!   full. Carries elementary-stream packets from `write` to the decode worker.
//! - [`ThreadSafeQueue`]: unbounded, producers never block. Carries events
//!   into the event bus dispatch loop.

mod bounded_queue;
mod thread_safe_queue;

pub use bounded_queue::BoundedQueue;
pub use thread_safe_queue::ThreadSafeQueue;
