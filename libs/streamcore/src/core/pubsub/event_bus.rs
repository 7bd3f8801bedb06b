// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Ordered event bus with a single dispatch thread.
//!
//! Events posted from any thread are queued and delivered one at a time, in
//! arrival order, to every registered watcher. Watchers run on the dispatch
//! thread while the watcher lock is held, so a watcher must not call
//! [`EventBus::add_bus_watch`] or [`EventBus::clear_all_watchers`] on the bus
//! that is dispatching to it.

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use super::events::{Event, EventHandleFlag};
use crate::core::queue::ThreadSafeQueue;
use crate::core::{Result, StreamError};

/// How long the dispatch loop waits for an event before re-checking the
/// running flag.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

type WatchFn = dyn Fn(&Event) -> EventHandleFlag + Send + Sync;

/// A registered (callback, owner) pair.
///
/// The owner is held weakly. Once it is dropped the watcher is skipped, but it
/// stays registered until [`EventBus::clear_all_watchers`].
#[derive(Clone)]
pub struct BusWatcher {
    callback: Arc<WatchFn>,
    owner: Option<Weak<dyn Any + Send + Sync>>,
}

impl BusWatcher {
    /// Whether the watcher was registered with an owner.
    pub fn has_owner(&self) -> bool {
        self.owner.is_some()
    }

    /// False once the owner has been dropped. Ownerless watchers are always alive.
    pub fn is_alive(&self) -> bool {
        match &self.owner {
            Some(owner) => owner.strong_count() > 0,
            None => true,
        }
    }

    fn invoke(&self, event: &Event) -> EventHandleFlag {
        (self.callback)(event)
    }
}

impl std::fmt::Debug for BusWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusWatcher")
            .field("has_owner", &self.has_owner())
            .field("alive", &self.is_alive())
            .finish()
    }
}

struct BusShared {
    watchers: Mutex<VecDeque<BusWatcher>>,
    queue: ThreadSafeQueue<Event>,
    poll_interval: Duration,
    /// Dispatch threads that have not exited yet, current run or not.
    loop_threads: Mutex<Vec<ThreadId>>,
}

impl BusShared {
    fn is_loop_thread(&self) -> bool {
        let current = std::thread::current().id();
        self.loop_threads.lock().contains(&current)
    }
    /// Block until an event arrives or `running` clears. A stop observed
    /// after the wait wins over a dequeued event.
    fn poll_event(&self, running: &AtomicBool) -> Event {
        while running.load(Ordering::SeqCst) {
            if let Some(event) = self.queue.wait_and_try_pop(self.poll_interval) {
                if running.load(Ordering::SeqCst) {
                    return event;
                }
                break;
            }
        }
        Event::stop()
    }

    fn dispatch(&self, event: &Event) -> EventHandleFlag {
        let watchers = self.watchers.lock();
        let mut flag = EventHandleFlag::Continue;
        for watcher in watchers.iter() {
            flag = watcher.invoke(event);
            if flag.ends_dispatch() {
                break;
            }
        }
        flag
    }

    /// Dispatch until `running` clears or a terminating event arrives.
    /// `running` belongs to this run alone.
    fn event_loop(&self, running: &AtomicBool) {
        tracing::debug!("Event loop started");

        while running.load(Ordering::SeqCst) {
            let event = self.poll_event(running);
            if event.event_type.terminates_loop() {
                tracing::info!(event_type = ?event.event_type, "[EventLoop] terminating event received");
                break;
            }

            tracing::trace!(
                event_type = ?event.event_type,
                module = %event.module_name,
                stream_id = %event.stream_id,
                "Dispatching event"
            );

            if self.dispatch(&event) == EventHandleFlag::Stop {
                tracing::info!("[EventLoop] watcher requested stop");
                break;
            }
        }

        // Fail fast on post_event once no loop is draining the queue.
        running.store(false, Ordering::SeqCst);
        tracing::info!("Event bus exit.");
    }
}

/// The current (or most recent) dispatch run.
struct BusRun {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl BusRun {
    fn idle() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Thread-safe broadcast channel for lifecycle and error events.
///
/// Lifecycle: constructed idle, [`start`](Self::start) spawns the dispatch
/// thread, [`stop`](Self::stop) joins it. Dropping the bus stops it.
pub struct EventBus {
    shared: Arc<BusShared>,
    run: Mutex<BusRun>,
    /// Serializes `start` against `stop`, including the join.
    lifecycle: Mutex<()>,
    span: tracing::Span,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(BusShared {
                watchers: Mutex::new(VecDeque::new()),
                queue: ThreadSafeQueue::new(),
                poll_interval: DEFAULT_POLL_INTERVAL,
                loop_threads: Mutex::new(Vec::new()),
            }),
            run: Mutex::new(BusRun::idle()),
            lifecycle: Mutex::new(()),
            span: tracing::info_span!("event_bus"),
        }
    }

    /// Log everything the dispatch thread emits under `span`.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Override the dispatch loop's wait granularity.
    ///
    /// Only effective before the bus is shared.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.poll_interval = poll_interval;
        }
        self
    }

    pub fn is_running(&self) -> bool {
        self.run.lock().is_running()
    }

    /// Spawn the dispatch thread. Must not be called from a watcher.
    ///
    /// Fails if the bus is already running. A bus whose loop has ended, by
    /// [`stop`](Self::stop) or by a terminating event, can be started again;
    /// events left over from the previous run are discarded. If the previous
    /// loop is still finishing a watcher, the new loop waits for it to exit
    /// before dispatching.
    pub fn start(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock();
        let mut run = self.run.lock();
        if run.is_running() {
            return Err(StreamError::Runtime("Event bus already running".into()));
        }

        let previous = run.thread.take();

        let stale = self.shared.queue.clear();
        if stale > 0 {
            tracing::debug!(stale, "Discarded events from previous run");
        }

        let running = Arc::new(AtomicBool::new(true));
        let shared = Arc::clone(&self.shared);
        let span = self.span.clone();
        let loop_running = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("event-loop".to_string())
            .spawn(move || {
                let _entered = span.enter();
                let me = std::thread::current().id();
                shared.loop_threads.lock().push(me);
                if let Some(previous) = previous {
                    if previous.join().is_err() {
                        tracing::warn!("Previous event loop thread panicked");
                    }
                }
                shared.event_loop(&loop_running);
                shared.loop_threads.lock().retain(|id| *id != me);
            })
            .map_err(|e| {
                StreamError::Runtime(format!("Failed to spawn event loop thread: {}", e))
            })?;

        *run = BusRun {
            running,
            thread: Some(handle),
        };
        Ok(())
    }

    /// Stop dispatching and join the dispatch thread.
    ///
    /// No-op when the bus was never started. When called from a watcher the
    /// loop exits as soon as that watcher returns; the join is left to the
    /// next `start` since the thread cannot wait on itself.
    pub fn stop(&self) {
        if self.shared.is_loop_thread() {
            self.run.lock().running.store(false, Ordering::SeqCst);
            tracing::debug!("stop() called from a dispatch thread, not joining");
            return;
        }

        let _lifecycle = self.lifecycle.lock();
        let handle = {
            let mut run = self.run.lock();
            run.running.store(false, Ordering::SeqCst);
            run.thread.take()
        };

        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("Event loop thread panicked");
            }
        }
    }

    /// Register `callback` with a non-owning reference to `owner`.
    ///
    /// The watcher is inserted at the front, so it is visited before every
    /// watcher registered earlier. Waits for an in-progress broadcast to
    /// finish. Returns the number of registered watchers.
    pub fn add_bus_watch<O, F>(&self, owner: &Arc<O>, callback: F) -> usize
    where
        O: Send + Sync + 'static,
        F: Fn(&Event, &O) -> EventHandleFlag + Send + Sync + 'static,
    {
        let weak_owner = Arc::downgrade(owner);
        let erased_owner: Weak<dyn Any + Send + Sync> = weak_owner.clone();
        let watcher = BusWatcher {
            callback: Arc::new(move |event: &Event| match weak_owner.upgrade() {
                Some(owner) => callback(event, &owner),
                None => EventHandleFlag::Continue,
            }),
            owner: Some(erased_owner),
        };
        self.insert_watcher(watcher)
    }

    /// Register a callback without an owner.
    pub fn add_watch<F>(&self, callback: F) -> usize
    where
        F: Fn(&Event) -> EventHandleFlag + Send + Sync + 'static,
    {
        self.insert_watcher(BusWatcher {
            callback: Arc::new(callback),
            owner: None,
        })
    }

    fn insert_watcher(&self, watcher: BusWatcher) -> usize {
        let mut watchers = self.shared.watchers.lock();
        watchers.push_front(watcher);
        watchers.len()
    }

    /// Waits for an in-progress broadcast to finish.
    pub fn clear_all_watchers(&self) {
        self.shared.watchers.lock().clear();
    }

    /// Snapshot of the watchers in dispatch order.
    pub fn bus_watchers(&self) -> Vec<BusWatcher> {
        self.shared.watchers.lock().iter().cloned().collect()
    }

    pub fn watcher_count(&self) -> usize {
        self.shared.watchers.lock().len()
    }

    /// Queue `event` for dispatch. Returns false, dropping the event, when
    /// the bus is not running.
    pub fn post_event(&self, event: Event) -> bool {
        let run = self.run.lock();
        if !run.is_running() {
            tracing::warn!(
                event_type = ?event.event_type,
                stream_id = %event.stream_id,
                "Post event failed, event bus not running"
            );
            return false;
        }
        self.shared.queue.push(event);
        true
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.stop();
    }
}
