// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::thread::ThreadId;

use serde::{Deserialize, Serialize};

/// Kind of occurrence carried by an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventType {
    /// Sentinel. Terminates the dispatch loop when dequeued.
    #[default]
    Invalid,
    /// A module hit an error that affects the whole pipeline.
    Error,
    /// Diagnostic that does not require action.
    Warning,
    /// A stream reached end-of-stream.
    Eos,
    /// Synthesized by the bus when it stops while the loop is waiting.
    Stop,
    /// A single stream failed; siblings may continue.
    StreamError,
}

impl EventType {
    /// Whether dequeuing this type ends the dispatch loop without reaching
    /// any watcher.
    pub fn terminates_loop(&self) -> bool {
        matches!(self, EventType::Invalid | EventType::Stop)
    }
}

/// Lifecycle or error notification posted to the [`EventBus`](super::EventBus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    /// Name of the posting module. May be empty.
    pub module_name: String,
    /// Stream the event refers to. May be empty.
    pub stream_id: String,
    pub message: String,
    /// Thread that built the event.
    pub thread_id: ThreadId,
}

impl Event {
    /// Build an event stamped with the calling thread's id.
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            module_name: String::new(),
            stream_id: String::new(),
            message: message.into(),
            thread_id: std::thread::current().id(),
        }
    }

    pub fn with_module(mut self, module_name: impl Into<String>) -> Self {
        self.module_name = module_name.into();
        self
    }

    pub fn with_stream(mut self, stream_id: impl Into<String>) -> Self {
        self.stream_id = stream_id.into();
        self
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventType::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(EventType::Warning, message)
    }

    pub fn eos(stream_id: impl Into<String>) -> Self {
        Self::new(EventType::Eos, "end of stream").with_stream(stream_id)
    }

    pub fn stream_error(stream_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventType::StreamError, message).with_stream(stream_id)
    }

    pub(crate) fn stop() -> Self {
        Self::new(EventType::Stop, "event bus stopped")
    }
}

/// What the dispatch loop does after a watcher returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventHandleFlag {
    /// Not handled here; visit the next watcher.
    #[default]
    Continue,
    /// Handled synchronously; still visit the next watcher.
    Synced,
    /// Skip the remaining watchers for this event only.
    Intercept,
    /// Skip the remaining watchers and terminate the dispatch loop.
    Stop,
}

impl EventHandleFlag {
    pub(crate) fn ends_dispatch(&self) -> bool {
        matches!(self, EventHandleFlag::Intercept | EventHandleFlag::Stop)
    }
}
