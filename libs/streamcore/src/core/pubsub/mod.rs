// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod event_bus;
mod events;

pub use event_bus::{BusWatcher, EventBus, DEFAULT_POLL_INTERVAL};
pub use events::{Event, EventHandleFlag, EventType};
