// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::{BitstreamParser, Result, VideoStreamInfo};

/// Longest a metadata waiter sleeps before re-checking the running flag.
const INFO_WAIT_SLICE: Duration = Duration::from_millis(10);

/// Parser shared between `write` (feeding bytes) and the decode worker
/// (waiting for metadata). Signals the worker as soon as metadata appears.
pub(crate) struct ParserSlot {
    parser: Mutex<Option<Box<dyn BitstreamParser>>>,
    info_ready: Condvar,
}

impl ParserSlot {
    pub(crate) fn new() -> Self {
        Self {
            parser: Mutex::new(None),
            info_ready: Condvar::new(),
        }
    }

    pub(crate) fn install(&self, parser: Box<dyn BitstreamParser>) {
        let previous = self.parser.lock().replace(parser);
        if let Some(mut previous) = previous {
            previous.free();
        }
    }

    /// Free and drop the parser, if any.
    pub(crate) fn free(&self) {
        let previous = self.parser.lock().take();
        if let Some(mut previous) = previous {
            previous.free();
        }
        self.info_ready.notify_all();
    }

    pub(crate) fn is_present(&self) -> bool {
        self.parser.lock().is_some()
    }

    /// Feed `data` to the parser. `None` when no parser is installed.
    pub(crate) fn parse(&self, data: &[u8]) -> Option<Result<()>> {
        let mut guard = self.parser.lock();
        let parser = guard.as_mut()?;
        let had_info = parser.info().is_some();
        let result = parser.parse(data);
        if !had_info && parser.info().is_some() {
            self.info_ready.notify_all();
        }
        Some(result)
    }

    /// Wake any waiter so it re-checks its running flag.
    pub(crate) fn notify(&self) {
        self.info_ready.notify_all();
    }

    /// Wait until the parser reports metadata, `running` clears, the parser
    /// is removed, or `timeout` elapses.
    pub(crate) fn wait_for_info(
        &self,
        running: &AtomicBool,
        timeout: Duration,
    ) -> Option<VideoStreamInfo> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.parser.lock();
        loop {
            let info = guard.as_ref()?.info();
            if info.is_some() {
                return info;
            }
            if !running.load(Ordering::SeqCst) {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let slice = INFO_WAIT_SLICE.min(deadline - now);
            self.info_ready.wait_for(&mut guard, slice);
        }
    }
}
