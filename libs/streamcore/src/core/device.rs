// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Binding a decode device to the calling thread.

use crate::core::Result;

/// Makes a device's execution context current on the calling thread.
///
/// Called from the decode worker before any backend call when the source is
/// configured with a non-negative `device_id`.
pub trait DeviceBinder: Send + Sync {
    fn bind_current_thread(&self, device_id: i32) -> Result<()>;
}

/// Accepts every device without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDeviceBinder;

impl DeviceBinder for NoopDeviceBinder {
    fn bind_current_thread(&self, device_id: i32) -> Result<()> {
        tracing::trace!(device_id, "No device binding required");
        Ok(())
    }
}
