// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod pubsub;
pub mod queue;
pub mod sources;

pub use codec::*;
pub use config::{ConfigProvider, SourceParam, StaticConfigProvider};
pub use device::{DeviceBinder, NoopDeviceBinder};
pub use error::*;
pub use logging::init_tracing;
pub use pubsub::*;
pub use queue::{BoundedQueue, ThreadSafeQueue};
pub use sources::*;
