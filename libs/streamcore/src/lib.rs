// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Event bus and per-stream ingestion/decode engine for real-time video
//! pipelines.
//!
//! ```no_run
//! use std::sync::Arc;
//! use streamcore::{EventBus, SourceParam, StaticConfigProvider, StreamIngestionHandler};
//!
//! # fn main() -> streamcore::Result<()> {
//! let bus = Arc::new(EventBus::new());
//! bus.start()?;
//!
//! let handler = StreamIngestionHandler::builder("cam0")
//!     .stream_index(0)
//!     .config(Arc::new(StaticConfigProvider::new("source", SourceParam::software())))
//!     .event_bus(Arc::clone(&bus))
//!     .build()?;
//! handler.open()?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::type_complexity)] // Constructor aliases read fine inline

pub mod core;

pub use self::core::*;
