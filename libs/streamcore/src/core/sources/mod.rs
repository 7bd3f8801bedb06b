// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-stream ingestion: `write` → bounded queue → decode worker → backend.

mod decode_worker;
mod ingestion_handler;
mod parser_slot;

pub use ingestion_handler::{StreamIngestionHandler, StreamIngestionHandlerBuilder};
