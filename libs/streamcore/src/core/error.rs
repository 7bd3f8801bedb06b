// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Bitstream parse error: {0}")]
    Parser(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StreamError>;

/// Failure of a single [`StreamIngestionHandler::write`](crate::core::StreamIngestionHandler::write).
///
/// Both variants are local to the call: nothing is posted to the event bus and
/// the stream keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The handler is closed, the queue is gone, or the push did not get a
    /// slot before the write timeout elapsed.
    #[error("packet queue unavailable or full")]
    QueueUnavailable,

    /// The parser rejected the payload as malformed. The packet was not queued.
    #[error("malformed bitstream: {0}")]
    Parse(String),
}

impl WriteError {
    /// Numeric status used by upstream producers: `-1` queue, `-2` parse.
    pub fn code(&self) -> i32 {
        match self {
            WriteError::QueueUnavailable => -1,
            WriteError::Parse(_) => -2,
        }
    }
}
