// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::{EsPacket, VideoStreamInfo};
use crate::core::Result;

/// Which family of backend decodes a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderType {
    /// Device-accelerated decode. Stream info comes from configured bounds.
    Hardware,
    /// CPU decode. Stream info is discovered by a bitstream parser.
    #[default]
    Software,
}

impl DecoderType {
    /// Software backends need the parser to discover stream metadata.
    pub fn needs_parser(&self) -> bool {
        matches!(self, DecoderType::Software)
    }
}

impl std::fmt::Display for DecoderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecoderType::Hardware => f.write_str("hardware"),
            DecoderType::Software => f.write_str("software"),
        }
    }
}

/// Pluggable decoder for one stream.
///
/// Called from the stream's decode worker thread only. Where the decoded
/// output goes is up to the implementation.
pub trait DecoderBackend: Send {
    /// Human readable backend name for diagnostics.
    fn name(&self) -> &str {
        "decoder"
    }

    /// Allocate decode resources. `interval` is the frame sampling stride:
    /// only every `interval`-th frame needs to be emitted.
    fn create(&mut self, info: &VideoStreamInfo, interval: u32) -> Result<()>;

    /// Decode one packet. An EOS-flagged packet asks the backend to flush.
    /// An error means the backend cannot continue.
    fn process(&mut self, packet: &EsPacket) -> Result<()>;

    /// Release decode resources. Called exactly once per created backend,
    /// and also after a failed `create`.
    fn destroy(&mut self);
}
