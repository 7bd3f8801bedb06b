// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use super::{VideoCodec, VideoStreamInfo};
use crate::core::Result;

/// Incremental parser that discovers stream metadata from raw bytes.
pub trait BitstreamParser: Send {
    /// Prepare for a stream of `codec_hint`. Fails for codecs the parser
    /// does not understand.
    fn init(&mut self, codec_hint: VideoCodec) -> Result<()>;

    /// Feed the next chunk of the elementary stream. An error means the
    /// bytes are malformed; the parser stays usable for later chunks.
    fn parse(&mut self, data: &[u8]) -> Result<()>;

    /// Stream metadata, once enough data has been parsed.
    fn info(&self) -> Option<VideoStreamInfo>;

    /// Drop all parse state.
    fn free(&mut self);
}
