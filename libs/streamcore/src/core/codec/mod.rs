// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Codec-facing types and the pluggable decode boundary.
//!
//! The ingestion engine only talks to [`DecoderBackend`] and
//! [`BitstreamParser`]; concrete codec logic lives behind those traits.

mod decoder_backend;
mod decoder_registry;
mod es_packet;
mod jpeg_parser;
mod parser;
mod video_codec;
mod video_stream_info;

pub use decoder_backend::{DecoderBackend, DecoderType};
pub use decoder_registry::{DecoderConstructor, DecoderRegistry, ParserConstructor};
pub use es_packet::{EsPacket, PacketFlags};
pub use jpeg_parser::JpegParser;
pub use parser::BitstreamParser;
pub use video_codec::VideoCodec;
pub use video_stream_info::VideoStreamInfo;

#[cfg(test)]
pub(crate) use jpeg_parser::tests::jpeg_header;
