// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Table of backend and parser constructors.
//!
//! The ingestion handler picks a backend by looking up the configured
//! [`DecoderType`]; adding a new backend kind is one more registry entry.

use std::collections::HashMap;
use std::sync::Arc;

use super::{BitstreamParser, DecoderBackend, DecoderType, JpegParser, VideoCodec};
use crate::core::{Result, StreamError};

pub type DecoderConstructor = Arc<dyn Fn() -> Box<dyn DecoderBackend> + Send + Sync>;
pub type ParserConstructor = Arc<dyn Fn() -> Box<dyn BitstreamParser> + Send + Sync>;

#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<DecoderType, DecoderConstructor>,
    parsers: HashMap<VideoCodec, ParserConstructor>,
}

impl DecoderRegistry {
    /// Registry with no backends and the built-in MJPEG parser.
    pub fn new() -> Self {
        let mut parsers: HashMap<VideoCodec, ParserConstructor> = HashMap::new();
        parsers.insert(
            VideoCodec::Mjpeg,
            Arc::new(|| Box::new(JpegParser::new()) as Box<dyn BitstreamParser>),
        );
        Self {
            decoders: HashMap::new(),
            parsers,
        }
    }

    /// Register (or replace) the backend used for `decoder_type`.
    pub fn with_decoder<F>(mut self, decoder_type: DecoderType, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn DecoderBackend> + Send + Sync + 'static,
    {
        self.decoders.insert(decoder_type, Arc::new(constructor));
        self
    }

    /// Register (or replace) the parser used for `codec`.
    pub fn with_parser<F>(mut self, codec: VideoCodec, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn BitstreamParser> + Send + Sync + 'static,
    {
        self.parsers.insert(codec, Arc::new(constructor));
        self
    }

    pub fn has_decoder(&self, decoder_type: DecoderType) -> bool {
        self.decoders.contains_key(&decoder_type)
    }

    pub fn create_decoder(&self, decoder_type: DecoderType) -> Result<Box<dyn DecoderBackend>> {
        self.decoders
            .get(&decoder_type)
            .map(|constructor| constructor())
            .ok_or_else(|| {
                StreamError::NotSupported(format!("No {} decoder registered", decoder_type))
            })
    }

    pub fn create_parser(&self, codec: VideoCodec) -> Result<Box<dyn BitstreamParser>> {
        self.parsers
            .get(&codec)
            .map(|constructor| constructor())
            .ok_or_else(|| StreamError::NotSupported(format!("No {} parser registered", codec)))
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("decoders", &self.decoders.keys().collect::<Vec<_>>())
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}
