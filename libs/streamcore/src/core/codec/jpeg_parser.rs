// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Header-only MJPEG parser.
//!
//! Walks JPEG marker segments until the first start-of-frame header and
//! reports its dimensions. Entropy-coded data is never touched.

use super::{BitstreamParser, VideoCodec, VideoStreamInfo};
use crate::core::{Result, StreamError};

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

/// Give up looking for a frame header after this many buffered bytes.
const MAX_HEADER_BYTES: usize = 1 << 20;

fn is_sof(marker: u8) -> bool {
    // SOF0..SOF15 minus DHT (C4), JPG (C8) and DAC (CC).
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn is_standalone(marker: u8) -> bool {
    marker == TEM || (0xD0..=0xD7).contains(&marker) || marker == SOI || marker == EOI
}

fn be16(buf: &[u8], at: usize) -> usize {
    ((buf[at] as usize) << 8) | buf[at + 1] as usize
}

#[derive(Debug, Default)]
pub struct JpegParser {
    initialized: bool,
    buffer: Vec<u8>,
    seen_soi: bool,
    info: Option<VideoStreamInfo>,
}

impl JpegParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_scan(&mut self) {
        self.buffer.clear();
        self.seen_soi = false;
    }

    /// Consume whole segments from the buffer. Returns the frame info once a
    /// SOF header is complete; `Ok(None)` means more bytes are needed.
    fn scan(&mut self) -> Result<Option<VideoStreamInfo>> {
        if !self.seen_soi {
            match self
                .buffer
                .windows(2)
                .position(|w| w == [MARKER_PREFIX, SOI])
            {
                Some(at) => {
                    self.buffer.drain(..at + 2);
                    self.seen_soi = true;
                }
                None => {
                    // Keep a trailing 0xFF: it may start the SOI split across chunks.
                    let keep = usize::from(self.buffer.last() == Some(&MARKER_PREFIX));
                    let drop_to = self.buffer.len() - keep;
                    self.buffer.drain(..drop_to);
                    return Ok(None);
                }
            }
        }

        let buf = &self.buffer;
        let mut pos = 0;
        loop {
            if pos >= buf.len() {
                break;
            }
            if buf[pos] != MARKER_PREFIX {
                return Err(StreamError::Parser(format!(
                    "expected JPEG marker, found 0x{:02x}",
                    buf[pos]
                )));
            }
            // Fill bytes may pad any marker.
            let mut marker_at = pos + 1;
            while marker_at < buf.len() && buf[marker_at] == MARKER_PREFIX {
                marker_at += 1;
            }
            if marker_at >= buf.len() {
                break;
            }
            let marker = buf[marker_at];
            if marker == 0x00 {
                return Err(StreamError::Parser("stuffed byte outside scan data".into()));
            }
            if is_standalone(marker) {
                pos = marker_at + 1;
                continue;
            }
            if marker == SOS {
                return Err(StreamError::Parser("scan data before frame header".into()));
            }
            if marker_at + 3 > buf.len() {
                break;
            }
            let segment_len = be16(buf, marker_at + 1);
            if segment_len < 2 {
                return Err(StreamError::Parser(format!(
                    "invalid segment length {} for marker 0x{:02x}",
                    segment_len, marker
                )));
            }
            if is_sof(marker) {
                // length(2) precision(1) height(2) width(2)
                if segment_len < 8 {
                    return Err(StreamError::Parser("truncated frame header".into()));
                }
                if marker_at + 8 > buf.len() {
                    break;
                }
                let height = be16(buf, marker_at + 4) as u32;
                let width = be16(buf, marker_at + 6) as u32;
                if width == 0 || height == 0 {
                    return Err(StreamError::Parser(format!(
                        "frame header with zero dimension {}x{}",
                        width, height
                    )));
                }
                return Ok(Some(VideoStreamInfo::new(VideoCodec::Mjpeg, width, height)));
            }
            let next = marker_at + 1 + segment_len;
            if next > buf.len() {
                break;
            }
            pos = next;
        }

        self.buffer.drain(..pos);
        if self.buffer.len() > MAX_HEADER_BYTES {
            return Err(StreamError::Parser(format!(
                "no frame header within {} bytes",
                MAX_HEADER_BYTES
            )));
        }
        Ok(None)
    }
}

impl BitstreamParser for JpegParser {
    fn init(&mut self, codec_hint: VideoCodec) -> Result<()> {
        if codec_hint != VideoCodec::Mjpeg {
            return Err(StreamError::NotSupported(format!(
                "JpegParser cannot parse {}",
                codec_hint
            )));
        }
        self.free();
        self.initialized = true;
        Ok(())
    }

    fn parse(&mut self, data: &[u8]) -> Result<()> {
        if !self.initialized {
            return Err(StreamError::Parser("parser used before init".into()));
        }
        if self.info.is_some() || data.is_empty() {
            return Ok(());
        }

        self.buffer.extend_from_slice(data);
        match self.scan() {
            Ok(Some(info)) => {
                tracing::debug!(width = info.width, height = info.height, "JPEG frame header parsed");
                self.info = Some(info);
                self.reset_scan();
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                self.reset_scan();
                Err(e)
            }
        }
    }

    fn info(&self) -> Option<VideoStreamInfo> {
        self.info
    }

    fn free(&mut self) {
        self.reset_scan();
        self.buffer.shrink_to_fit();
        self.info = None;
    }
}
