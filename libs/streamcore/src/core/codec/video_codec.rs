// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Video codec identity.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::StreamError;

/// Codec carried by an elementary stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// Motion JPEG: a sequence of independent JPEG images.
    #[default]
    Mjpeg,
    /// H.264/AVC.
    H264,
    /// H.265/HEVC.
    H265,
}

impl VideoCodec {
    /// Short name, also accepted by [`FromStr`].
    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::Mjpeg => "mjpeg",
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
        }
    }

    /// MIME type for this codec.
    pub fn mime_type(&self) -> &'static str {
        match self {
            VideoCodec::Mjpeg => "video/x-motion-jpeg",
            VideoCodec::H264 => "video/h264",
            VideoCodec::H265 => "video/h265",
        }
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VideoCodec {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mjpeg" | "jpeg" => Ok(VideoCodec::Mjpeg),
            "h264" | "avc" => Ok(VideoCodec::H264),
            "h265" | "hevc" => Ok(VideoCodec::H265),
            other => Err(StreamError::NotSupported(format!("Unknown codec '{}'", other))),
        }
    }
}
