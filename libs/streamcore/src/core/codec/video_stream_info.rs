// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::VideoCodec;

/// Stream metadata a decoder backend needs before it can be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
}

impl VideoStreamInfo {
    pub fn new(codec: VideoCodec, width: u32, height: u32) -> Self {
        Self {
            codec,
            width,
            height,
        }
    }

    /// Whether both dimensions are known.
    pub fn is_resolved(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Whether the frame fits inside `max_width` x `max_height`.
    pub fn fits_within(&self, max_width: u32, max_height: u32) -> bool {
        self.width <= max_width && self.height <= max_height
    }
}
