// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-source decode configuration, optionally loaded from YAML.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{DecoderType, Result, StreamError, VideoCodec};

/// Configuration read by a stream ingestion handler on every `open`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceParam {
    /// Device to bind the decode thread to. Negative means none.
    pub device_id: i32,
    pub decoder_type: DecoderType,
    /// Codec of the incoming elementary stream.
    pub codec: VideoCodec,
    /// Largest frame the hardware backend allocates surfaces for.
    pub max_width: u32,
    pub max_height: u32,
    /// Frame sampling stride handed to the backend.
    pub interval: u32,
    /// Packets buffered between `write` and the decode worker.
    pub queue_capacity: usize,
    /// Upper bound on one `write` call.
    pub write_timeout_ms: u64,
    /// Worker pop timeout; also bounds how long `close` waits for the join.
    pub pop_timeout_ms: u64,
    /// Upper bound on waiting for parser metadata before giving up.
    pub info_timeout_ms: u64,
}

impl Default for SourceParam {
    fn default() -> Self {
        Self {
            device_id: -1,
            decoder_type: DecoderType::Software,
            codec: VideoCodec::Mjpeg,
            max_width: 1920,
            max_height: 1080,
            interval: 1,
            queue_capacity: 60,
            write_timeout_ms: 1000,
            pop_timeout_ms: 1000,
            info_timeout_ms: 10_000,
        }
    }
}

impl SourceParam {
    pub fn hardware(device_id: i32, max_width: u32, max_height: u32) -> Self {
        Self {
            device_id,
            decoder_type: DecoderType::Hardware,
            max_width,
            max_height,
            ..Default::default()
        }
    }

    pub fn software() -> Self {
        Self::default()
    }

    pub fn with_device_id(mut self, device_id: i32) -> Self {
        self.device_id = device_id;
        self
    }

    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_pop_timeout(mut self, timeout: Duration) -> Self {
        self.pop_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_info_timeout(mut self, timeout: Duration) -> Self {
        self.info_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn has_device(&self) -> bool {
        self.device_id >= 0
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    pub fn info_timeout(&self) -> Duration {
        Duration::from_millis(self.info_timeout_ms)
    }

    /// Reject values the ingestion engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(StreamError::Configuration(
                "queue_capacity must be greater than zero".into(),
            ));
        }
        if self.interval == 0 {
            return Err(StreamError::Configuration(
                "interval must be greater than zero".into(),
            ));
        }
        if self.write_timeout_ms == 0 || self.pop_timeout_ms == 0 || self.info_timeout_ms == 0 {
            return Err(StreamError::Configuration(
                "write, pop and info timeouts must be greater than zero".into(),
            ));
        }
        if self.decoder_type == DecoderType::Hardware
            && (self.max_width == 0 || self.max_height == 0)
        {
            return Err(StreamError::Configuration(format!(
                "hardware decode needs non-zero bounds, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        Ok(())
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let param: Self = serde_yaml::from_str(content)
            .map_err(|e| StreamError::Configuration(format!("Failed to parse source param: {}", e)))?;
        param.validate()?;
        Ok(param)
    }

    /// Load and validate a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StreamError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let param = Self::from_yaml_str(&content)?;
        tracing::info!("Loaded source param from {}", path.display());
        Ok(param)
    }
}
