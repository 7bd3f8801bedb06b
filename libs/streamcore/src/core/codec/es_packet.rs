// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use bitflags::bitflags;
use bytes::Bytes;

bitflags! {
    /// Per-packet flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PacketFlags: u32 {
        const KEY_FRAME = 0x01;
        /// No payload follows on this stream.
        const EOS = 0x02;
    }
}

/// One elementary-stream unit.
///
/// The payload is reference counted, so moving a packet through the queue
/// and into the decoder never copies the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EsPacket {
    pub data: Bytes,
    /// Presentation timestamp in stream time base units.
    pub pts: i64,
    pub flags: PacketFlags,
}

impl EsPacket {
    pub fn new(data: impl Into<Bytes>, pts: i64) -> Self {
        Self {
            data: data.into(),
            pts,
            flags: PacketFlags::empty(),
        }
    }

    /// Copy a borrowed payload into an owned packet.
    pub fn copy_from_slice(data: &[u8], pts: i64) -> Self {
        Self::new(Bytes::copy_from_slice(data), pts)
    }

    /// An end-of-stream marker without payload.
    pub fn eos() -> Self {
        Self {
            data: Bytes::new(),
            pts: 0,
            flags: PacketFlags::EOS,
        }
    }

    pub fn with_flags(mut self, flags: PacketFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_eos(&self) -> bool {
        self.flags.contains(PacketFlags::EOS)
    }

    pub fn is_key_frame(&self) -> bool {
        self.flags.contains(PacketFlags::KEY_FRAME)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
