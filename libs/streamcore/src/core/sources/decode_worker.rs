// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-stream decode thread: bind device, prepare the backend, drain the
//! packet queue, tear down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::parser_slot::ParserSlot;
use crate::core::codec::{DecoderBackend, DecoderRegistry, DecoderType, EsPacket, PacketFlags};
use crate::core::config::SourceParam;
use crate::core::device::DeviceBinder;
use crate::core::pubsub::{Event, EventBus, EventType};
use crate::core::queue::BoundedQueue;
use crate::core::{Result, StreamError, VideoStreamInfo};

/// Backend instance shared between the worker and the handler's teardown.
pub(crate) type SharedDecoder = Arc<Mutex<Box<dyn DecoderBackend>>>;

/// State visible to both the handler and its decode thread.
pub(crate) struct WorkerShared {
    pub(crate) running: AtomicBool,
    pub(crate) parser: ParserSlot,
    pub(crate) decoder: Mutex<Option<SharedDecoder>>,
}

impl WorkerShared {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            parser: ParserSlot::new(),
            decoder: Mutex::new(None),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Stamps events with the stream's identity and posts them, falling back to
/// the log when no bus is attached or the bus is not running.
#[derive(Clone)]
pub(crate) struct StreamEventPoster {
    pub(crate) bus: Option<Arc<EventBus>>,
    pub(crate) module_name: String,
    pub(crate) stream_id: String,
}

impl StreamEventPoster {
    pub(crate) fn post(&self, event_type: EventType, message: impl Into<String>) {
        let event = Event::new(event_type, message)
            .with_module(self.module_name.clone())
            .with_stream(self.stream_id.clone());

        let posted = match &self.bus {
            Some(bus) => bus.post_event(event.clone()),
            None => false,
        };
        if !posted {
            tracing::warn!(
                event_type = ?event.event_type,
                module = %event.module_name,
                stream_id = %event.stream_id,
                message = %event.message,
                "Event not delivered to a bus"
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopExit {
    Eos,
    DecodeFailed,
    Stopped,
}

/// Everything the decode thread owns for one `open` → `close` run.
pub(crate) struct DecodeWorker {
    pub(crate) shared: Arc<WorkerShared>,
    pub(crate) queue: Arc<BoundedQueue<EsPacket>>,
    pub(crate) param: SourceParam,
    pub(crate) registry: DecoderRegistry,
    pub(crate) device_binder: Arc<dyn DeviceBinder>,
    pub(crate) poster: StreamEventPoster,
}

impl DecodeWorker {
    pub(crate) fn run(self) {
        let stream_id = self.poster.stream_id.clone();

        if self.param.has_device() {
            if let Err(e) = self.device_binder.bind_current_thread(self.param.device_id) {
                tracing::error!(
                    stream_id = %stream_id,
                    device_id = self.param.device_id,
                    error = %e,
                    "Failed to bind device"
                );
                self.poster.post(
                    EventType::StreamError,
                    format!("stream_id {} failed to setup device: {}", stream_id, e),
                );
                return;
            }
        }

        let decoder = match self.prepare_resources() {
            Ok(decoder) => decoder,
            Err(e) => {
                if self.shared.is_running() {
                    tracing::error!(stream_id = %stream_id, error = %e, "Prepare codec resources failed");
                    self.poster.post(
                        EventType::StreamError,
                        format!("Prepare codec resources failed: {}", e),
                    );
                } else {
                    tracing::debug!(stream_id = %stream_id, "Closed before codec resources were ready");
                }
                return;
            }
        };

        *self.shared.decoder.lock() = Some(Arc::clone(&decoder));

        let exit = self.process_loop(&decoder);
        tracing::debug!(stream_id = %stream_id, ?exit, "Decode loop finished");

        self.clear_resources(&decoder);
        tracing::info!(stream_id = %stream_id, "DecodeLoop Exit");
    }

    fn resolve_stream_info(&self) -> Result<VideoStreamInfo> {
        match self.param.decoder_type {
            DecoderType::Hardware => Ok(VideoStreamInfo::new(
                self.param.codec,
                self.param.max_width,
                self.param.max_height,
            )),
            DecoderType::Software => self
                .shared
                .parser
                .wait_for_info(&self.shared.running, self.param.info_timeout())
                .ok_or_else(|| StreamError::Parser("stream metadata not available".into())),
        }
    }

    fn prepare_resources(&self) -> Result<SharedDecoder> {
        let info = self.resolve_stream_info()?;
        if !info.is_resolved() {
            return Err(StreamError::Parser(format!(
                "stream dimensions unresolved ({}x{})",
                info.width, info.height
            )));
        }
        if !self.shared.is_running() {
            return Err(StreamError::Runtime("handler closed".into()));
        }

        let mut decoder = self.registry.create_decoder(self.param.decoder_type)?;
        tracing::info!(
            stream_id = %self.poster.stream_id,
            backend = decoder.name(),
            codec = %info.codec,
            width = info.width,
            height = info.height,
            interval = self.param.interval,
            "Creating decoder"
        );
        if let Err(e) = decoder.create(&info, self.param.interval) {
            decoder.destroy();
            return Err(e);
        }
        Ok(Arc::new(Mutex::new(decoder)))
    }

    fn process_loop(&self, decoder: &SharedDecoder) -> LoopExit {
        let pop_timeout = self.param.pop_timeout();

        while self.shared.is_running() {
            let Some(mut packet) = self.queue.pop(pop_timeout) else {
                continue;
            };

            if packet.is_eos() {
                packet.flags = PacketFlags::EOS;
                tracing::info!(stream_id = %self.poster.stream_id, pts = packet.pts, "Eos reached");
                if let Err(e) = decoder.lock().process(&packet) {
                    tracing::warn!(stream_id = %self.poster.stream_id, error = %e, "Flushing decoder at EOS failed");
                }
                self.poster.post(EventType::Eos, "end of stream");
                return LoopExit::Eos;
            }

            packet.flags.remove(PacketFlags::EOS);
            if let Err(e) = decoder.lock().process(&packet) {
                tracing::error!(
                    stream_id = %self.poster.stream_id,
                    pts = packet.pts,
                    error = %e,
                    "Decoder process failed"
                );
                self.poster
                    .post(EventType::StreamError, format!("Decode failed: {}", e));
                return LoopExit::DecodeFailed;
            }
        }

        LoopExit::Stopped
    }

    fn clear_resources(&self, decoder: &SharedDecoder) {
        decoder.lock().destroy();
        self.shared.decoder.lock().take();
    }
}
