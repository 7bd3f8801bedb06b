// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-stream ingestion façade.
//!
//! A producer calls [`StreamIngestionHandler::write`] with elementary-stream
//! packets; a dedicated decode thread pulls them off a bounded queue and
//! feeds the configured [`DecoderBackend`](crate::core::DecoderBackend).
//! Failures on the decode thread are reported on the [`EventBus`], never
//! returned to the producer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::decode_worker::{DecodeWorker, StreamEventPoster, WorkerShared};
use crate::core::codec::{DecoderRegistry, EsPacket};
use crate::core::config::ConfigProvider;
use crate::core::device::{DeviceBinder, NoopDeviceBinder};
use crate::core::pubsub::EventBus;
use crate::core::queue::BoundedQueue;
use crate::core::{Result, StreamError, WriteError};

/// Longest single push attempt inside `write` before re-checking state.
const WRITE_RETRY_SLICE: Duration = Duration::from_millis(100);

pub struct StreamIngestionHandlerBuilder {
    stream_id: String,
    stream_index: Option<u32>,
    config: Option<Arc<dyn ConfigProvider>>,
    bus: Option<Arc<EventBus>>,
    registry: DecoderRegistry,
    device_binder: Arc<dyn DeviceBinder>,
    span: Option<tracing::Span>,
}

impl StreamIngestionHandlerBuilder {
    pub fn stream_index(mut self, stream_index: u32) -> Self {
        self.stream_index = Some(stream_index);
        self
    }

    pub fn config(mut self, config: Arc<dyn ConfigProvider>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn registry(mut self, registry: DecoderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn device_binder(mut self, device_binder: Arc<dyn DeviceBinder>) -> Self {
        self.device_binder = device_binder;
        self
    }

    /// Span entered by the decode thread. Defaults to one carrying the
    /// module name and stream id.
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<StreamIngestionHandler> {
        if self.stream_id.is_empty() {
            return Err(StreamError::Configuration(
                "stream_id must not be empty".into(),
            ));
        }

        Ok(StreamIngestionHandler {
            stream_id: self.stream_id,
            stream_index: Mutex::new(self.stream_index),
            config: self.config,
            bus: self.bus,
            registry: self.registry,
            device_binder: self.device_binder,
            span: self.span,
            shared: Arc::new(WorkerShared::new()),
            queue: Mutex::new(None),
            write_timeout_ms: AtomicU64::new(0),
            worker: Mutex::new(None),
        })
    }
}

pub struct StreamIngestionHandler {
    stream_id: String,
    stream_index: Mutex<Option<u32>>,
    config: Option<Arc<dyn ConfigProvider>>,
    bus: Option<Arc<EventBus>>,
    registry: DecoderRegistry,
    device_binder: Arc<dyn DeviceBinder>,
    span: Option<tracing::Span>,
    shared: Arc<WorkerShared>,
    queue: Mutex<Option<Arc<BoundedQueue<EsPacket>>>>,
    write_timeout_ms: AtomicU64,
    /// Decode thread. The lock also serializes `open` against `close`.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StreamIngestionHandler {
    pub fn builder(stream_id: impl Into<String>) -> StreamIngestionHandlerBuilder {
        StreamIngestionHandlerBuilder {
            stream_id: stream_id.into(),
            stream_index: None,
            config: None,
            bus: None,
            registry: DecoderRegistry::new(),
            device_binder: Arc::new(NoopDeviceBinder),
            span: None,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn stream_index(&self) -> Option<u32> {
        *self.stream_index.lock()
    }

    /// Assign the position of this stream within its module. Takes effect on
    /// the next `open`.
    pub fn set_stream_index(&self, stream_index: u32) {
        *self.stream_index.lock() = Some(stream_index);
    }

    /// True between a successful `open` and the matching `close`, unless the
    /// handler was never opened.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// True while the decode thread is still executing.
    pub fn is_worker_alive(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Packets waiting for the decoder, or `None` when no queue exists.
    pub fn queued_packets(&self) -> Option<usize> {
        self.queue.lock().as_ref().map(|queue| queue.len())
    }

    pub fn has_parser(&self) -> bool {
        self.shared.parser.is_present()
    }

    pub fn has_decoder(&self) -> bool {
        self.shared.decoder.lock().is_some()
    }

    /// Allocate the queue and parser, then start the decode thread.
    ///
    /// Fails without side effects when the config provider or stream index
    /// is missing, the source parameters are invalid, or the handler is
    /// already open.
    pub fn open(&self) -> Result<()> {
        let Some(config) = self.config.as_ref() else {
            tracing::error!(stream_id = %self.stream_id, "No config provider attached");
            return Err(StreamError::Configuration(format!(
                "stream {} has no config provider",
                self.stream_id
            )));
        };
        let Some(stream_index) = self.stream_index() else {
            tracing::error!(stream_id = %self.stream_id, "Stream index not set");
            return Err(StreamError::Configuration(format!(
                "stream {} has no stream index",
                self.stream_id
            )));
        };

        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(StreamError::Runtime(format!(
                "stream {} is already open",
                self.stream_id
            )));
        }

        let module_name = config.module_name().to_string();
        let param = config.source_param();
        param.validate()?;

        let queue = Arc::new(BoundedQueue::new(param.queue_capacity)?);

        if param.decoder_type.needs_parser() {
            let mut parser = self.registry.create_parser(param.codec)?;
            parser.init(param.codec)?;
            self.shared.parser.install(parser);
        }

        *self.queue.lock() = Some(Arc::clone(&queue));
        self.write_timeout_ms
            .store(param.write_timeout_ms, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);

        let span = self.span.clone().unwrap_or_else(|| {
            tracing::info_span!("stream", module = %module_name, stream_id = %self.stream_id)
        });
        let thread_name = format!("{}-{}", module_name, stream_index);

        tracing::info!(
            stream_id = %self.stream_id,
            thread = %thread_name,
            decoder_type = %param.decoder_type,
            codec = %param.codec,
            queue_capacity = param.queue_capacity,
            "Opening stream"
        );

        let decode_worker = DecodeWorker {
            shared: Arc::clone(&self.shared),
            queue,
            param,
            registry: self.registry.clone(),
            device_binder: Arc::clone(&self.device_binder),
            poster: StreamEventPoster {
                bus: self.bus.clone(),
                module_name,
                stream_id: self.stream_id.clone(),
            },
        };

        let spawned = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let _entered = span.enter();
                decode_worker.run();
            });

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.release_resources();
                Err(StreamError::Runtime(format!(
                    "Failed to spawn decode thread: {}",
                    e
                )))
            }
        }
    }

    /// Stop the decode thread, join it, and release the queue, parser and
    /// decoder. Safe to call repeatedly or without a prior `open`.
    pub fn close(&self) {
        let mut worker = self.worker.lock();
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.parser.notify();

        if let Some(handle) = worker.take() {
            if handle.thread().id() == std::thread::current().id() {
                tracing::warn!(stream_id = %self.stream_id, "close() called from the decode thread, not joining");
            } else if handle.join().is_err() {
                tracing::warn!(stream_id = %self.stream_id, "Decode thread panicked");
            }
            tracing::info!(stream_id = %self.stream_id, "Stream closed");
        }

        self.release_resources();
    }

    fn release_resources(&self) {
        self.queue.lock().take();
        self.shared.parser.free();
        self.shared.decoder.lock().take();
    }

    /// Submit one packet for decoding.
    ///
    /// Non-empty payloads are run through the parser first, when one is
    /// active, and rejected with [`WriteError::Parse`] if malformed. The push
    /// waits for queue space for at most the configured write timeout, and
    /// gives up early if the handler is closed meanwhile.
    pub fn write(&self, packet: EsPacket) -> std::result::Result<(), WriteError> {
        if !packet.is_empty() {
            if let Some(Err(e)) = self.shared.parser.parse(&packet.data) {
                tracing::debug!(stream_id = %self.stream_id, pts = packet.pts, error = %e, "Parse failed");
                return Err(WriteError::Parse(e.to_string()));
            }
        }

        let Some(queue) = self.queue.lock().clone() else {
            return Err(WriteError::QueueUnavailable);
        };

        let write_timeout = Duration::from_millis(self.write_timeout_ms.load(Ordering::SeqCst));
        let deadline = Instant::now() + write_timeout;
        let mut packet = packet;

        while self.shared.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match queue.push(packet, WRITE_RETRY_SLICE.min(deadline - now)) {
                Ok(()) => return Ok(()),
                Err(rejected) => packet = rejected,
            }
        }

        tracing::debug!(
            stream_id = %self.stream_id,
            pts = packet.pts,
            queued = queue.len(),
            "Write gave up waiting for queue space"
        );
        Err(WriteError::QueueUnavailable)
    }
}

impl Drop for StreamIngestionHandler {
    fn drop(&mut self) {
        self.close();
    }
}
