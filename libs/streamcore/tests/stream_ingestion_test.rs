// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use streamcore::{
    DecoderBackend, DecoderRegistry, DecoderType, DeviceBinder, EsPacket, Event, EventBus,
    EventHandleFlag, EventType, Result, SourceParam, StaticConfigProvider, StreamError,
    StreamIngestionHandler, VideoStreamInfo, WriteError,
};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorded {
    created: Vec<(VideoStreamInfo, u32)>,
    processed: Vec<EsPacket>,
    destroyed: usize,
}

impl Recorded {
    fn normal_frames(&self) -> usize {
        self.processed.iter().filter(|p| !p.is_eos()).count()
    }

    fn eos_calls(&self) -> usize {
        self.processed.iter().filter(|p| p.is_eos()).count()
    }
}

struct MockDecoder {
    log: Arc<Mutex<Recorded>>,
    fail_on_call: Option<usize>,
    gate: Option<Receiver<()>>,
}

impl DecoderBackend for MockDecoder {
    fn name(&self) -> &str {
        "mock"
    }

    fn create(&mut self, info: &VideoStreamInfo, interval: u32) -> Result<()> {
        self.log.lock().created.push((*info, interval));
        Ok(())
    }

    fn process(&mut self, packet: &EsPacket) -> Result<()> {
        let call = {
            let mut log = self.log.lock();
            log.processed.push(packet.clone());
            log.processed.len()
        };
        if let Some(gate) = &self.gate {
            // Disconnect releases every pending call.
            let _ = gate.recv_timeout(Duration::from_secs(10));
        }
        if self.fail_on_call == Some(call) {
            return Err(StreamError::Decoder(format!("bad frame at call {}", call)));
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.log.lock().destroyed += 1;
    }
}

struct FailingBinder;

impl DeviceBinder for FailingBinder {
    fn bind_current_thread(&self, device_id: i32) -> Result<()> {
        Err(StreamError::Device(format!("device {} unavailable", device_id)))
    }
}

struct Harness {
    bus: Arc<EventBus>,
    events: Arc<Mutex<Vec<Event>>>,
    log: Arc<Mutex<Recorded>>,
}

impl Harness {
    fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        {
            let events = Arc::clone(&events);
            bus.add_watch(move |event| {
                events.lock().push(event.clone());
                EventHandleFlag::Continue
            });
        }
        bus.start().unwrap();
        Self {
            bus,
            events,
            log: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    fn registry(&self, fail_on_call: Option<usize>, gate: Option<Receiver<()>>) -> DecoderRegistry {
        let mut registry = DecoderRegistry::new();
        for decoder_type in [DecoderType::Hardware, DecoderType::Software] {
            let log = Arc::clone(&self.log);
            let gate = gate.clone();
            registry = registry.with_decoder(decoder_type, move || {
                Box::new(MockDecoder {
                    log: Arc::clone(&log),
                    fail_on_call,
                    gate: gate.clone(),
                }) as Box<dyn DecoderBackend>
            });
        }
        registry
    }

    fn handler(&self, param: SourceParam, registry: DecoderRegistry) -> StreamIngestionHandler {
        StreamIngestionHandler::builder("cam0")
            .stream_index(0)
            .config(Arc::new(StaticConfigProvider::new("source", param)))
            .event_bus(Arc::clone(&self.bus))
            .registry(registry)
            .build()
            .unwrap()
    }

    fn events_of(&self, event_type: EventType) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Smallest well-formed baseline JPEG the header parser accepts.
fn jpeg_frame(width: u16, height: u16) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
    out.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    out.extend_from_slice(&[0xAB, 0xCD]);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn fast_software() -> SourceParam {
    SourceParam::software()
        .with_pop_timeout(Duration::from_millis(50))
        .with_info_timeout(Duration::from_secs(2))
}

fn fast_hardware() -> SourceParam {
    SourceParam::hardware(-1, 1280, 720).with_pop_timeout(Duration::from_millis(50))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_software_path_three_frames_then_eos() {
    let harness = Harness::new();
    let handler = harness.handler(
        fast_software().with_queue_capacity(4),
        harness.registry(None, None),
    );
    handler.open().unwrap();

    for pts in 0..3 {
        assert_eq!(
            handler.write(EsPacket::copy_from_slice(&jpeg_frame(640, 360), pts)),
            Ok(())
        );
    }
    assert_eq!(handler.write(EsPacket::eos()), Ok(()));

    assert!(wait_until(Duration::from_secs(3), || !handler.is_worker_alive()));

    {
        let log = harness.log.lock();
        assert_eq!(log.created.len(), 1);
        assert_eq!((log.created[0].0.width, log.created[0].0.height), (640, 360));
        assert_eq!(log.normal_frames(), 3);
        assert_eq!(log.eos_calls(), 1);
        assert!(log.processed.last().unwrap().is_eos());
        let pts: Vec<i64> = log.processed[..3].iter().map(|p| p.pts).collect();
        assert_eq!(pts, vec![0, 1, 2]);
        assert_eq!(log.destroyed, 1);
    }

    let start = Instant::now();
    handler.close();
    assert!(start.elapsed() < Duration::from_secs(1));

    assert!(wait_until(Duration::from_secs(2), || {
        !harness.events_of(EventType::Eos).is_empty()
    }));
    let eos = harness.events_of(EventType::Eos);
    assert_eq!(eos.len(), 1);
    assert_eq!(eos[0].stream_id, "cam0");
    assert_eq!(eos[0].module_name, "source");
    assert!(harness.events_of(EventType::StreamError).is_empty());
}

#[test]
fn test_hardware_path_uses_configured_bounds() {
    let harness = Harness::new();
    let handler = harness.handler(fast_hardware().with_interval(3), harness.registry(None, None));
    handler.open().unwrap();
    assert!(!handler.has_parser());

    for pts in 0..5 {
        // Hardware path does no parsing, any payload is accepted.
        handler.write(EsPacket::copy_from_slice(&[pts as u8; 16], pts)).unwrap();
    }
    handler.write(EsPacket::eos()).unwrap();

    assert!(wait_until(Duration::from_secs(3), || !handler.is_worker_alive()));
    handler.close();

    let log = harness.log.lock();
    assert_eq!(log.created.len(), 1);
    let (info, interval) = log.created[0];
    assert_eq!((info.width, info.height, interval), (1280, 720, 3));
    assert_eq!(log.normal_frames(), 5);
    assert_eq!(log.eos_calls(), 1);
}

#[test]
fn test_malformed_payload_is_rejected_without_event() {
    let harness = Harness::new();
    let handler = harness.handler(fast_software(), harness.registry(None, None));
    handler.open().unwrap();

    let result = handler.write(EsPacket::copy_from_slice(&[0xFF, 0xD8, 0x00, 0x01], 0));
    assert!(matches!(result, Err(WriteError::Parse(_))));
    assert_eq!(result.unwrap_err().code(), -2);
    assert_eq!(handler.queued_packets(), Some(0));

    // The stream keeps accepting well-formed data afterwards.
    handler
        .write(EsPacket::copy_from_slice(&jpeg_frame(320, 240), 1))
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || harness.log.lock().normal_frames() == 1));

    handler.close();
    assert!(harness.events_of(EventType::StreamError).is_empty());
    assert!(harness.events_of(EventType::Error).is_empty());
}

#[test]
fn test_device_bind_failure_posts_single_event() {
    let harness = Harness::new();
    let handler = StreamIngestionHandler::builder("cam7")
        .stream_index(7)
        .config(Arc::new(StaticConfigProvider::new(
            "source",
            SourceParam::hardware(0, 1920, 1080),
        )))
        .event_bus(Arc::clone(&harness.bus))
        .registry(harness.registry(None, None))
        .device_binder(Arc::new(FailingBinder))
        .build()
        .unwrap();
    handler.open().unwrap();

    assert!(wait_until(Duration::from_secs(2), || !handler.is_worker_alive()));
    assert!(wait_until(Duration::from_secs(2), || {
        !harness.events_of(EventType::StreamError).is_empty()
    }));
    std::thread::sleep(Duration::from_millis(100));

    let errors = harness.events_of(EventType::StreamError);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stream_id, "cam7");
    assert!(errors[0].message.contains("failed to setup device"));
    assert!(harness.log.lock().created.is_empty());
    assert!(harness.log.lock().processed.is_empty());

    handler.close();
}

#[test]
fn test_metadata_timeout_posts_single_event() {
    let harness = Harness::new();
    let handler = harness.handler(
        fast_software().with_info_timeout(Duration::from_millis(100)),
        harness.registry(None, None),
    );
    handler.open().unwrap();

    assert!(wait_until(Duration::from_secs(2), || !handler.is_worker_alive()));
    assert!(wait_until(Duration::from_secs(2), || {
        !harness.events_of(EventType::StreamError).is_empty()
    }));
    assert_eq!(harness.events_of(EventType::StreamError).len(), 1);
    assert!(harness.log.lock().created.is_empty());

    handler.close();
}

#[test]
fn test_close_while_waiting_for_metadata_is_prompt_and_silent() {
    let harness = Harness::new();
    let handler = harness.handler(
        fast_software().with_info_timeout(Duration::from_secs(30)),
        harness.registry(None, None),
    );
    handler.open().unwrap();
    std::thread::sleep(Duration::from_millis(50));

    let start = Instant::now();
    handler.close();
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(!handler.has_parser());

    std::thread::sleep(Duration::from_millis(150));
    assert!(harness.events_of(EventType::StreamError).is_empty());
}

#[test]
fn test_decode_failure_posts_stream_error_and_stops() {
    let harness = Harness::new();
    let handler = harness.handler(fast_hardware(), harness.registry(Some(2), None));
    handler.open().unwrap();

    for pts in 0..4 {
        handler.write(EsPacket::copy_from_slice(&[1, 2, 3], pts)).unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || !handler.is_worker_alive()));
    assert!(wait_until(Duration::from_secs(2), || {
        !harness.events_of(EventType::StreamError).is_empty()
    }));

    let errors = harness.events_of(EventType::StreamError);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("bad frame"));
    assert_eq!(harness.log.lock().processed.len(), 2);
    assert_eq!(harness.log.lock().destroyed, 1);

    handler.close();
}

#[test]
fn test_full_queue_write_times_out_and_keeps_contents() {
    let harness = Harness::new();
    let (release, gate): (Sender<()>, Receiver<()>) = crossbeam_channel::unbounded();
    let handler = harness.handler(
        fast_hardware()
            .with_queue_capacity(2)
            .with_write_timeout(Duration::from_millis(200)),
        harness.registry(None, Some(gate)),
    );
    handler.open().unwrap();

    handler.write(EsPacket::copy_from_slice(&[0], 0)).unwrap();
    assert!(wait_until(Duration::from_secs(2), || harness.log.lock().processed.len() == 1));

    handler.write(EsPacket::copy_from_slice(&[1], 1)).unwrap();
    handler.write(EsPacket::copy_from_slice(&[2], 2)).unwrap();

    let start = Instant::now();
    let result = handler.write(EsPacket::copy_from_slice(&[3], 3));
    let elapsed = start.elapsed();
    assert_eq!(result, Err(WriteError::QueueUnavailable));
    assert!(elapsed >= Duration::from_millis(150));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(handler.queued_packets(), Some(2));

    drop(release);
    assert!(wait_until(Duration::from_secs(2), || harness.log.lock().processed.len() == 3));
    let pts: Vec<i64> = harness.log.lock().processed.iter().map(|p| p.pts).collect();
    assert_eq!(pts, vec![0, 1, 2]);

    handler.close();
}

#[test]
fn test_close_unblocks_pending_write() {
    let harness = Harness::new();
    let (release, gate) = crossbeam_channel::unbounded::<()>();
    let handler = Arc::new(harness.handler(
        fast_hardware()
            .with_queue_capacity(1)
            .with_write_timeout(Duration::from_secs(30)),
        harness.registry(None, Some(gate)),
    ));
    handler.open().unwrap();

    handler.write(EsPacket::copy_from_slice(&[0], 0)).unwrap();
    assert!(wait_until(Duration::from_secs(2), || harness.log.lock().processed.len() == 1));
    handler.write(EsPacket::copy_from_slice(&[1], 1)).unwrap();

    let writer = {
        let handler = Arc::clone(&handler);
        std::thread::spawn(move || {
            let start = Instant::now();
            let result = handler.write(EsPacket::copy_from_slice(&[2], 2));
            (result, start.elapsed())
        })
    };
    std::thread::sleep(Duration::from_millis(50));

    let closer = {
        let handler = Arc::clone(&handler);
        std::thread::spawn(move || handler.close())
    };

    let (result, elapsed) = writer.join().unwrap();
    assert_eq!(result, Err(WriteError::QueueUnavailable));
    assert!(elapsed < Duration::from_secs(2));

    drop(release);
    closer.join().unwrap();
    assert!(!handler.is_running());
    assert!(handler.queued_packets().is_none());
}

#[test]
fn test_reopen_after_close() {
    let harness = Harness::new();
    let handler = harness.handler(fast_hardware(), harness.registry(None, None));

    for round in 0..2 {
        handler.open().unwrap();
        handler.write(EsPacket::copy_from_slice(&[round], round as i64)).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            harness.log.lock().normal_frames() == round as usize + 1
        }));
        handler.close();
        assert!(!handler.has_decoder());
    }

    let log = harness.log.lock();
    assert_eq!(log.created.len(), 2);
    assert_eq!(log.destroyed, 2);
}

#[test]
fn test_events_fall_back_to_log_without_bus() {
    let log = Arc::new(Mutex::new(Recorded::default()));
    let registry = {
        let log = Arc::clone(&log);
        DecoderRegistry::new().with_decoder(DecoderType::Hardware, move || {
            Box::new(MockDecoder {
                log: Arc::clone(&log),
                fail_on_call: None,
                gate: None,
            }) as Box<dyn DecoderBackend>
        })
    };
    let handler = StreamIngestionHandler::builder("cam0")
        .stream_index(0)
        .config(Arc::new(StaticConfigProvider::new("source", fast_hardware())))
        .registry(registry)
        .build()
        .unwrap();
    handler.open().unwrap();
    handler.write(EsPacket::copy_from_slice(&[9], 0)).unwrap();
    handler.write(EsPacket::eos()).unwrap();

    assert!(wait_until(Duration::from_secs(2), || !handler.is_worker_alive()));
    handler.close();
    assert_eq!(log.lock().eos_calls(), 1);
}

#[test]
fn test_close_racing_open_leaves_no_worker() {
    let harness = Harness::new();
    let handler = Arc::new(harness.handler(fast_software(), harness.registry(None, None)));

    for _ in 0..20 {
        let opener = {
            let handler = Arc::clone(&handler);
            std::thread::spawn(move || handler.open().is_ok())
        };
        let closer = {
            let handler = Arc::clone(&handler);
            std::thread::spawn(move || handler.close())
        };
        let opened = opener.join().unwrap();
        closer.join().unwrap();

        if !handler.is_running() {
            // Close ran last: everything is released.
            assert!(!handler.is_worker_alive());
            assert!(handler.queued_packets().is_none());
            assert!(!handler.has_parser());
            assert!(!handler.has_decoder());
        } else {
            assert!(opened);
        }

        let start = Instant::now();
        handler.close();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!handler.is_running());
        assert!(!handler.is_worker_alive());
        assert!(handler.queued_packets().is_none());
        assert!(!handler.has_parser());
        assert!(!handler.has_decoder());
    }
}

#[test]
fn test_new_source_param_applies_on_next_open() {
    let harness = Harness::new();
    let provider = Arc::new(StaticConfigProvider::new("source", fast_hardware()));
    let handler = StreamIngestionHandler::builder("cam0")
        .stream_index(0)
        .config(Arc::clone(&provider) as Arc<dyn streamcore::ConfigProvider>)
        .event_bus(Arc::clone(&harness.bus))
        .registry(harness.registry(None, None))
        .build()
        .unwrap();

    handler.open().unwrap();
    assert!(wait_until(Duration::from_secs(2), || harness.log.lock().created.len() == 1));
    handler.close();

    provider.set_source_param(
        SourceParam::hardware(-1, 640, 480)
            .with_codec(streamcore::VideoCodec::H264)
            .with_pop_timeout(Duration::from_millis(50)),
    );
    handler.open().unwrap();
    assert!(wait_until(Duration::from_secs(2), || harness.log.lock().created.len() == 2));
    handler.close();

    let log = harness.log.lock();
    let (first, _) = log.created[0];
    let (second, _) = log.created[1];
    assert_eq!((first.width, first.height), (1280, 720));
    assert_eq!((second.width, second.height), (640, 480));
    assert_eq!(second.codec, streamcore::VideoCodec::H264);
}
