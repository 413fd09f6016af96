use sleepwave_core::ErrorKind;
use sleepwave_processing::{StageLabel, WindowConfig};
use sleepwave_simulation::{
    generate_bytes, ChannelSpec, RecordingGenerator, RecordingSpec, SignalPattern,
};
use sleepwave_stream::{
    spawn_stream, ChannelSelector, EndReason, StreamConfig, StreamEvent, StreamOutcome,
    StreamSession,
};
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reader that counts reads and records when it is dropped
struct InstrumentedReader {
    inner: Cursor<Vec<u8>>,
    reads: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
    /// Fail every read once this many bytes have been served
    fail_after: Option<u64>,
}

impl InstrumentedReader {
    fn new(bytes: Vec<u8>) -> (Self, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        let reader = InstrumentedReader {
            inner: Cursor::new(bytes),
            reads: Arc::clone(&reads),
            dropped: Arc::clone(&dropped),
            fail_after: None,
        };
        (reader, reads, dropped)
    }
}

impl Read for InstrumentedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if self.inner.position() >= limit {
                return Err(io::Error::new(io::ErrorKind::Other, "disk went away"));
            }
        }
        self.inner.read(buf)
    }
}

impl Drop for InstrumentedReader {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

fn recording(pattern: SignalPattern, rate: usize, seconds: usize) -> Vec<u8> {
    generate_bytes(RecordingSpec {
        noise_std: 0.5,
        seed: Some(11),
        ..RecordingSpec::single_channel(pattern, rate, seconds)
    })
    .unwrap()
}

fn config(tick_interval_ms: u64) -> StreamConfig {
    StreamConfig {
        tick_interval_ms,
        window: WindowConfig {
            display_seconds: 2.0,
            analysis_seconds: 4.0,
            step_seconds: 1.0,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_pacing_never_fires_early() {
    let bytes = recording(SignalPattern::Flat { level: 0.0 }, 50, 30);
    let mut session = StreamSession::from_reader(Cursor::new(bytes), config(50)).unwrap();

    let start = Instant::now();
    for _ in 0..5 {
        let event = session.next_event().await.unwrap();
        assert!(!event.is_terminal());
    }
    assert!(start.elapsed() >= Duration::from_millis(4 * 50));
}

#[tokio::test]
async fn test_io_failure_becomes_error_event() {
    let bytes = recording(SignalPattern::Flat { level: 0.0 }, 50, 30);
    let (mut reader, _reads, dropped) = InstrumentedReader::new(bytes);
    // header (512) plus three one-second records of 100 bytes
    reader.fail_after = Some(512 + 300);

    let mut session = StreamSession::from_reader(reader, config(1)).unwrap();
    let mut events = Vec::new();
    while let Some(event) = session.next_event().await {
        events.push(event);
    }

    assert_eq!(events.len(), 4);
    match &events[3] {
        StreamEvent::Error(failure) => {
            assert_eq!(failure.kind, ErrorKind::IoFailure);
            assert_eq!(failure.samples_read, 150);
            assert_eq!(failure.ticks, 3);
        }
        other => panic!("expected error event, got {:?}", other),
    }
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_truncated_recording_ends_cleanly() {
    let spec = RecordingSpec {
        unbounded: true,
        truncated_tail_bytes: 40,
        noise_std: 0.0,
        ..RecordingSpec::single_channel(SignalPattern::Flat { level: 3.0 }, 50, 6)
    };
    let bytes = generate_bytes(spec).unwrap();
    let mut session = StreamSession::from_reader(Cursor::new(bytes), config(1)).unwrap();

    let mut last = None;
    while let Some(event) = session.next_event().await {
        last = Some(event);
    }
    match last.unwrap() {
        StreamEvent::Done(summary) => {
            assert_eq!(summary.reason, EndReason::EndOfRecording);
            assert_eq!(summary.samples_read, 300);
            assert_eq!(summary.ticks, 6);
        }
        other => panic!("expected done, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_releases_reader_within_a_tick() {
    let bytes = recording(SignalPattern::Flat { level: 0.0 }, 50, 600);
    let (reader, reads, dropped) = InstrumentedReader::new(bytes);
    let session = StreamSession::from_reader(reader, config(20)).unwrap();

    let mut handle = spawn_stream(session);
    assert!(handle.events.recv().await.is_some());
    assert!(handle.events.recv().await.is_some());
    assert!(!dropped.load(Ordering::SeqCst));

    drop(handle.events);
    let outcome = tokio::time::timeout(Duration::from_millis(200), handle.task)
        .await
        .expect("stream did not stop")
        .unwrap();
    assert_eq!(outcome, StreamOutcome::Cancelled);
    assert!(dropped.load(Ordering::SeqCst));

    let settled = reads.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(reads.load(Ordering::SeqCst), settled);
}

#[tokio::test]
async fn test_sessions_on_one_file_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two_channels.edf");
    let spec = RecordingSpec {
        channels: vec![
            ChannelSpec::new("EEG Fpz-Cz", 100, SignalPattern::Stage { stage: StageLabel::N3 }),
            ChannelSpec::new("EEG Pz-Oz", 100, SignalPattern::Stage { stage: StageLabel::Awake }),
        ],
        records: 8,
        noise_std: 1.0,
        seed: Some(5),
        ..Default::default()
    };
    RecordingGenerator::new(spec).unwrap().write_file(&path).unwrap();

    let deep = StreamSession::open(
        &path,
        StreamConfig {
            channel: ChannelSelector::Label("EEG Fpz-Cz".into()),
            ..config(1)
        },
    )
    .unwrap();
    let awake = StreamSession::open(
        &path,
        StreamConfig {
            channel: ChannelSelector::Index(1),
            ..config(1)
        },
    )
    .unwrap();

    for (mut session, expected) in [(deep, StageLabel::N3), (awake, StageLabel::Awake)] {
        let mut stages = Vec::new();
        while let Some(event) = session.next_event().await {
            if let Some(stage) = event.as_snapshot().and_then(|s| s.stage) {
                stages.push(stage);
            }
        }
        assert_eq!(stages.len(), 5);
        assert!(stages.iter().all(|&s| s == expected));
        assert!(session.is_released());
    }
}

#[tokio::test]
async fn test_missing_file_is_io_failure() {
    let dir = tempfile::tempdir().unwrap();
    let err = StreamSession::open(dir.path().join("absent.edf"), config(1))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_streams_on_multi_thread_runtime() {
    let handles: Vec<_> = [StageLabel::N3, StageLabel::Awake]
        .into_iter()
        .map(|stage| {
            let bytes = recording(SignalPattern::Stage { stage }, 100, 8);
            let session = StreamSession::from_reader(Cursor::new(bytes), config(1)).unwrap();
            (stage, spawn_stream(session))
        })
        .collect();

    let heartbeat = tokio::spawn(async {
        let mut beats = 0;
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(2)).await;
            beats += 1;
        }
        beats
    });

    for (expected, mut handle) in handles {
        let mut stages = Vec::new();
        while let Some(event) = handle.events.recv().await {
            if let Some(stage) = event.as_snapshot().and_then(|s| s.stage) {
                stages.push(stage);
            }
        }
        assert_eq!(
            handle.task.await.unwrap(),
            StreamOutcome::Completed(EndReason::EndOfRecording)
        );
        assert_eq!(stages.len(), 5);
        assert!(stages.iter().all(|&s| s == expected));
    }
    assert_eq!(heartbeat.await.unwrap(), 5);
}
