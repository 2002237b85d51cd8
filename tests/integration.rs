//! Integration tests for voice-stream.
//!
//! Note: Tests that require actual audio hardware are marked with
//! `#[ignore]` and should be run manually.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use voice_stream::format::decode_sample;
use voice_stream::{
    playback_channel, AudioFrame, CaptureConfig, ChannelSink, MockSource, PlaybackConfig,
    PlaybackState, Sink, SinkError, StreamConfig, StreamEvent, VoiceStream,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A test sink that fails a fixed number of writes before succeeding.
#[derive(Clone)]
struct FlakySink {
    failures_left: Arc<AtomicUsize>,
    delivered: Arc<Mutex<Vec<u64>>>,
}

impl FlakySink {
    fn new(failures: usize) -> Self {
        Self {
            failures_left: Arc::new(AtomicUsize::new(failures)),
            delivered: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Sink for FlakySink {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn write(&self, frame: &AudioFrame) -> Result<(), SinkError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SinkError::write_failed("connection reset"));
        }
        self.delivered.lock().unwrap().push(frame.sequence);
        Ok(())
    }
}

fn zero_crossings(samples: &[f32]) -> usize {
    samples
        .windows(2)
        .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
        .count()
}

fn recorder() -> (
    impl Fn(StreamEvent) + Send + Sync + 'static,
    Arc<Mutex<Vec<StreamEvent>>>,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    (move |e: StreamEvent| sink.lock().unwrap().push(e), events)
}

async fn recv_frame(rx: &mut mpsc::Receiver<AudioFrame>) -> AudioFrame {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("frame channel closed")
}

#[test]
fn test_one_second_tone_plays_at_48k() {
    let (mut producer, mut renderer) =
        playback_channel(&PlaybackConfig::with_output_rate(48_000)).unwrap();

    // One second of 440 Hz plus one sample of lookahead for the interpolator
    let mut mock = MockSource::wire();
    mock.generate_tone(440.0, 0.5, 1_000);
    let mut tone = mock.take_samples();
    tone.push(tone[tone.len() - 1]);
    mock.add_samples(&tone);
    let mut frames = mock.into_frames(4096).into_iter();

    let mut output = Vec::with_capacity(48_000);
    let mut quantum = [0.0f32; 480];
    let mut rendered = 0;

    for _ in 0..100 {
        // Keep the jitter buffer fed like a steady network would
        if renderer.buffered() < 6_000 {
            if let Some(frame) = frames.next() {
                producer.push_frame(&frame);
            }
        }
        let report = renderer.render(&mut quantum);
        assert!(!report.underrun, "underran after {rendered} samples");
        rendered += report.rendered;
        output.extend_from_slice(&quantum);
    }

    assert_eq!(rendered, 48_000);
    assert_eq!(output.len(), 48_000);

    // 440 Hz crosses zero 880 times a second
    let crossings = zero_crossings(&output);
    assert!((876..=884).contains(&crossings), "got {crossings} crossings");
}

#[test]
fn test_one_second_of_source_audio_ends_two_samples_short() {
    let (mut producer, mut renderer) =
        playback_channel(&PlaybackConfig::with_output_rate(48_000)).unwrap();

    let mut mock = MockSource::wire();
    mock.generate_tone(440.0, 0.5, 1_000);
    assert_eq!(mock.samples().len(), 24_000);
    let mut frames = mock.into_frames(4096).into_iter();

    let mut output = Vec::with_capacity(48_480);
    let mut quantum = [0.0f32; 480];
    let mut rendered = 0;
    let mut underruns = 0;

    for _ in 0..101 {
        if renderer.buffered() < 6_000 {
            if let Some(frame) = frames.next() {
                producer.push_frame(&frame);
            }
        }
        let report = renderer.render(&mut quantum);
        rendered += report.rendered;
        underruns += usize::from(report.underrun);
        output.extend_from_slice(&quantum);
    }

    // The last output position with two samples to interpolate is 23998.5
    assert_eq!(rendered, 47_998);
    assert_eq!(underruns, 1);
    assert!(output[47_998..].iter().all(|&s| s == 0.0));
    assert_eq!(renderer.state(), PlaybackState::Buffering);
}

#[test]
fn test_burst_trims_to_newest_audio() {
    let (mut producer, mut renderer) =
        playback_channel(&PlaybackConfig::with_output_rate(24_000)).unwrap();

    let burst: Vec<i16> = (0..24_000).map(|i| (i % 30_000) as i16).collect();
    producer.push_frame(&AudioFrame::new(burst.clone(), 24_000));

    let mut quantum = [0.0f32; 4];
    renderer.render(&mut quantum);

    // Only the newest 500ms survive
    assert_eq!(quantum[0], decode_sample(burst[12_000]));
    assert_eq!(renderer.buffered(), 12_000 - 4);
}

#[test]
fn test_playback_recovers_after_network_gap() {
    let (mut producer, mut renderer) =
        playback_channel(&PlaybackConfig::with_output_rate(48_000)).unwrap();
    let mut quantum = [0.0f32; 512];

    producer.push_samples(&[1000; 4_000]);
    renderer.render(&mut quantum);
    assert_eq!(renderer.state(), PlaybackState::Playing);

    // Gap: render until starved
    while renderer.state() == PlaybackState::Playing {
        renderer.render(&mut quantum);
    }
    renderer.render(&mut quantum);
    assert!(quantum.iter().all(|&s| s == 0.0));

    // Audio returns: silence until the threshold is met again
    producer.push_samples(&[1000; 2_000]);
    renderer.render(&mut quantum);
    assert_eq!(renderer.state(), PlaybackState::Buffering);
    producer.push_samples(&[1000; 2_000]);
    renderer.render(&mut quantum);
    assert_eq!(renderer.state(), PlaybackState::Playing);
}

#[tokio::test]
async fn test_session_capture_delivers_complete_frames() {
    let (tx, mut rx) = mpsc::channel::<AudioFrame>(16);
    let mut session = VoiceStream::builder()
        .add_sink(ChannelSink::new(tx))
        .start()
        .await
        .unwrap();

    let mut mic = session.take_capture_input().unwrap();
    let mut mock = MockSource::wire();
    mock.generate_noise(600, 0.3);
    let samples = mock.take_samples();
    assert_eq!(samples.len(), 14_400);

    // Host-sized callbacks
    for chunk in samples.chunks(480) {
        mic.push(chunk);
    }

    for expected in 0..3 {
        let frame = recv_frame(&mut rx).await;
        assert_eq!(frame.sequence, expected);
        assert_eq!(frame.len(), 4096);
        assert_eq!(frame.sample_rate, 24_000);
    }

    // The bridge counts a frame after handing it over
    tokio::time::timeout(RECV_TIMEOUT, async {
        while session.stats().frames_sent < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(session.stats().samples_captured, 14_400);

    session.stop().await.unwrap();

    // The 2112-sample tail is discarded, never sent as a short frame
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_session_converts_stereo_48k_input() {
    let config = StreamConfig {
        capture: CaptureConfig {
            input_sample_rate: 48_000,
            input_channels: 2,
            poll_interval: Duration::from_millis(5),
            ..CaptureConfig::default()
        },
        ..StreamConfig::default()
    };

    let (tx, mut rx) = mpsc::channel::<AudioFrame>(16);
    let mut session = VoiceStream::builder()
        .add_sink(ChannelSink::new(tx))
        .with_config(config)
        .start()
        .await
        .unwrap();

    let mut mic = session.take_capture_input().unwrap();
    let mut mock = MockSource::new(48_000, 2);
    mock.generate_tone(440.0, 0.5, 1_000);
    for chunk in mock.samples().chunks(960) {
        mic.push(chunk);
    }

    // One second at 24 kHz fills five 4096-sample frames
    let mut wire = Vec::new();
    for _ in 0..5 {
        let frame = recv_frame(&mut rx).await;
        wire.extend(frame.to_f32());
    }
    assert_eq!(wire.len(), 5 * 4096);

    // 20480 samples at 24 kHz is 0.853s of a 440 Hz tone
    let crossings = zero_crossings(&wire);
    assert!((747..=753).contains(&crossings), "got {crossings} crossings");

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_session_playback_and_events() {
    let (on_event, events) = recorder();
    let (tx, _rx) = mpsc::channel::<AudioFrame>(16);
    let mut session = VoiceStream::builder()
        .add_sink(ChannelSink::new(tx))
        .on_event(on_event)
        .start()
        .await
        .unwrap();

    let mut speaker = session.take_renderer().unwrap();
    let mut mock = MockSource::wire();
    mock.generate_tone(440.0, 0.5, 200);
    for frame in mock.into_frames(1200) {
        assert_eq!(session.play_frame(&frame), 1200);
    }

    let mut quantum = [0.0f32; 960];
    speaker.render_interleaved(&mut quantum, 2);
    assert_eq!(speaker.state(), PlaybackState::Playing);
    assert!(quantum.chunks(2).all(|f| f[0] == f[1]));

    let stats = session.stats();
    assert_eq!(stats.frames_received, 4);
    assert_eq!(stats.samples_received, 4_800);

    assert_eq!(
        events.lock().unwrap()[0],
        StreamEvent::PlaybackStarted { buffered: 4_800 }
    );

    session.reset_playback();
    speaker.render(&mut quantum);
    assert_eq!(speaker.state(), PlaybackState::Buffering);
    assert!(events.lock().unwrap().contains(&StreamEvent::PlaybackReset));

    // An interrupt followed straight away by the next response
    session.reset_playback();
    let next = AudioFrame::new(vec![1000; 4_800], 24_000);
    assert_eq!(session.play_frame(&next), 4_800);
    let report = speaker.render(&mut quantum);
    assert_eq!(speaker.state(), PlaybackState::Playing);
    assert_eq!(report.rendered, 960);

    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_session_retries_flaky_sink() {
    let sink = FlakySink::new(1);
    let (on_event, events) = recorder();
    let config = StreamConfig {
        sink_retry_delay: Duration::from_millis(1),
        ..StreamConfig::default()
    };

    let mut session = VoiceStream::builder()
        .add_sink(sink.clone())
        .with_config(config)
        .on_event(on_event)
        .start()
        .await
        .unwrap();

    let mut mic = session.take_capture_input().unwrap();
    mic.push(&vec![0.1; 4096]);

    tokio::time::timeout(RECV_TIMEOUT, async {
        while sink.delivered.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    session.stop().await.unwrap();

    assert_eq!(*sink.delivered.lock().unwrap(), vec![0]);
    assert!(events.lock().unwrap().iter().any(|e| matches!(
        e,
        StreamEvent::SinkError { sink_name, .. } if sink_name == "flaky"
    )));
}

#[tokio::test]
async fn test_dropped_session_releases_sinks() {
    let (tx, mut rx) = mpsc::channel::<AudioFrame>(4);
    let session = VoiceStream::builder()
        .add_sink(ChannelSink::new(tx))
        .start()
        .await
        .unwrap();

    drop(session);

    // The router exits and drops the sink's sender
    let closed = tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await.unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
#[ignore = "requires audio hardware"]
#[cfg(feature = "device")]
async fn test_loopback_on_default_devices() {
    use voice_stream::{InputDevice, OutputDevice};

    let input = InputDevice::open_default().unwrap();
    let output = OutputDevice::open_default().unwrap();
    let config = StreamConfig {
        capture: input.capture_config().unwrap(),
        playback: output.playback_config().unwrap(),
        ..StreamConfig::default()
    };

    let (tx, mut rx) = mpsc::channel::<AudioFrame>(32);
    let mut session = VoiceStream::builder()
        .add_sink(ChannelSink::new(tx))
        .with_config(config)
        .start()
        .await
        .unwrap();
    session.attach_input(&input).unwrap();
    session.attach_output(&output).unwrap();

    for _ in 0..10 {
        let frame = recv_frame(&mut rx).await;
        session.play_frame(&frame);
    }

    println!("Stats: {:?}", session.stats());
    session.stop().await.unwrap();
}
