//! Local echo example.
//!
//! Captures the default microphone, sends each outbound frame straight back
//! into the playback pipeline and plays it on the default speakers. This is
//! the same path a network peer's audio would take, minus the network.
//!
//! Run with: cargo run --example echo --features device

use std::time::Duration;

use tokio::sync::mpsc;
use voice_stream::{
    AudioFrame, ChannelSink, InputDevice, OutputDevice, StreamConfig, StreamEvent, VoiceStream,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_stream=info".into()),
        )
        .init();

    let input = InputDevice::open_default()?;
    let output = OutputDevice::open_default()?;
    println!("Input:  {} {:?}", input.name(), input.native_config()?);
    println!("Output: {} {:?}", output.name(), output.native_config()?);

    let config = StreamConfig {
        capture: input.capture_config()?,
        playback: output.playback_config()?,
        ..StreamConfig::default()
    };

    let (tx, mut outbound) = mpsc::channel::<AudioFrame>(32);
    let mut session = VoiceStream::builder()
        .add_sink(ChannelSink::new(tx))
        .with_config(config)
        .on_event(|event| match event {
            StreamEvent::PlaybackStarted { .. } | StreamEvent::PlaybackReset => {}
            other => eprintln!("event: {other:?}"),
        })
        .start()
        .await?;

    session.attach_input(&input)?;
    session.attach_output(&output)?;

    println!("Echoing for 10 seconds, speak into the microphone...");
    let deadline = tokio::time::sleep(Duration::from_secs(10));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            Some(frame) = outbound.recv() => {
                session.play_frame(&frame);
            }
            () = &mut deadline => break,
        }
    }

    println!("Stats: {:?}", session.stats());
    session.stop().await?;
    Ok(())
}
