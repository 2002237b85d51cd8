//! CPAL device wrappers for capture and playback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig as CpalStreamConfig, SupportedStreamConfig};

use crate::format::encode_sample;
use crate::pipeline::{CaptureInput, PlaybackRenderer};
use crate::{CaptureConfig, PlaybackConfig, StreamError};

fn backend(e: impl std::fmt::Display) -> StreamError {
    StreamError::BackendError(e.to_string())
}

fn unsupported(format: SampleFormat) -> StreamError {
    StreamError::UnsupportedFormat {
        format: format!("{format:?}"),
    }
}

fn find_device<I>(devices: I, name: &str) -> Result<Device, StreamError>
where
    I: Iterator<Item = Device>,
{
    devices
        .into_iter()
        .find(|device| device.name().is_ok_and(|n| n == name))
        .ok_or_else(|| StreamError::DeviceNotFound {
            name: name.to_string(),
        })
}

fn log_stream_error(err: cpal::StreamError) {
    tracing::error!(error = %err, "Audio stream error");
}

/// A microphone or other input device.
#[must_use]
pub struct InputDevice {
    device: Device,
}

impl InputDevice {
    /// Opens the default input device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultDevice` if no default input device is configured.
    pub fn open_default() -> Result<Self, StreamError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(StreamError::NoDefaultDevice { direction: "input" })?;
        Ok(Self { device })
    }

    /// Opens a specific input device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, StreamError> {
        let devices = cpal::default_host().input_devices().map_err(backend)?;
        Ok(Self {
            device: find_device(devices, name)?,
        })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    fn supported_config(&self) -> Result<SupportedStreamConfig, StreamError> {
        self.device.default_input_config().map_err(backend)
    }

    /// Returns the device's native capture format (sample rate, channels).
    pub fn native_config(&self) -> Result<(u32, u16), StreamError> {
        let config = self.supported_config()?;
        Ok((config.sample_rate().0, config.channels()))
    }

    /// A capture configuration matching this device's native format.
    pub fn capture_config(&self) -> Result<CaptureConfig, StreamError> {
        let (input_sample_rate, input_channels) = self.native_config()?;
        Ok(CaptureConfig {
            input_sample_rate,
            input_channels,
            ..CaptureConfig::default()
        })
    }

    /// Starts the device, pushing every callback into `input`.
    ///
    /// The returned stream must be kept alive for capture to continue.
    pub(crate) fn start_capture(&self, mut input: CaptureInput) -> Result<DeviceStream, StreamError> {
        let supported = self.supported_config()?;
        let sample_format = supported.sample_format();
        let config: CpalStreamConfig = supported.into();

        let stream = match sample_format {
            SampleFormat::F32 => self.device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    input.push(data);
                },
                log_stream_error,
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    input.push_i16(data);
                },
                log_stream_error,
                None,
            ),
            format => return Err(unsupported(format)),
        }
        .map_err(backend)?;

        stream.play().map_err(backend)?;

        tracing::info!(
            device = %self.name(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "Input stream started"
        );
        Ok(DeviceStream { _stream: stream })
    }
}

/// A speaker or other output device.
#[must_use]
pub struct OutputDevice {
    device: Device,
}

impl OutputDevice {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultDevice` if no default output device is configured.
    pub fn open_default() -> Result<Self, StreamError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(StreamError::NoDefaultDevice { direction: "output" })?;
        Ok(Self { device })
    }

    /// Opens a specific output device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, StreamError> {
        let devices = cpal::default_host().output_devices().map_err(backend)?;
        Ok(Self {
            device: find_device(devices, name)?,
        })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    fn supported_config(&self) -> Result<SupportedStreamConfig, StreamError> {
        self.device.default_output_config().map_err(backend)
    }

    /// Returns the device's native output format (sample rate, channels).
    pub fn native_config(&self) -> Result<(u32, u16), StreamError> {
        let config = self.supported_config()?;
        Ok((config.sample_rate().0, config.channels()))
    }

    /// A playback configuration rendering at this device's native rate.
    pub fn playback_config(&self) -> Result<PlaybackConfig, StreamError> {
        let (rate, _) = self.native_config()?;
        Ok(PlaybackConfig::with_output_rate(rate))
    }

    /// Starts the device, drawing every quantum from `renderer`.
    ///
    /// The mono signal is copied to every output channel.
    pub(crate) fn start_playback(
        &self,
        mut renderer: PlaybackRenderer,
    ) -> Result<DeviceStream, StreamError> {
        let supported = self.supported_config()?;
        let sample_format = supported.sample_format();
        let config: CpalStreamConfig = supported.into();
        let channels = config.channels;

        let stream = match sample_format {
            SampleFormat::F32 => self.device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    renderer.render_interleaved(data, channels);
                },
                log_stream_error,
                None,
            ),
            SampleFormat::I16 => {
                let mut scratch: Vec<f32> = Vec::new();
                self.device.build_output_stream(
                    &config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        // Grows once to the host's quantum, reused afterwards
                        if scratch.len() < data.len() {
                            scratch.resize(data.len(), 0.0);
                        }
                        let rendered = &mut scratch[..data.len()];
                        renderer.render_interleaved(rendered, channels);
                        for (out, &sample) in data.iter_mut().zip(rendered.iter()) {
                            *out = encode_sample(sample);
                        }
                    },
                    log_stream_error,
                    None,
                )
            }
            format => return Err(unsupported(format)),
        }
        .map_err(backend)?;

        stream.play().map_err(backend)?;

        tracing::info!(
            device = %self.name(),
            sample_rate = config.sample_rate.0,
            channels,
            "Output stream started"
        );
        Ok(DeviceStream { _stream: stream })
    }
}

/// A running device stream.
///
/// The host callback runs while this is held. Dropping it stops the stream.
pub struct DeviceStream {
    _stream: Stream,
}
