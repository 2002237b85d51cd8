//! Audio endpoints: CPAL device wrappers and a mock generator.
//!
//! Device support is behind the `device` feature so the pipelines build and
//! test on machines without an audio stack.

#[cfg(feature = "device")]
mod device;
mod mock;

#[cfg(feature = "device")]
pub use device::{DeviceStream, InputDevice, OutputDevice};
pub use mock::MockSource;

#[cfg(feature = "device")]
use cpal::traits::{DeviceTrait, HostTrait};

/// Lists all available input devices.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
#[cfg(feature = "device")]
pub fn list_input_devices() -> Result<Vec<String>, crate::StreamError> {
    let devices = cpal::default_host()
        .input_devices()
        .map_err(|e| crate::StreamError::BackendError(e.to_string()))?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Lists all available output devices.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
#[cfg(feature = "device")]
pub fn list_output_devices() -> Result<Vec<String>, crate::StreamError> {
    let devices = cpal::default_host()
        .output_devices()
        .map_err(|e| crate::StreamError::BackendError(e.to_string()))?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Gets the name of the default input device, if any.
#[cfg(feature = "device")]
pub fn default_input_device_name() -> Option<String> {
    cpal::default_host()
        .default_input_device()
        .and_then(|d| d.name().ok())
}

/// Gets the name of the default output device, if any.
#[cfg(feature = "device")]
pub fn default_output_device_name() -> Option<String> {
    cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}
