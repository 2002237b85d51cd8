//! Audio format conversion utilities.
//!
//! This module provides utilities for converting between audio formats:
//! - Sample codec (i16 ↔ normalized f32)
//! - Channel conversion (downmix to mono, fan-out to N channels)
//! - Streaming sample rate conversion (linear interpolation)

mod convert;
mod resample;

pub use convert::{
    decode_into, decode_sample, decode_slice, downmix, downmix_into, encode_sample, encode_slice,
    fan_out, stereo_to_mono,
};
pub use resample::{ConversionRatio, RateConverter};
