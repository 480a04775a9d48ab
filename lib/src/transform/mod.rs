//! Time and pitch modification
//!
//! Both transforms validate their parameter before touching the input and
//! return a freshly allocated buffer; the input is never modified.

mod resample;
mod shift;
mod stretch;

pub use resample::resample_to_length;
pub use shift::{pitch_shift, validate_semitones};
pub use stretch::{phase_vocoder, stretched_length, time_stretch, validate_speed_factor};

use crate::buffer::SampleBuffer;
use crate::Result;

/// Apply a per-channel transform to every channel of a buffer
pub(crate) fn map_channels<F>(buffer: &SampleBuffer, mut transform: F) -> Result<SampleBuffer>
where
    F: FnMut(usize, &[f64]) -> Result<Vec<f64>>,
{
    let channels = buffer.to_channels();
    let mut processed = Vec::with_capacity(channels.len());

    for (channel_idx, channel) in channels.iter().enumerate() {
        log::debug!(
            "Processing channel {}/{} ({} samples)",
            channel_idx + 1,
            channels.len(),
            channel.len()
        );
        processed.push(transform(channel_idx, channel)?);
    }

    SampleBuffer::from_channels(&processed, buffer.sample_rate())
}
