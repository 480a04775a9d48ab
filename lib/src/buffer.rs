//! Owned PCM sample buffer
//!
//! Samples are stored interleaved (`L R L R ...` for stereo) as `f64`
//! normalized to [-1.0, 1.0], together with the sample rate and channel count.

use crate::error::AudioError;
use crate::Result;

/// Maximum number of channels the analysis and transform code accepts
pub const MAX_CHANNELS: usize = 2;

/// Interleaved mono or stereo samples paired with their sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f64>,
    sample_rate: u32,
    channels: usize,
}

impl SampleBuffer {
    /// Create a buffer from interleaved samples
    pub fn new(samples: Vec<f64>, sample_rate: u32, channels: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AudioError::invalid("sample rate must be greater than 0"));
        }
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(AudioError::invalid(format!(
                "channel count must be 1 or 2, got {}",
                channels
            )));
        }
        if samples.len() % channels != 0 {
            return Err(AudioError::invalid(format!(
                "{} samples cannot be split evenly into {} channels",
                samples.len(),
                channels
            )));
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Create a mono buffer
    pub fn mono(samples: Vec<f64>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, sample_rate, 1)
    }

    /// Create a buffer from separate (planar) channels of equal length
    pub fn from_channels(channel_data: &[Vec<f64>], sample_rate: u32) -> Result<Self> {
        let channels = channel_data.len();
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(AudioError::invalid(format!(
                "channel count must be 1 or 2, got {}",
                channels
            )));
        }

        let frames = channel_data[0].len();
        for (i, channel) in channel_data.iter().enumerate() {
            if channel.len() != frames {
                return Err(AudioError::invalid(format!(
                    "channel {} has length {}, expected {}",
                    i,
                    channel.len(),
                    frames
                )));
            }
        }

        let mut samples = Vec::with_capacity(frames * channels);
        for frame in 0..frames {
            for channel in channel_data {
                samples.push(channel[frame]);
            }
        }

        Self::new(samples, sample_rate, channels)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Copy out one channel
    pub fn channel(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.channels {
            return None;
        }
        Some(
            self.samples
                .iter()
                .skip(index)
                .step_by(self.channels)
                .copied()
                .collect(),
        )
    }

    /// Split into planar channels
    pub fn to_channels(&self) -> Vec<Vec<f64>> {
        (0..self.channels)
            .filter_map(|c| self.channel(c))
            .collect()
    }

    /// Fold all channels into one by averaging
    pub fn to_mono(&self) -> Vec<f64> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        let scale = 1.0 / self.channels as f64;
        self.samples
            .chunks_exact(self.channels)
            .map(|frame| frame.iter().sum::<f64>() * scale)
            .collect()
    }

    /// Interleaved stereo copy for playback; mono is duplicated to both sides
    pub fn to_stereo(&self) -> SampleBuffer {
        let samples = if self.channels == 2 {
            self.samples.clone()
        } else {
            self.samples.iter().flat_map(|&s| [s, s]).collect()
        };
        SampleBuffer {
            samples,
            sample_rate: self.sample_rate,
            channels: 2,
        }
    }

    /// Peak absolute sample value
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0, |acc, &s| acc.max(s.abs()))
    }
}
