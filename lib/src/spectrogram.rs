//! Magnitude spectrogram shared by the pitch, key and tempo estimators

use crate::buffer::SampleBuffer;
use crate::error::AudioError;
use crate::stft::{StftAnalyzer, StftConfig, StftFrame};
use crate::Result;

/// Magnitude spectrogram of a mono-folded signal
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// Magnitude data (time x frequency)
    pub magnitudes: Vec<Vec<f64>>,
    /// Number of time frames
    pub num_frames: usize,
    /// Number of frequency bins
    pub num_bins: usize,
    /// Sample rate of the analyzed signal
    pub sample_rate: u32,
    /// FFT window size the spectrogram was computed with
    pub window_size: usize,
    /// Hop size between frames
    pub hop_size: usize,
}

impl Spectrogram {
    /// Compute |STFT| of the buffer, folding stereo to mono first
    pub fn compute(buffer: &SampleBuffer, config: &StftConfig) -> Result<Self> {
        let mono = buffer.to_mono();
        let analyzer = StftAnalyzer::new(*config);
        let frames = analyzer.analyze(&mono)?;
        Self::from_stft_frames(&frames, buffer.sample_rate(), config)
    }

    /// Create a spectrogram from STFT frames
    pub fn from_stft_frames(
        frames: &[StftFrame],
        sample_rate: u32,
        config: &StftConfig,
    ) -> Result<Self> {
        if frames.is_empty() {
            return Err(AudioError::InsufficientSamples {
                required: config.window_size,
                available: 0,
            });
        }

        let num_frames = frames.len();
        let num_bins = frames[0].spectrum.len();

        let mut magnitudes = Vec::with_capacity(num_frames);
        for (i, frame) in frames.iter().enumerate() {
            if frame.spectrum.len() != num_bins {
                return Err(AudioError::Fft(format!(
                    "frame {} has {} bins, expected {}",
                    i,
                    frame.spectrum.len(),
                    num_bins
                )));
            }
            magnitudes.push(frame.spectrum.iter().map(|c| c.norm()).collect());
        }

        Ok(Self {
            magnitudes,
            num_frames,
            num_bins,
            sample_rate,
            window_size: config.window_size,
            hop_size: config.hop_size,
        })
    }

    /// Magnitude at a (frequency bin, time frame) position
    pub fn magnitude(&self, bin: usize, frame: usize) -> f64 {
        self.magnitudes[frame][bin]
    }

    /// Center frequency of every bin in Hz: `i * sample_rate / window_size`
    pub fn frequency_axis(&self) -> Vec<f64> {
        (0..self.num_bins)
            .map(|i| i as f64 * self.sample_rate as f64 / self.window_size as f64)
            .collect()
    }

    /// Time of every frame in seconds
    pub fn time_axis(&self) -> Vec<f64> {
        (0..self.num_frames)
            .map(|i| frame_to_seconds(i, self.hop_size, self.sample_rate))
            .collect()
    }

    /// Summed squared magnitude of each bin across all frames
    pub fn bin_energy(&self) -> Vec<f64> {
        let mut energy = vec![0.0; self.num_bins];
        for frame in &self.magnitudes {
            for (e, &mag) in energy.iter_mut().zip(frame) {
                *e += mag * mag;
            }
        }
        energy
    }

    /// Convert magnitude to decibels relative to `reference`, floored at `-top_db`
    pub fn to_db(&self, reference: f64, top_db: f64) -> Vec<Vec<f64>> {
        let amin = 1e-10;
        let ref_db = 20.0 * reference.max(amin).log10();

        self.magnitudes
            .iter()
            .map(|frame| {
                frame
                    .iter()
                    .map(|&mag| (20.0 * mag.max(amin).log10() - ref_db).max(-top_db))
                    .collect()
            })
            .collect()
    }

    /// Largest magnitude in the spectrogram
    pub fn max_magnitude(&self) -> f64 {
        self.magnitudes
            .iter()
            .flat_map(|frame| frame.iter())
            .fold(0.0, |acc, &m| acc.max(m))
    }
}

/// Convert a frame index to seconds
pub fn frame_to_seconds(frame: usize, hop_size: usize, sample_rate: u32) -> f64 {
    (frame * hop_size) as f64 / sample_rate as f64
}
