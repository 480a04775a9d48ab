//! Short-Time Fourier Transform (STFT) implementation
//!
//! Provides STFT analysis and synthesis using overlapping windows. Frames are
//! centered by default: the signal is reflect-padded by half a window on each
//! side so frame `k` is centered on sample `k * hop_size`.

use crate::error::AudioError;
use crate::window::{generate_window, WindowType};
use crate::Result;
use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// STFT configuration parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StftConfig {
    /// Window size (FFT size), must be power of 2
    pub window_size: usize,
    /// Step between successive frames in samples
    pub hop_size: usize,
    /// Window function type
    pub window_type: WindowType,
    /// Reflect-pad the signal so frames are centered on `k * hop_size`
    pub center: bool,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            window_size: 2048,
            hop_size: 512,
            window_type: WindowType::Hann,
            center: true,
        }
    }
}

impl StftConfig {
    /// Create a new STFT configuration with validation
    pub fn new(window_size: usize, hop_size: usize, window_type: WindowType) -> Result<Self> {
        if !window_size.is_power_of_two() || !(16..=65536).contains(&window_size) {
            return Err(AudioError::invalid(format!(
                "window size must be a power of 2 between 16 and 65536, got {}",
                window_size
            )));
        }

        if hop_size == 0 || hop_size > window_size {
            return Err(AudioError::invalid(format!(
                "hop size must be between 1 and the window size ({}), got {}",
                window_size, hop_size
            )));
        }

        Ok(Self {
            window_size,
            hop_size,
            window_type,
            center: true,
        })
    }

    /// Same configuration without frame centering
    pub fn uncentered(mut self) -> Self {
        self.center = false;
        self
    }

    /// Get the overlap percentage
    pub fn overlap_percent(&self) -> f64 {
        (1.0 - self.hop_size as f64 / self.window_size as f64) * 100.0
    }

    /// Get the number of FFT bins (complex values)
    pub fn fft_bins(&self) -> usize {
        self.window_size / 2 + 1
    }

    /// Number of frames produced for a signal of `signal_len` samples
    pub fn num_frames(&self, signal_len: usize) -> usize {
        if signal_len < self.window_size {
            0
        } else if self.center {
            1 + signal_len / self.hop_size
        } else {
            (signal_len - self.window_size) / self.hop_size + 1
        }
    }

    /// Fail with `InsufficientSamples` when the signal cannot fill one window
    pub fn check_length(&self, signal_len: usize) -> Result<()> {
        if signal_len < self.window_size {
            return Err(AudioError::InsufficientSamples {
                required: self.window_size,
                available: signal_len,
            });
        }
        Ok(())
    }
}

/// STFT frame containing frequency domain data
#[derive(Debug, Clone)]
pub struct StftFrame {
    /// Complex frequency domain data (`window_size / 2 + 1` bins)
    pub spectrum: Vec<Complex64>,
    /// Frame index in the analysis
    pub frame_index: usize,
    /// Sample the frame is anchored on: its center when centered, else its start
    pub time_position: usize,
}

/// STFT analyzer for forward transform
pub struct StftAnalyzer {
    config: StftConfig,
    window: Vec<f64>,
    fft: Arc<dyn RealToComplex<f64>>,
}

impl StftAnalyzer {
    /// Create a new STFT analyzer
    pub fn new(config: StftConfig) -> Self {
        let window = generate_window(config.window_type, config.window_size);

        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(config.window_size);

        Self {
            config,
            window,
            fft,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    /// Analyze audio data and return STFT frames
    pub fn analyze(&self, audio_data: &[f64]) -> Result<Vec<StftFrame>> {
        self.config.check_length(audio_data.len())?;

        let hop_size = self.config.hop_size;
        let window_size = self.config.window_size;

        let padded;
        let signal = if self.config.center {
            padded = reflect_pad(audio_data, window_size / 2);
            padded.as_slice()
        } else {
            audio_data
        };

        let num_frames = self.config.num_frames(audio_data.len());
        let mut frames = Vec::with_capacity(num_frames);
        let mut windowed = self.fft.make_input_vec();

        for frame_idx in 0..num_frames {
            let start_pos = frame_idx * hop_size;
            let segment = &signal[start_pos..start_pos + window_size];

            for ((dst, &sample), &w) in windowed.iter_mut().zip(segment).zip(&self.window) {
                *dst = sample * w;
            }

            let mut spectrum = self.fft.make_output_vec();
            self.fft
                .process(&mut windowed, &mut spectrum)
                .map_err(|e| AudioError::Fft(e.to_string()))?;

            frames.push(StftFrame {
                spectrum,
                frame_index: frame_idx,
                time_position: start_pos,
            });
        }

        log::debug!(
            "STFT: {} samples -> {} frames (window {}, hop {})",
            audio_data.len(),
            frames.len(),
            window_size,
            hop_size
        );

        Ok(frames)
    }
}

/// STFT synthesizer for inverse transform (weighted overlap-add)
pub struct StftSynthesizer {
    config: StftConfig,
    window: Vec<f64>,
    ifft: Arc<dyn ComplexToReal<f64>>,
}

impl StftSynthesizer {
    /// Create a new STFT synthesizer
    pub fn new(config: StftConfig) -> Self {
        let window = generate_window(config.window_type, config.window_size);

        let mut planner = RealFftPlanner::<f64>::new();
        let ifft = planner.plan_fft_inverse(config.window_size);

        Self {
            config,
            window,
            ifft,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    /// Synthesize audio from consecutive STFT frames.
    ///
    /// Frames are placed `hop_size` apart in slice order. With `length` set
    /// the output is truncated or zero-padded to exactly that many samples.
    pub fn synthesize(&self, frames: &[StftFrame], length: Option<usize>) -> Result<Vec<f64>> {
        if frames.is_empty() {
            return Ok(vec![0.0; length.unwrap_or(0)]);
        }

        let hop_size = self.config.hop_size;
        let window_size = self.config.window_size;
        let fft_bins = self.config.fft_bins();

        let output_length = (frames.len() - 1) * hop_size + window_size;
        let mut output = vec![0.0; output_length];
        let mut window_sum = vec![0.0; output_length];

        let mut time_data = self.ifft.make_output_vec();
        let scale = 1.0 / window_size as f64;

        for (position, frame) in frames.iter().enumerate() {
            if frame.spectrum.len() != fft_bins {
                return Err(AudioError::Fft(format!(
                    "frame {} has {} bins, expected {}",
                    frame.frame_index,
                    frame.spectrum.len(),
                    fft_bins
                )));
            }

            let mut spectrum = frame.spectrum.clone();
            // A real signal has purely real DC and Nyquist bins
            spectrum[0].im = 0.0;
            spectrum[fft_bins - 1].im = 0.0;

            self.ifft
                .process(&mut spectrum, &mut time_data)
                .map_err(|e| AudioError::Fft(e.to_string()))?;

            let start_pos = position * hop_size;
            for (i, &sample) in time_data.iter().enumerate() {
                let w = self.window[i];
                output[start_pos + i] += sample * scale * w;
                window_sum[start_pos + i] += w * w;
            }
        }

        for (sample, &sum) in output.iter_mut().zip(&window_sum) {
            if sum > 1e-10 {
                *sample /= sum;
            }
        }

        if self.config.center {
            output.drain(..window_size / 2);
            if length.is_none() {
                let keep = output.len().saturating_sub(window_size / 2);
                output.truncate(keep);
            }
        }

        if let Some(len) = length {
            output.resize(len, 0.0);
        }

        Ok(output)
    }
}

/// Mirror `pad` samples around each edge, excluding the edge sample itself
fn reflect_pad(signal: &[f64], pad: usize) -> Vec<f64> {
    let len = signal.len();
    let mut padded = Vec::with_capacity(len + 2 * pad);

    for i in (1..=pad).rev() {
        padded.push(signal[i.min(len - 1)]);
    }
    padded.extend_from_slice(signal);
    for i in 0..pad {
        padded.push(signal[len.saturating_sub(2 + i)]);
    }

    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(frequency: f64, sample_rate: f64, samples: usize) -> Vec<f64> {
        (0..samples)
            .map(|i| (2.0 * PI * frequency * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_stft_config() {
        let config = StftConfig::default();
        assert_eq!(config.window_size, 2048);
        assert_eq!(config.hop_size, 512);
        assert_eq!(config.fft_bins(), 1025);
        assert!((config.overlap_percent() - 75.0).abs() < 1e-10);
        assert_eq!(config.num_frames(22050), 1 + 22050 / 512);
        assert_eq!(config.uncentered().num_frames(4096), 5);
        assert_eq!(config.num_frames(100), 0);
    }

    #[test]
    fn test_stft_config_validation() {
        assert!(StftConfig::new(512, 128, WindowType::Hann).is_ok());
        assert!(StftConfig::new(500, 128, WindowType::Hann).is_err());
        assert!(StftConfig::new(512, 0, WindowType::Hann).is_err());
        assert!(StftConfig::new(512, 1024, WindowType::Hann).is_err());
    }

    #[test]
    fn test_reflect_pad() {
        let padded = reflect_pad(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(padded, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_short_signal_rejected() {
        let analyzer = StftAnalyzer::new(StftConfig::default());
        let result = analyzer.analyze(&[0.0; 1000]);
        assert!(matches!(
            result,
            Err(AudioError::InsufficientSamples {
                required: 2048,
                available: 1000
            })
        ));
    }

    #[test]
    fn test_stft_analysis_synthesis() {
        let config = StftConfig::default();
        let analyzer = StftAnalyzer::new(config);
        let synthesizer = StftSynthesizer::new(config);

        let test_signal = sine(440.0, 44100.0, 44100);

        let frames = analyzer.analyze(&test_signal).unwrap();
        assert_eq!(frames.len(), config.num_frames(test_signal.len()));
        assert_eq!(frames[3].time_position, 3 * config.hop_size);

        let reconstructed = synthesizer
            .synthesize(&frames, Some(test_signal.len()))
            .unwrap();
        assert_eq!(reconstructed.len(), test_signal.len());

        let max_error = test_signal
            .iter()
            .zip(&reconstructed)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(max_error < 1e-9, "Reconstruction error too large: {}", max_error);
    }

    #[test]
    fn test_uncentered_synthesis_length() {
        let config = StftConfig::new(256, 64, WindowType::Hann)
            .unwrap()
            .uncentered();
        let analyzer = StftAnalyzer::new(config);
        let synthesizer = StftSynthesizer::new(config);

        let signal = sine(1000.0, 8000.0, 1024);
        let frames = analyzer.analyze(&signal).unwrap();
        let output = synthesizer.synthesize(&frames, None).unwrap();
        assert_eq!(output.len(), (frames.len() - 1) * 64 + 256);
    }
}
