//! Phase vocoder time stretch

use super::map_channels;
use crate::buffer::SampleBuffer;
use crate::error::AudioError;
use crate::stft::{StftAnalyzer, StftConfig, StftFrame, StftSynthesizer};
use crate::Result;
use num_complex::Complex64;
use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// Longest output a time stretch may produce, in frames per channel
pub const MAX_STRETCHED_FRAMES: usize = 1 << 28;

/// Reject speed factors that are not strictly positive and finite
pub fn validate_speed_factor(rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(AudioError::invalid(format!(
            "speed factor must be a finite number greater than 0, got {}",
            rate
        )));
    }
    Ok(())
}

/// Output length for a signal of `len` samples played `rate` times faster
pub fn stretched_length(len: usize, rate: f64) -> usize {
    (len as f64 / rate).round() as usize
}

fn wrap_phase(phase: f64) -> f64 {
    phase - TWO_PI * (phase / TWO_PI).round()
}

/// Resample STFT frames in time by `rate`, keeping each bin's frequency.
///
/// Output frame `j` reads the input at fractional frame `j * rate`:
/// magnitudes are interpolated linearly and phases advance by the measured
/// instantaneous frequency of each bin.
pub fn phase_vocoder(frames: &[StftFrame], rate: f64, config: &StftConfig) -> Vec<StftFrame> {
    if frames.is_empty() {
        return Vec::new();
    }

    let num_frames = frames.len();
    let num_bins = frames[0].spectrum.len();
    let hop_size = config.hop_size;

    // Expected phase advance per hop for each bin
    let omega: Vec<f64> = (0..num_bins)
        .map(|k| TWO_PI * k as f64 * hop_size as f64 / config.window_size as f64)
        .collect();

    let silent = vec![Complex64::new(0.0, 0.0); num_bins];
    let mut phase_accum: Vec<f64> = frames[0].spectrum.iter().map(|c| c.arg()).collect();

    let num_steps = (num_frames as f64 / rate).ceil() as usize;
    let mut output = Vec::with_capacity(num_steps);

    for step in 0..num_steps {
        let t = step as f64 * rate;
        let index = t.floor() as usize;
        if index >= num_frames {
            break;
        }
        let alpha = t - index as f64;

        let current = &frames[index].spectrum;
        let next = frames
            .get(index + 1)
            .map(|f| f.spectrum.as_slice())
            .unwrap_or(&silent);

        let mut spectrum = Vec::with_capacity(num_bins);
        for k in 0..num_bins {
            let magnitude = (1.0 - alpha) * current[k].norm() + alpha * next[k].norm();
            spectrum.push(Complex64::from_polar(magnitude, phase_accum[k]));

            let deviation = wrap_phase(next[k].arg() - current[k].arg() - omega[k]);
            phase_accum[k] += omega[k] + deviation;
        }

        output.push(StftFrame {
            spectrum,
            frame_index: step,
            time_position: step * hop_size,
        });
    }

    output
}

/// Stretch one channel by `rate` and trim or pad it to `output_len` samples
pub(crate) fn stretch_channel(
    analyzer: &StftAnalyzer,
    synthesizer: &StftSynthesizer,
    signal: &[f64],
    rate: f64,
    output_len: usize,
) -> Result<Vec<f64>> {
    let frames = analyzer.analyze(signal)?;
    let stretched = phase_vocoder(&frames, rate, analyzer.config());
    synthesizer.synthesize(&stretched, Some(output_len))
}

/// Change playback speed by `rate` without changing pitch.
///
/// The output lasts `duration / rate`. Fails with `InvalidParameter` for
/// non-positive or non-finite rates, or rates so small the output would
/// exceed `MAX_STRETCHED_FRAMES`, before any processing happens.
pub fn time_stretch(buffer: &SampleBuffer, rate: f64, config: &StftConfig) -> Result<SampleBuffer> {
    validate_speed_factor(rate)?;
    config.check_length(buffer.frames())?;

    let projected = buffer.frames() as f64 / rate;
    if projected > MAX_STRETCHED_FRAMES as f64 {
        return Err(AudioError::invalid(format!(
            "speed factor {} would produce {:.0} frames, limit is {}",
            rate, projected, MAX_STRETCHED_FRAMES
        )));
    }
    let output_len = stretched_length(buffer.frames(), rate);

    log::info!(
        "Time stretching {} frames x {} channels by factor {}",
        buffer.frames(),
        buffer.channels(),
        rate
    );

    let analyzer = StftAnalyzer::new(*config);
    let synthesizer = StftSynthesizer::new(*config);

    map_channels(buffer, |_, channel| {
        stretch_channel(&analyzer, &synthesizer, channel, rate, output_len)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::analyze_pitch_with_config;

    const SAMPLE_RATE: u32 = 22050;

    fn tone(frequency: f64, seconds: f64) -> SampleBuffer {
        let samples = (SAMPLE_RATE as f64 * seconds) as usize;
        let data = (0..samples)
            .map(|i| 0.5 * (2.0 * PI * frequency * i as f64 / SAMPLE_RATE as f64).sin())
            .collect();
        SampleBuffer::mono(data, SAMPLE_RATE).unwrap()
    }

    #[test]
    fn test_wrap_phase() {
        assert!((wrap_phase(3.0 * PI) - PI).abs() < 1e-12 || (wrap_phase(3.0 * PI) + PI).abs() < 1e-12);
        assert!((wrap_phase(0.5) - 0.5).abs() < 1e-12);
        assert!((wrap_phase(-TWO_PI - 0.25) + 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_rates() {
        let buffer = tone(440.0, 0.5);
        let original = buffer.clone();
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = time_stretch(&buffer, rate, &StftConfig::default());
            assert!(matches!(result, Err(AudioError::InvalidParameter(_))), "rate {}", rate);
        }
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_identity_rate() {
        let buffer = tone(440.0, 1.0);
        let output = time_stretch(&buffer, 1.0, &StftConfig::default()).unwrap();

        assert_eq!(output.frames(), buffer.frames());
        let max_error = buffer
            .samples()
            .iter()
            .zip(output.samples())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        assert!(max_error < 1e-6, "identity stretch error {}", max_error);
    }

    #[test]
    fn test_duration_scales() {
        let buffer = tone(440.0, 1.0);
        for rate in [0.5, 1.0, 2.0] {
            let output = time_stretch(&buffer, rate, &StftConfig::default()).unwrap();
            let expected = buffer.duration_seconds() / rate;
            assert!(
                (output.duration_seconds() - expected).abs() <= expected * 0.01,
                "rate {}: {}s vs {}s",
                rate,
                output.duration_seconds(),
                expected
            );
        }
    }

    #[test]
    fn test_pitch_is_preserved() {
        let config = StftConfig::default();
        let bin_width = SAMPLE_RATE as f64 / config.window_size as f64;
        let buffer = tone(440.0, 1.0);

        for rate in [0.5, 2.0] {
            let output = time_stretch(&buffer, rate, &config).unwrap();
            let pitch = analyze_pitch_with_config(&output, &config).unwrap();
            assert!(
                (pitch.frequency - 440.0).abs() <= bin_width,
                "rate {} moved pitch to {}",
                rate,
                pitch.frequency
            );
        }
    }

    #[test]
    fn test_stereo_channels_stay_separate() {
        let left = tone(440.0, 0.5).into_samples();
        let right = vec![0.0; left.len()];
        let buffer = SampleBuffer::from_channels(&[left, right], SAMPLE_RATE).unwrap();

        let output = time_stretch(&buffer, 2.0, &StftConfig::default()).unwrap();
        assert_eq!(output.channels(), 2);
        assert!(output.channel(1).unwrap().iter().all(|&s| s == 0.0));
        assert!(output.channel(0).unwrap().iter().any(|&s| s.abs() > 0.1));
    }

    #[test]
    fn test_extreme_slowdown_rejected() {
        let buffer = tone(440.0, 0.5);
        let result = time_stretch(&buffer, 1e-12, &StftConfig::default());
        assert!(matches!(result, Err(AudioError::InvalidParameter(_))));
    }

    #[test]
    fn test_short_buffer_fails() {
        let buffer = SampleBuffer::mono(vec![0.0; 1000], SAMPLE_RATE).unwrap();
        assert!(matches!(
            time_stretch(&buffer, 1.5, &StftConfig::default()),
            Err(AudioError::InsufficientSamples { .. })
        ));
    }
}
