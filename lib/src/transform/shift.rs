//! Pitch shift: resampling combined with a phase vocoder time stretch

use super::map_channels;
use super::resample::resample_to_length;
use super::stretch::{stretch_channel, stretched_length};
use crate::buffer::SampleBuffer;
use crate::error::AudioError;
use crate::stft::{StftAnalyzer, StftConfig, StftSynthesizer};
use crate::Result;

/// Reject semitone counts that are NaN or infinite
pub fn validate_semitones(semitones: f64) -> Result<()> {
    if !semitones.is_finite() {
        return Err(AudioError::invalid(format!(
            "semitone shift must be finite, got {}",
            semitones
        )));
    }
    Ok(())
}

/// Shift all frequencies by `2^(semitones / 12)` keeping the duration.
///
/// Resampling by the pitch ratio moves every partial by that ratio and the
/// phase vocoder restores the original duration. The shorter of the two
/// intermediate signals is always produced first: upward shifts resample
/// then stretch, downward shifts stretch then resample. No intermediate is
/// longer than the input. Zero semitones returns an unprocessed copy.
pub fn pitch_shift(buffer: &SampleBuffer, semitones: f64, config: &StftConfig) -> Result<SampleBuffer> {
    validate_semitones(semitones)?;

    if semitones == 0.0 {
        log::debug!("Pitch shift of 0 semitones, returning a copy");
        return Ok(buffer.clone());
    }

    config.check_length(buffer.frames())?;

    let ratio = 2f64.powf(semitones / 12.0);
    log::info!(
        "Pitch shifting {} frames x {} channels by {} semitones (ratio {:.5})",
        buffer.frames(),
        buffer.channels(),
        semitones,
        ratio
    );

    let analyzer = StftAnalyzer::new(*config);
    let synthesizer = StftSynthesizer::new(*config);

    map_channels(buffer, |_, channel| {
        let len = channel.len();
        if ratio > 1.0 {
            // Raise the pitch by playing fewer samples, then slow back down
            let raised = resample_to_length(channel, stretched_length(len, ratio))?;
            stretch_channel(&analyzer, &synthesizer, &raised, 1.0 / ratio, len)
        } else {
            let rate = 1.0 / ratio;
            let stretched =
                stretch_channel(&analyzer, &synthesizer, channel, rate, stretched_length(len, rate))?;
            resample_to_length(&stretched, len)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::analyze_pitch_with_config;
    use std::f64::consts::PI;

    const SAMPLE_RATE: u32 = 22050;

    fn tone(frequency: f64, seconds: f64) -> SampleBuffer {
        let samples = (SAMPLE_RATE as f64 * seconds) as usize;
        let data = (0..samples)
            .map(|i| 0.5 * (2.0 * PI * frequency * i as f64 / SAMPLE_RATE as f64).sin())
            .collect();
        SampleBuffer::mono(data, SAMPLE_RATE).unwrap()
    }

    #[test]
    fn test_zero_is_identity() {
        let buffer = tone(440.0, 0.5);
        let output = pitch_shift(&buffer, 0.0, &StftConfig::default()).unwrap();
        assert_eq!(output, buffer);
    }

    #[test]
    fn test_non_finite_rejected() {
        let buffer = tone(440.0, 0.5);
        for semitones in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                pitch_shift(&buffer, semitones, &StftConfig::default()),
                Err(AudioError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_octave_shifts() {
        let config = StftConfig::default();
        let bin_width = SAMPLE_RATE as f64 / config.window_size as f64;
        let buffer = tone(440.0, 1.0);

        for (semitones, expected, label) in [(12.0, 880.0, "A5"), (-12.0, 220.0, "A3")] {
            let output = pitch_shift(&buffer, semitones, &config).unwrap();
            assert_eq!(output.frames(), buffer.frames());

            let pitch = analyze_pitch_with_config(&output, &config).unwrap();
            assert!(
                (pitch.frequency - expected).abs() <= 2.0 * bin_width,
                "{} semitones: expected ~{} Hz, got {}",
                semitones,
                expected,
                pitch.frequency
            );
            assert_eq!(pitch.note_label(), label);
        }
    }

    /// Energy-weighted mean position of a signal, in samples
    fn energy_centroid(samples: &[f64]) -> f64 {
        let energy: f64 = samples.iter().map(|s| s * s).sum();
        samples
            .iter()
            .enumerate()
            .map(|(i, s)| i as f64 * s * s)
            .sum::<f64>()
            / energy
    }

    #[test]
    fn test_burst_stays_in_place() {
        // 0.3 s Hann-shaped 440 Hz burst centred one second into two seconds
        let center = SAMPLE_RATE as usize;
        let half = (0.15 * SAMPLE_RATE as f64) as usize;
        let mut data = vec![0.0; 2 * SAMPLE_RATE as usize];
        for i in center - half..center + half {
            let t = (i + half - center) as f64 / (2 * half) as f64;
            let envelope = 0.5 - 0.5 * (2.0 * PI * t).cos();
            data[i] = envelope * (2.0 * PI * 440.0 * i as f64 / SAMPLE_RATE as f64).sin();
        }
        let buffer = SampleBuffer::mono(data, SAMPLE_RATE).unwrap();
        let before = energy_centroid(buffer.samples());

        // 10 ms
        let tolerance = 0.01 * SAMPLE_RATE as f64;
        for semitones in [12.0, 5.0, -7.0, -12.0] {
            let output = pitch_shift(&buffer, semitones, &StftConfig::default()).unwrap();
            let after = energy_centroid(output.samples());
            assert!(
                (after - before).abs() <= tolerance,
                "{} semitones moved the burst from {:.1} to {:.1}",
                semitones,
                before,
                after
            );
        }
    }

    #[test]
    fn test_huge_shifts_do_not_blow_up() {
        let buffer = tone(440.0, 0.5);
        let config = StftConfig::default();

        assert!(matches!(
            pitch_shift(&buffer, 200.0, &config),
            Err(AudioError::InsufficientSamples { .. })
        ));

        let output = pitch_shift(&buffer, -200.0, &config).unwrap();
        assert_eq!(output.frames(), buffer.frames());
    }

    #[test]
    fn test_fractional_shift_keeps_duration() {
        let buffer = tone(330.0, 0.75);
        let output = pitch_shift(&buffer, 2.5, &StftConfig::default()).unwrap();
        assert_eq!(output.frames(), buffer.frames());
        assert_eq!(output.sample_rate(), buffer.sample_rate());
        assert!(output.samples().iter().all(|s| s.is_finite()));
    }
}
