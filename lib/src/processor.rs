//! Configuration-carrying processor
//!
//! `AudioProcessor` holds the STFT and tempo settings and exposes the five
//! library operations. It keeps no audio of its own: every call takes the
//! buffer it works on and returns a fresh result, so one processor can be
//! shared between threads.

use crate::buffer::SampleBuffer;
use crate::key::analyze_key_with_config;
use crate::note::PitchClass;
use crate::pitch::{analyze_pitch_with_config, PitchResult};
use crate::stft::StftConfig;
use crate::tempo::{analyze_tempo_with_config, TempoConfig, TempoResult};
use crate::transform::{pitch_shift, time_stretch};
use crate::window::WindowType;
use crate::Result;

/// Analysis and transform front end
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioProcessor {
    stft: StftConfig,
    tempo: TempoConfig,
}

impl AudioProcessor {
    /// Create a processor with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a processor with custom configuration
    pub fn with_config(stft: StftConfig, tempo: TempoConfig) -> Self {
        Self { stft, tempo }
    }

    pub fn config(&self) -> &StftConfig {
        &self.stft
    }

    pub fn tempo_config(&self) -> &TempoConfig {
        &self.tempo
    }

    pub fn set_config(&mut self, config: StftConfig) {
        log::debug!(
            "STFT config set to window {} hop {} ({})",
            config.window_size,
            config.hop_size,
            config.window_type
        );
        self.stft = config;
    }

    pub fn set_tempo_config(&mut self, config: TempoConfig) {
        self.tempo = config;
    }

    /// Change the window size, keeping hop size and window type.
    ///
    /// The hop is clamped to the new window so shrinking the window below
    /// the current hop still yields a valid configuration.
    pub fn set_window_size(&mut self, window_size: usize) -> Result<()> {
        let hop_size = self.stft.hop_size.min(window_size.max(1));
        let config = StftConfig::new(window_size, hop_size, self.stft.window_type)?;
        self.set_config(config);
        Ok(())
    }

    pub fn set_hop_size(&mut self, hop_size: usize) -> Result<()> {
        let config = StftConfig::new(self.stft.window_size, hop_size, self.stft.window_type)?;
        self.set_config(config);
        Ok(())
    }

    pub fn set_window_type(&mut self, window_type: WindowType) -> Result<()> {
        let config = StftConfig::new(self.stft.window_size, self.stft.hop_size, window_type)?;
        self.set_config(config);
        Ok(())
    }

    /// Dominant frequency and its note
    pub fn analyze_pitch(&self, buffer: &SampleBuffer) -> Result<PitchResult> {
        analyze_pitch_with_config(buffer, &self.stft)
    }

    /// Dominant pitch class over the whole buffer
    pub fn analyze_key(&self, buffer: &SampleBuffer) -> Result<PitchClass> {
        analyze_key_with_config(buffer, &self.stft)
    }

    /// Tempo in BPM and beat positions
    pub fn analyze_tempo(&self, buffer: &SampleBuffer) -> Result<TempoResult> {
        analyze_tempo_with_config(buffer, &self.stft, &self.tempo)
    }

    /// Play `rate` times faster without changing pitch
    pub fn change_speed(&self, buffer: &SampleBuffer, rate: f64) -> Result<SampleBuffer> {
        time_stretch(buffer, rate, &self.stft)
    }

    /// Transpose by `semitones` without changing duration
    pub fn change_pitch(&self, buffer: &SampleBuffer, semitones: f64) -> Result<SampleBuffer> {
        pitch_shift(buffer, semitones, &self.stft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use std::f64::consts::PI;

    fn tone(frequency: f64, sample_rate: u32, seconds: f64) -> SampleBuffer {
        let samples = (sample_rate as f64 * seconds) as usize;
        let data = (0..samples)
            .map(|i| 0.5 * (2.0 * PI * frequency * i as f64 / sample_rate as f64).sin())
            .collect();
        SampleBuffer::mono(data, sample_rate).unwrap()
    }

    #[test]
    fn test_default_config() {
        let processor = AudioProcessor::new();
        assert_eq!(processor.config().window_size, 2048);
        assert_eq!(processor.config().hop_size, 512);
        assert_eq!(processor.tempo_config().start_bpm, 120.0);
    }

    #[test]
    fn test_setters_validate() {
        let mut processor = AudioProcessor::new();

        processor.set_window_size(1024).unwrap();
        assert_eq!(processor.config().window_size, 1024);
        assert_eq!(processor.config().hop_size, 512);

        processor.set_window_size(256).unwrap();
        assert_eq!(processor.config().hop_size, 256);

        assert!(matches!(
            processor.set_window_size(1000),
            Err(AudioError::InvalidParameter(_))
        ));
        assert!(matches!(
            processor.set_hop_size(0),
            Err(AudioError::InvalidParameter(_))
        ));
        assert_eq!(processor.config().window_size, 256);

        processor.set_hop_size(64).unwrap();
        processor.set_window_type(WindowType::Hamming).unwrap();
        assert_eq!(processor.config().hop_size, 64);
        assert_eq!(processor.config().window_type, WindowType::Hamming);
    }

    #[test]
    fn test_window_size_changes_resolution() {
        let buffer = tone(440.0, 22050, 1.0);
        let mut processor = AudioProcessor::new();
        processor.set_window_size(4096).unwrap();

        let pitch = processor.analyze_pitch(&buffer).unwrap();
        let bin_width = 22050.0 / 4096.0;
        assert!((pitch.frequency - 440.0).abs() <= bin_width);
    }

    #[test]
    fn test_operations_share_config() {
        let buffer = tone(440.0, 22050, 1.0);
        let processor = AudioProcessor::new();

        assert_eq!(processor.analyze_key(&buffer).unwrap(), PitchClass::A);
        assert_eq!(processor.analyze_pitch(&buffer).unwrap().note_label(), "A4");

        let faster = processor.change_speed(&buffer, 2.0).unwrap();
        assert_eq!(faster.frames(), buffer.frames() / 2);

        let higher = processor.change_pitch(&buffer, 12.0).unwrap();
        assert_eq!(higher.frames(), buffer.frames());
        assert_eq!(processor.analyze_pitch(&higher).unwrap().note_label(), "A5");
    }

    #[test]
    fn test_processor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AudioProcessor>();
        assert_send_sync::<SampleBuffer>();
    }
}
