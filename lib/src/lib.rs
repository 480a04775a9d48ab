//! Tessitura Library
//!
//! Pitch, key and tempo analysis of audio buffers plus phase vocoder time
//! stretching and pitch shifting. All analysis runs on Short-Time Fourier
//! Transform (STFT) frames; transforms return new buffers and never modify
//! their input.

pub mod audio_io;
pub mod buffer;
pub mod capture;
pub mod error;
pub mod key;
pub mod note;
pub mod pitch;
pub mod processor;
pub mod spectrogram;
pub mod stft;
pub mod tempo;
pub mod transform;
pub mod utils;
pub mod window;

pub use buffer::SampleBuffer;
pub use error::AudioError;
pub use note::{Note, PitchClass};
pub use num_complex::Complex64;
pub use pitch::PitchResult;
pub use processor::AudioProcessor;
pub use stft::StftConfig;
pub use tempo::{TempoConfig, TempoResult};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
///
/// Installs `env_logger` as the `log` backend when the `env_logger` feature
/// is enabled. Calling it more than once is harmless.
pub fn init() {
    #[cfg(feature = "env_logger")]
    {
        let _ = env_logger::try_init();
    }
}

/// Result type for audio processing operations
pub type Result<T> = std::result::Result<T, AudioError>;

/// Dominant frequency and note of a buffer using the default configuration
pub fn analyze_pitch(buffer: &SampleBuffer) -> Result<PitchResult> {
    AudioProcessor::default().analyze_pitch(buffer)
}

/// Dominant pitch class of a buffer using the default configuration
pub fn analyze_key(buffer: &SampleBuffer) -> Result<PitchClass> {
    AudioProcessor::default().analyze_key(buffer)
}

/// Tempo and beats of a buffer using the default configuration
pub fn analyze_tempo(buffer: &SampleBuffer) -> Result<TempoResult> {
    AudioProcessor::default().analyze_tempo(buffer)
}

/// Time stretch by `rate` using the default configuration
pub fn change_speed(buffer: &SampleBuffer, rate: f64) -> Result<SampleBuffer> {
    AudioProcessor::default().change_speed(buffer, rate)
}

/// Pitch shift by `semitones` using the default configuration
pub fn change_pitch(buffer: &SampleBuffer, semitones: f64) -> Result<SampleBuffer> {
    AudioProcessor::default().change_pitch(buffer, semitones)
}
