//! Dominant frequency estimation
//!
//! The dominant frequency is the center of the STFT bin holding the most
//! energy summed over the whole signal.

use std::fmt;

use crate::buffer::SampleBuffer;
use crate::error::AudioError;
use crate::note::Note;
use crate::spectrogram::Spectrogram;
use crate::stft::StftConfig;
use crate::Result;

/// Dominant frequency plus its nearest note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchResult {
    /// Dominant frequency in Hz (>= 0)
    pub frequency: f64,
    /// Nearest note, or `None` when the frequency is not positive
    pub note: Option<Note>,
}

impl PitchResult {
    pub fn from_frequency(frequency: f64) -> Self {
        Self {
            frequency,
            note: Note::from_frequency(frequency),
        }
    }

    /// Note name such as `A4`, or `N/A`
    pub fn note_label(&self) -> String {
        match self.note {
            Some(note) => note.to_string(),
            None => "N/A".to_string(),
        }
    }
}

impl fmt::Display for PitchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} Hz ({})", self.frequency, self.note_label())
    }
}

/// Index of the largest value; the first one wins on ties
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Frequency of the highest-energy bin of a spectrogram
pub fn dominant_frequency(spectrogram: &Spectrogram) -> Result<f64> {
    let energy = spectrogram.bin_energy();
    if energy.iter().any(|e| !e.is_finite()) {
        return Err(AudioError::NonFiniteResult("spectral energy"));
    }

    let dominant_idx = argmax(&energy).ok_or(AudioError::InsufficientSamples {
        required: spectrogram.window_size,
        available: 0,
    })?;
    let frequency = spectrogram.frequency_axis()[dominant_idx];

    log::debug!(
        "Dominant bin {} of {} ({:.2} Hz)",
        dominant_idx,
        spectrogram.num_bins,
        frequency
    );

    Ok(frequency)
}

/// Estimate the dominant pitch of a buffer
pub fn analyze_pitch_with_config(buffer: &SampleBuffer, config: &StftConfig) -> Result<PitchResult> {
    let spectrogram = Spectrogram::compute(buffer, config)?;
    let frequency = dominant_frequency(&spectrogram)?;
    if !frequency.is_finite() || frequency < 0.0 {
        return Err(AudioError::NonFiniteResult("dominant frequency"));
    }

    let result = PitchResult::from_frequency(frequency);
    log::info!("Dominant frequency: {}", result);
    Ok(result)
}
