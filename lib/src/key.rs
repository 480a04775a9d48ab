//! Key estimation from a chromagram
//!
//! Spectrogram power is folded into 12 pitch-class bins, each frame is
//! normalized to its strongest pitch class, and the class with the highest
//! mean over all frames is reported.
//!
//! This reports the dominant pitch class of the material. It does not match
//! major/minor key profiles, so a piece in C major whose melody sits on G
//! will be labelled G.

use crate::buffer::SampleBuffer;
use crate::error::AudioError;
use crate::note::{frequency_to_midi, PitchClass};
use crate::pitch::argmax;
use crate::spectrogram::Spectrogram;
use crate::stft::StftConfig;
use crate::Result;

/// Lowest frequency folded into the chromagram (A0)
pub const CHROMA_MIN_FREQ: f64 = 27.5;

/// Per-frame pitch class energy
#[derive(Debug, Clone)]
pub struct Chromagram {
    /// One 12-element row per frame, normalized so each frame's maximum is 1
    pub frames: Vec<[f64; 12]>,
}

impl Chromagram {
    /// Fold a magnitude spectrogram into pitch classes
    pub fn from_spectrogram(spectrogram: &Spectrogram) -> Self {
        let mapping = pitch_class_mapping(spectrogram);

        let frames = spectrogram
            .magnitudes
            .iter()
            .map(|frame| {
                let mut chroma = [0.0f64; 12];
                for (&mag, class) in frame.iter().zip(&mapping) {
                    if let Some(pc) = class {
                        chroma[*pc] += mag * mag;
                    }
                }

                let peak = chroma.iter().fold(0.0f64, |acc, &c| acc.max(c));
                if peak > f64::MIN_POSITIVE {
                    for c in chroma.iter_mut() {
                        *c /= peak;
                    }
                }
                chroma
            })
            .collect();

        Self { frames }
    }

    /// Mean value of each pitch class over all frames
    pub fn mean(&self) -> [f64; 12] {
        let mut mean = [0.0f64; 12];
        if self.frames.is_empty() {
            return mean;
        }
        for frame in &self.frames {
            for (m, &c) in mean.iter_mut().zip(frame) {
                *m += c;
            }
        }
        let count = self.frames.len() as f64;
        for m in mean.iter_mut() {
            *m /= count;
        }
        mean
    }
}

/// Pitch class of each spectrogram bin, `None` outside [A0, Nyquist)
fn pitch_class_mapping(spectrogram: &Spectrogram) -> Vec<Option<usize>> {
    let nyquist = spectrogram.sample_rate as f64 / 2.0;
    spectrogram
        .frequency_axis()
        .into_iter()
        .map(|freq| {
            if freq < CHROMA_MIN_FREQ || freq >= nyquist {
                None
            } else {
                let midi = frequency_to_midi(freq).round() as i32;
                Some(midi.rem_euclid(12) as usize)
            }
        })
        .collect()
}

/// Pick the pitch class with the largest mean chroma; lowest index wins ties
pub fn key_from_chroma(chroma_mean: &[f64; 12]) -> Result<PitchClass> {
    if chroma_mean.iter().any(|c| !c.is_finite()) {
        return Err(AudioError::NonFiniteResult("chroma"));
    }
    let index = argmax(chroma_mean).unwrap_or(0);
    Ok(PitchClass::ALL[index])
}

/// Estimate the key label of a buffer
pub fn analyze_key_with_config(buffer: &SampleBuffer, config: &StftConfig) -> Result<PitchClass> {
    let spectrogram = Spectrogram::compute(buffer, config)?;
    let chroma = Chromagram::from_spectrogram(&spectrogram);
    let mean = chroma.mean();

    log::debug!(
        "Chroma means: {}",
        PitchClass::ALL
            .iter()
            .zip(&mean)
            .map(|(pc, m)| format!("{}={:.3}", pc, m))
            .collect::<Vec<_>>()
            .join(" ")
    );

    let key = key_from_chroma(&mean)?;
    log::info!("Estimated key: {}", key);
    Ok(key)
}
