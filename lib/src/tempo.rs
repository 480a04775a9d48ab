//! Tempo estimation and beat tracking
//!
//! Three deterministic stages:
//! 1. Onset strength: mean positive frame-to-frame rise of the dB spectrogram
//! 2. Tempo: autocorrelation of the onset envelope weighted by a log-normal
//!    prior around a preferred tempo
//! 3. Beats: dynamic programming over the onset envelope that rewards strong
//!    onsets and penalizes intervals that stray from the estimated period

use crate::buffer::SampleBuffer;
use crate::error::AudioError;
use crate::spectrogram::{frame_to_seconds, Spectrogram};
use crate::stft::StftConfig;
use crate::Result;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Onset envelopes whose peak is below this count as silence
const SILENCE_FLOOR: f64 = 1e-9;

/// Tempo estimator configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoConfig {
    /// Center of the tempo prior, also reported for silent input
    pub start_bpm: f64,
    /// Width of the tempo prior in octaves
    pub std_octaves: f64,
    /// Slowest tempo considered
    pub min_bpm: f64,
    /// Fastest tempo considered
    pub max_bpm: f64,
    /// How strongly the beat tracker sticks to the estimated period
    pub tightness: f64,
    /// Dynamic range of the dB spectrogram used for onset detection
    pub top_db: f64,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            start_bpm: 120.0,
            std_octaves: 1.0,
            min_bpm: 40.0,
            max_bpm: 240.0,
            tightness: 100.0,
            top_db: 80.0,
        }
    }
}

impl TempoConfig {
    /// Create a configuration with a custom tempo range
    pub fn new(start_bpm: f64, min_bpm: f64, max_bpm: f64) -> Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(start_bpm) || !valid(min_bpm) || !valid(max_bpm) {
            return Err(AudioError::invalid(
                "tempo bounds must be positive and finite",
            ));
        }
        if min_bpm >= max_bpm {
            return Err(AudioError::invalid(format!(
                "min_bpm ({}) must be below max_bpm ({})",
                min_bpm, max_bpm
            )));
        }
        if !(min_bpm..=max_bpm).contains(&start_bpm) {
            return Err(AudioError::invalid(format!(
                "start_bpm ({}) must lie within {}..={}",
                start_bpm, min_bpm, max_bpm
            )));
        }

        Ok(Self {
            start_bpm,
            min_bpm,
            max_bpm,
            ..Self::default()
        })
    }
}

/// Estimated tempo and beat positions
#[derive(Debug, Clone, PartialEq)]
pub struct TempoResult {
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Strictly increasing STFT frame indices of the beats
    pub beat_frames: Vec<usize>,
    /// Beat positions in seconds
    pub beat_times: Vec<f64>,
}

/// Onset strength per spectrogram frame
pub fn onset_strength(spectrogram: &Spectrogram, top_db: f64) -> Vec<f64> {
    let db = spectrogram.to_db(spectrogram.max_magnitude(), top_db);
    let mut onset = vec![0.0; db.len()];

    for t in 1..db.len() {
        let rise: f64 = db[t]
            .iter()
            .zip(&db[t - 1])
            .map(|(&cur, &prev)| (cur - prev).max(0.0))
            .sum();
        onset[t] = rise / spectrogram.num_bins as f64;
    }

    onset
}

/// Autocorrelation for lags `0..=max_lag`, computed through the FFT
pub fn autocorrelate(signal: &[f64], max_lag: usize) -> Vec<f64> {
    if signal.is_empty() {
        return vec![0.0; max_lag + 1];
    }

    let size = (2 * signal.len()).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(size);
    let ifft = planner.plan_fft_inverse(size);

    let mut buffer: Vec<Complex<f64>> = signal
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();

    fft.process(&mut buffer);
    for c in buffer.iter_mut() {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    ifft.process(&mut buffer);

    let scale = 1.0 / size as f64;
    (0..=max_lag)
        .map(|lag| {
            if lag < signal.len() {
                buffer[lag].re * scale
            } else {
                0.0
            }
        })
        .collect()
}

fn tempo_prior(bpm: f64, config: &TempoConfig) -> f64 {
    let z = (bpm.log2() - config.start_bpm.log2()) / config.std_octaves;
    (-0.5 * z * z).exp()
}

/// Estimate the tempo of an onset envelope sampled at `frame_rate` Hz
pub fn estimate_bpm(onset: &[f64], frame_rate: f64, config: &TempoConfig) -> Result<f64> {
    let peak = onset.iter().fold(0.0f64, |acc, &o| acc.max(o));
    if peak <= SILENCE_FLOOR {
        log::warn!("Onset envelope is silent, reporting {} BPM", config.start_bpm);
        return Ok(config.start_bpm);
    }

    let lag_for = |bpm: f64| 60.0 * frame_rate / bpm;
    let min_lag = (lag_for(config.max_bpm).floor() as usize).max(1);
    let max_lag = (lag_for(config.min_bpm).ceil() as usize).min(onset.len().saturating_sub(1));
    if min_lag > max_lag {
        log::warn!(
            "Signal too short for tempo range ({} onset frames), reporting {} BPM",
            onset.len(),
            config.start_bpm
        );
        return Ok(config.start_bpm);
    }

    let ac = autocorrelate(onset, max_lag + 1);
    let score = |lag: usize| ac[lag] * tempo_prior(lag_for(lag as f64), config);

    let mut best_lag = min_lag;
    let mut best_score = score(min_lag);
    for lag in min_lag + 1..=max_lag {
        let s = score(lag);
        if s > best_score {
            best_lag = lag;
            best_score = s;
        }
    }

    if best_score <= 0.0 {
        log::warn!("No periodicity found, reporting {} BPM", config.start_bpm);
        return Ok(config.start_bpm);
    }

    // Parabolic refinement around the winning lag
    let mut lag = best_lag as f64;
    if best_lag > 1 {
        let (y0, y1, y2) = (score(best_lag - 1), best_score, score(best_lag + 1));
        let denom = y0 - 2.0 * y1 + y2;
        if denom < 0.0 {
            lag += (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5);
        }
    }

    let bpm = (60.0 * frame_rate / lag).clamp(config.min_bpm, config.max_bpm);
    if !bpm.is_finite() {
        return Err(AudioError::NonFiniteResult("tempo"));
    }

    log::debug!("Tempo lag {:.2} frames -> {:.2} BPM", lag, bpm);
    Ok(bpm)
}

/// Place beats on an onset envelope given a tempo
pub fn track_beats(onset: &[f64], bpm: f64, frame_rate: f64, tightness: f64) -> Vec<usize> {
    let n = onset.len();
    let peak = onset.iter().fold(0.0f64, |acc, &o| acc.max(o));
    if n == 0 || peak <= SILENCE_FLOOR || !(bpm > 0.0) {
        return Vec::new();
    }

    let period = 60.0 * frame_rate / bpm;
    let local = local_score(&normalize_by_std(onset), period);

    let far = (2.0 * period).round().max(1.0) as usize;
    let near = (period / 2.0).round().max(1.0) as usize;
    let penalty: Vec<f64> = (near..=far)
        .map(|distance| {
            let ratio = (distance as f64 / period).ln();
            -tightness * ratio * ratio
        })
        .collect();

    let local_peak = local.iter().fold(0.0f64, |acc, &s| acc.max(s));
    let threshold = 0.01 * local_peak;

    let mut cumulative = vec![0.0; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];
    let mut first_beat = true;

    for i in 0..n {
        let mut best: Option<(usize, f64)> = None;
        for (j, distance) in (near..=far).enumerate() {
            if distance > i {
                break;
            }
            let prev = i - distance;
            let candidate = cumulative[prev] + penalty[j];
            if best.map_or(true, |(_, b)| candidate > b) {
                best = Some((prev, candidate));
            }
        }

        cumulative[i] = local[i] + best.map_or(0.0, |(_, s)| s);
        if first_beat && local[i] < threshold {
            backlink[i] = None;
        } else {
            backlink[i] = best.map(|(prev, _)| prev);
            first_beat = false;
        }
    }

    let Some(last) = last_beat(&cumulative) else {
        return Vec::new();
    };

    let mut beats = vec![last];
    let mut current = last;
    while let Some(prev) = backlink[current] {
        beats.push(prev);
        current = prev;
    }
    beats.reverse();

    trim_beats(&local, beats)
}

fn normalize_by_std(onset: &[f64]) -> Vec<f64> {
    let n = onset.len() as f64;
    let mean = onset.iter().sum::<f64>() / n;
    let variance = onset.iter().map(|&o| (o - mean) * (o - mean)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std > 0.0 {
        onset.iter().map(|&o| o / std).collect()
    } else {
        onset.to_vec()
    }
}

/// Smooth the onset envelope with a Gaussian a fraction of a period wide
fn local_score(onset: &[f64], period: f64) -> Vec<f64> {
    let radius = period.round().max(1.0) as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|k| {
            let x = k as f64 * 32.0 / period;
            (-0.5 * x * x).exp()
        })
        .collect();

    let n = onset.len() as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(k, &w)| {
                    let j = i + k as isize - radius;
                    (0..n).contains(&j).then(|| w * onset[j as usize])
                })
                .sum()
        })
        .collect()
}

/// Last local maximum of the cumulative score that clears half the median peak
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let n = cumulative.len();
    let maxima: Vec<usize> = (0..n)
        .filter(|&i| {
            let left = i == 0 || cumulative[i] > cumulative[i - 1];
            let right = i + 1 == n || cumulative[i] >= cumulative[i + 1];
            left && right
        })
        .collect();

    if maxima.is_empty() {
        return None;
    }

    let mut values: Vec<f64> = maxima.iter().map(|&i| cumulative[i]).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let median = values[values.len() / 2];

    maxima
        .iter()
        .rev()
        .find(|&&i| cumulative[i] > 0.5 * median)
        .copied()
}

/// Drop weak beats at the start and end of the sequence
fn trim_beats(local: &[f64], beats: Vec<usize>) -> Vec<usize> {
    if beats.is_empty() {
        return beats;
    }

    let mean_square = beats.iter().map(|&b| local[b] * local[b]).sum::<f64>() / beats.len() as f64;
    let threshold = 0.5 * mean_square.sqrt();

    let start = beats.iter().position(|&b| local[b] >= threshold);
    let end = beats.iter().rposition(|&b| local[b] >= threshold);

    match (start, end) {
        (Some(s), Some(e)) => beats[s..=e].to_vec(),
        _ => Vec::new(),
    }
}

/// Estimate tempo and beats of a buffer
pub fn analyze_tempo_with_config(
    buffer: &SampleBuffer,
    stft_config: &StftConfig,
    config: &TempoConfig,
) -> Result<TempoResult> {
    let spectrogram = Spectrogram::compute(buffer, stft_config)?;
    let frame_rate = buffer.sample_rate() as f64 / stft_config.hop_size as f64;

    let onset = onset_strength(&spectrogram, config.top_db);
    let bpm = estimate_bpm(&onset, frame_rate, config)?;
    let beat_frames = track_beats(&onset, bpm, frame_rate, config.tightness);
    let beat_times = beat_frames
        .iter()
        .map(|&f| frame_to_seconds(f, stft_config.hop_size, buffer.sample_rate()))
        .collect();

    log::info!(
        "Estimated tempo: {:.2} BPM, {} beats over {} frames",
        bpm,
        beat_frames.len(),
        spectrogram.num_frames
    );

    Ok(TempoResult {
        bpm,
        beat_frames,
        beat_times,
    })
}
