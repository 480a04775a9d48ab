//! Window functions for STFT analysis
//!
//! All windows are generated in their periodic (DFT-even) form, which is
//! what overlap-add resynthesis needs for flat gain at hop sizes that
//! divide the window length.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::AudioError;

/// Window function types available for STFT analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Hann window
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Rectangular window (no windowing)
    Rectangular,
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for WindowType {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowType::Hann),
            "hamming" => Ok(WindowType::Hamming),
            "rectangular" | "rect" => Ok(WindowType::Rectangular),
            other => Err(AudioError::invalid(format!("unknown window type '{}'", other))),
        }
    }
}

impl WindowType {
    /// Get all available window types
    pub fn all() -> &'static [WindowType] {
        &[WindowType::Hann, WindowType::Hamming, WindowType::Rectangular]
    }

    /// Get the name of the window type
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Hann => "Hann",
            WindowType::Hamming => "Hamming",
            WindowType::Rectangular => "Rectangular",
        }
    }
}

/// Generate a periodic window of the specified type and size
pub fn generate_window(window_type: WindowType, size: usize) -> Vec<f64> {
    let n = size as f64;
    (0..size)
        .map(|i| {
            let phase = 2.0 * PI * i as f64 / n;
            match window_type {
                WindowType::Hann => 0.5 - 0.5 * phase.cos(),
                WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
                WindowType::Rectangular => 1.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_generation() {
        for &window_type in WindowType::all() {
            let window = generate_window(window_type, 512);
            assert_eq!(window.len(), 512);
            assert!(window.iter().all(|&w| w >= 0.0));

            if window_type == WindowType::Rectangular {
                assert!(window.iter().all(|&w| (w - 1.0).abs() < 1e-12));
            }
        }
    }

    #[test]
    fn test_hann_is_periodic() {
        let window = generate_window(WindowType::Hann, 512);

        assert!(window[0].abs() < 1e-12);
        assert!((window[256] - 1.0).abs() < 1e-12);
        // Periodic form: w[i] == w[n - i] for i in 1..n
        for i in 1..256 {
            assert!((window[i] - window[512 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hann_overlap_is_flat() {
        // Hann at 75% overlap sums to a constant
        let size = 1024;
        let hop = size / 4;
        let window = generate_window(WindowType::Hann, size);
        for offset in 0..hop {
            let sum: f64 = (0..4).map(|k| window[offset + k * hop]).sum();
            assert!((sum - 2.0).abs() < 1e-9, "sum {} at offset {}", sum, offset);
        }
    }

    #[test]
    fn test_parse_window_type() {
        assert_eq!("hanning".parse::<WindowType>().unwrap(), WindowType::Hann);
        assert_eq!("Hamming".parse::<WindowType>().unwrap(), WindowType::Hamming);
        assert!("kaiser".parse::<WindowType>().is_err());
    }
}
