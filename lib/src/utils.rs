//! Formatting helpers for client applications

use crate::buffer::SampleBuffer;
use crate::stft::StftConfig;

/// Format a frequency value for display
pub fn format_frequency(freq_hz: f64) -> String {
    if freq_hz >= 1000.0 {
        format!("{:.2} kHz", freq_hz / 1000.0)
    } else {
        format!("{:.1} Hz", freq_hz)
    }
}

/// Format a time value for display
pub fn format_time(time_sec: f64) -> String {
    if time_sec >= 60.0 {
        let minutes = (time_sec / 60.0).floor();
        let seconds = time_sec % 60.0;
        format!("{:.0}m {:.1}s", minutes, seconds)
    } else {
        format!("{:.2}s", time_sec)
    }
}

/// Format duration in samples to time string
pub fn format_duration(samples: usize, sample_rate: u32) -> String {
    let seconds = samples as f64 / sample_rate as f64;
    format_time(seconds)
}

/// Calculate the frequency corresponding to a given FFT bin
pub fn bin_to_frequency(bin: usize, sample_rate: u32, fft_size: usize) -> f64 {
    bin as f64 * sample_rate as f64 / fft_size as f64
}

/// Multi-line description of a buffer and how it will be analyzed
pub fn buffer_summary(buffer: &SampleBuffer, config: &StftConfig) -> String {
    let mut summary = String::new();

    summary.push_str(&format!(
        "Audio: {} channels, {} Hz, {}\n",
        buffer.channels(),
        buffer.sample_rate(),
        format_duration(buffer.frames(), buffer.sample_rate())
    ));
    summary.push_str(&format!("  Peak level: {:.3}\n", buffer.peak()));

    summary.push_str("STFT Config:\n");
    summary.push_str(&format!("  Window size: {} samples\n", config.window_size));
    summary.push_str(&format!(
        "  Hop size: {} samples ({:.1}% overlap)\n",
        config.hop_size,
        config.overlap_percent()
    ));
    summary.push_str(&format!("  Window type: {}\n", config.window_type.name()));
    summary.push_str(&format!("  FFT bins: {}\n", config.fft_bins()));
    summary.push_str(&format!(
        "  Frequency resolution: {}\n",
        format_frequency(bin_to_frequency(1, buffer.sample_rate(), config.window_size))
    ));

    let num_frames = config.num_frames(buffer.frames());
    if num_frames == 0 {
        summary.push_str("  Too short for one analysis window\n");
    } else {
        let frame_duration = config.hop_size as f64 / buffer.sample_rate() as f64;
        summary.push_str(&format!("  Frames: {}\n", num_frames));
        summary.push_str(&format!(
            "  Frame duration: {:.2}ms\n",
            frame_duration * 1000.0
        ));
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_formatting() {
        assert_eq!(format_frequency(440.0), "440.0 Hz");
        assert_eq!(format_frequency(1000.0), "1.00 kHz");
        assert_eq!(format_frequency(22050.0), "22.05 kHz");
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_time(0.5), "0.50s");
        assert_eq!(format_time(45.0), "45.00s");
        assert_eq!(format_time(75.5), "1m 15.5s");
        assert_eq!(format_time(125.0), "2m 5.0s");
        assert_eq!(format_duration(66150, 44100), "1.50s");
    }

    #[test]
    fn test_bin_frequency_conversion() {
        let sample_rate = 44100;
        let fft_size = 1024;

        assert_eq!(bin_to_frequency(0, sample_rate, fft_size), 0.0);

        let nyquist_freq = bin_to_frequency(fft_size / 2, sample_rate, fft_size);
        assert!((nyquist_freq - 22050.0).abs() < 1e-10);

        assert!((bin_to_frequency(10, sample_rate, fft_size) - 430.664).abs() < 1e-3);
    }

    #[test]
    fn test_buffer_summary() {
        let buffer = SampleBuffer::mono(vec![0.25; 4096], 8000).unwrap();
        let summary = buffer_summary(&buffer, &StftConfig::default());
        assert!(summary.contains("Audio: 1 channels, 8000 Hz, 0.51s"));
        assert!(summary.contains("Window size: 2048 samples"));
        assert!(summary.contains("Frames: 9"));

        let short = SampleBuffer::mono(vec![0.0; 100], 8000).unwrap();
        assert!(buffer_summary(&short, &StftConfig::default()).contains("Too short"));
    }
}
